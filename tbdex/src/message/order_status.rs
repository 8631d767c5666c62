use serde::{Deserialize, Serialize};

use super::{Message, MessageData};
use crate::definitions::MessageKind;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusData {
    /// Free-form progress report from the PFI
    pub order_status: String,
}

impl MessageData for OrderStatusData {
    const KIND: MessageKind = MessageKind::OrderStatus;
}

pub type OrderStatus = Message<OrderStatusData>;
