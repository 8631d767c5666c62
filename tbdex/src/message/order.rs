use serde::{Deserialize, Serialize};

use super::{Message, MessageData};
use crate::definitions::MessageKind;

/// Alice accepts the quote; an order carries no data of its own
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct OrderData {}

impl MessageData for OrderData {
    const KIND: MessageKind = MessageKind::Order;
}

pub type Order = Message<OrderData>;
