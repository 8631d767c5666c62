use serde::{Deserialize, Serialize};

use super::{Message, MessageData};
use crate::definitions::MessageKind;

/// Ends an exchange; either party may send it
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CloseData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Whether the exchange completed successfully
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
}

impl MessageData for CloseData {
    const KIND: MessageKind = MessageKind::Close;
}

pub type Close = Message<CloseData>;
