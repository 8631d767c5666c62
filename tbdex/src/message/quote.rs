use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Message, MessageData};
use crate::definitions::{MessageKind, parse_timestamp};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteData {
    /// When this quote stops being honored by the PFI
    pub expires_at: String,
    pub payin: QuoteDetails,
    pub payout: QuoteDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteDetails {
    pub currency_code: String,
    pub amount: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_instruction: Option<PaymentInstruction>,
}

/// How to execute the payment, e.g. a checkout link
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PaymentInstruction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
}

impl MessageData for QuoteData {
    const KIND: MessageKind = MessageKind::Quote;
}

pub type Quote = Message<QuoteData>;

impl Message<QuoteData> {
    pub fn expires_at(&self) -> Result<DateTime<Utc>, chrono::ParseError> {
        parse_timestamp(&self.data().expires_at)
    }

    /// A quote whose expiry cannot be read is treated as expired
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().map_or(true, |expires_at| expires_at <= now)
    }
}
