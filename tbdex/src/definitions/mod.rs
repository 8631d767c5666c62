use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

use crate::schema::SchemaName;

/// Protocol version stamped on messages and resources unless overridden
pub const DEFAULT_PROTOCOL_VERSION: &str = "1.0";

/// The five message kinds of an exchange
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Rfq,
    Quote,
    Order,
    OrderStatus,
    Close,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Rfq => "rfq",
            MessageKind::Quote => "quote",
            MessageKind::Order => "order",
            MessageKind::OrderStatus => "orderstatus",
            MessageKind::Close => "close",
        }
    }

    /// The kinds that may legally follow a message of this kind
    pub fn valid_next(&self) -> &'static [MessageKind] {
        match self {
            MessageKind::Rfq => &[MessageKind::Quote, MessageKind::Close],
            MessageKind::Quote => &[MessageKind::Order, MessageKind::Close],
            MessageKind::Order => &[MessageKind::OrderStatus],
            MessageKind::OrderStatus => &[MessageKind::OrderStatus, MessageKind::Close],
            MessageKind::Close => &[],
        }
    }

    pub fn schema(&self) -> SchemaName {
        match self {
            MessageKind::Rfq => SchemaName::Rfq,
            MessageKind::Quote => SchemaName::Quote,
            MessageKind::Order => SchemaName::Order,
            MessageKind::OrderStatus => SchemaName::OrderStatus,
            MessageKind::Close => SchemaName::Close,
        }
    }
}

impl FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rfq" => Ok(MessageKind::Rfq),
            "quote" => Ok(MessageKind::Quote),
            "order" => Ok(MessageKind::Order),
            "orderstatus" => Ok(MessageKind::OrderStatus),
            "close" => Ok(MessageKind::Close),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The resource kinds a PFI publishes
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Offering,
    Balance,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Offering => "offering",
            ResourceKind::Balance => "balance",
        }
    }

    pub fn schema(&self) -> SchemaName {
        match self {
            ResourceKind::Offering => SchemaName::Offering,
            ResourceKind::Balance => SchemaName::Balance,
        }
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "offering" => Ok(ResourceKind::Offering),
            "balance" => Ok(ResourceKind::Balance),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Crockford base32, lowercase
const ID_ALPHABET: &[u8; 32] = b"0123456789abcdefghjkmnpqrstvwxyz";
const ID_SUFFIX_LEN: usize = 26;

/// Generate an id of the form `{prefix}_{suffix}` where the suffix is a
/// base32 encoded UUIDv7 (a TypeID)
pub fn generate_id(prefix: &str) -> String {
    let value = Uuid::now_v7().as_u128();

    let mut id = String::with_capacity(prefix.len() + 1 + ID_SUFFIX_LEN);
    id.push_str(prefix);
    id.push('_');
    for i in (0..ID_SUFFIX_LEN).rev() {
        id.push(ID_ALPHABET[((value >> (i * 5)) & 0x1f) as usize] as char);
    }
    id
}

/// Current time as an RFC 3339 UTC timestamp with millisecond precision
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_timestamp(timestamp: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(timestamp).map(|t| t.with_timezone(&Utc))
}
