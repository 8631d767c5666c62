use crate::definitions::MessageKind;

/// Error originating from the tbDEX library
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Error: {0}")]
    Parse(#[from] crate::envelope::ParseError),
    #[error("Error: {0}")]
    Schema(#[from] crate::schema::SchemaError),
    #[error("Error: {0}")]
    Signature(#[from] crate::crypto::SignatureError),
    #[error("Error: {0}")]
    Crypto(#[from] crate::crypto::CryptoError),
    #[error("Error: {0}")]
    Did(#[from] crate::did::DidError),
    #[error("Error: {0}")]
    Exchange(#[from] crate::exchange::ExchangeError),
    #[error("Error: {0}")]
    OfferingRequirement(#[from] crate::message::OfferingRequirementError),
    #[error("Error: {0}")]
    Presentation(#[from] crate::presentation::PresentationError),
    #[error("Error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Error: a {0} must reference an exchange id")]
    MissingExchangeId(MessageKind),
}
