/// Failure to turn raw input into a typed message or resource
#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    InvalidJson(serde_json::Error),
    #[error("unexpected shape: {0}")]
    InvalidShape(String),
    #[error("unrecognized kind '{0}'")]
    UnknownKind(String),
    #[error("expected kind '{expected}', found '{found}'")]
    UnexpectedKind { expected: String, found: String },
    #[error("rfq {id} names exchange {exchange_id}, an rfq's exchange id is its own id")]
    RfqExchangeId { id: String, exchange_id: String },
}
