use crate::crypto::CryptoError;

#[derive(thiserror::Error, Debug)]
pub enum DidError {
    #[cfg(feature = "resolve")]
    #[error("fetching '{0}' failed: {1}")]
    Http(String, reqwest::Error),
    #[cfg(feature = "resolve")]
    #[error("deserializing '{0}' failed: {1}")]
    Json(String, reqwest::Error),
    #[error("invalid DID '{0}'")]
    InvalidDid(String),
    #[error("unsupported DID method in '{0}'")]
    UnsupportedMethod(String),
    #[error("could not resolve DID '{did}': {reason}")]
    ResolveDid { did: String, reason: &'static str },
    #[error("verification method '{0}' not found")]
    VerificationMethodNotFound(String),
    #[error("{0}")]
    Crypto(#[from] CryptoError),
}
