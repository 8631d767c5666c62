use crate::did::DidError;

#[derive(thiserror::Error, Debug)]
pub enum CryptoError {
    #[error("unsupported key type '{kty}' with curve '{crv}'")]
    UnsupportedKey { kty: String, crv: String },
    #[error("invalid key material: {0}")]
    InvalidKey(&'static str),
    #[error("invalid base64url encoding: {0}")]
    Base64(#[from] base64ct::Error),
    #[error("failed to serialize signing payload: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("signature does not match: {0}")]
    Verify(String),
}

/// Each way a detached or compact signature can fail to verify
#[derive(thiserror::Error, Debug)]
pub enum SignatureError {
    #[error("signature is missing")]
    MissingSignature,
    #[error("malformed signature: expected 3 segments, found {0}")]
    MalformedToken(usize),
    #[error("malformed signature header: {0}")]
    MalformedHeader(String),
    #[error("malformed signature segment: {0}")]
    MalformedSignature(base64ct::Error),
    #[error("malformed signature payload: {0}")]
    MalformedPayload(base64ct::Error),
    #[error("detached signature must have an empty payload segment")]
    DetachedPayloadNotEmpty,
    #[error("signature has no payload and no detached payload was supplied")]
    MissingPayload,
    #[error("signature header is missing 'alg'")]
    MissingAlgorithm,
    #[error("signature header is missing 'kid'")]
    MissingKeyId,
    #[error("failed to dereference key id '{kid}': {source}")]
    Dereference {
        kid: String,
        #[source]
        source: DidError,
    },
    #[error("verification method '{0}' has no public key")]
    MissingPublicKey(String),
    #[error("verification method '{kid}' has an unusable public key: {source}")]
    UnusableKey {
        kid: String,
        #[source]
        source: CryptoError,
    },
    #[error("signature header algorithm '{header}' does not match key algorithm '{key}'")]
    AlgorithmMismatch { header: String, key: String },
    #[error("signature verification failed for '{kid}': {source}")]
    Verification {
        kid: String,
        #[source]
        source: CryptoError,
    },
    #[error("signer '{signer}' does not match sender '{from}'")]
    SignerMismatch { signer: String, from: String },
}
