//! Steps shared by messages and resources: decoding raw input, digesting
//! and signing `{metadata, data}`, and binding the signer to `metadata.from`.

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    Error,
    crypto::{self, Digest, SignatureError, Signer, jws},
    did::{self, DidResolver},
    schema::{self, SchemaName},
};

mod error;

pub use error::ParseError;

pub(crate) fn parse_json(raw: &[u8]) -> Result<Value, ParseError> {
    let value = serde_json::from_slice::<Value>(raw).map_err(ParseError::InvalidJson)?;

    if !value.is_object() {
        return Err(ParseError::InvalidShape(
            "expected a JSON object".to_string(),
        ));
    }

    Ok(value)
}

/// Read `metadata.kind` without trusting anything else about the input
pub(crate) fn read_kind(value: &Value) -> Result<&str, ParseError> {
    value
        .get("metadata")
        .and_then(|metadata| metadata.get("kind"))
        .and_then(Value::as_str)
        .ok_or_else(|| ParseError::InvalidShape("missing 'metadata.kind'".to_string()))
}

/// Check the envelope and kind-specific data schemas, then deserialize
pub(crate) fn decode<T: DeserializeOwned>(
    value: Value,
    envelope: SchemaName,
    data: SchemaName,
) -> Result<T, Error> {
    validate(&value, envelope, data)?;

    serde_json::from_value(value).map_err(|err| ParseError::InvalidShape(err.to_string()).into())
}

pub(crate) fn validate(value: &Value, envelope: SchemaName, data: SchemaName) -> Result<(), Error> {
    schema::validate(envelope, value)?;
    schema::validate(data, value.get("data").unwrap_or(&Value::Null))?;

    Ok(())
}

pub(crate) fn digest<M: Serialize, D: Serialize>(metadata: &M, data: &D) -> Result<Digest, Error> {
    Ok(crypto::digest(metadata, data)?)
}

/// Detached signature over the digest of `{metadata, data}`
pub(crate) fn sign<M: Serialize, D: Serialize>(
    metadata: &M,
    data: &D,
    signer: &dyn Signer,
) -> Result<String, Error> {
    let digest = digest(metadata, data)?;

    Ok(jws::sign(&digest, signer, true)?)
}

/// Verify a detached signature over `digest` and require that it was made
/// by `from`. The binding is checked on the header's key id before any
/// resolution or cryptography takes place.
pub(crate) async fn verify_signature(
    signature: &str,
    digest: &Digest,
    from: &str,
    resolver: &dyn DidResolver,
) -> Result<String, Error> {
    if signature.is_empty() {
        return Err(SignatureError::MissingSignature.into());
    }

    if let Some(kid) = jws::decode(signature)?.header.kid {
        check_binding(did::did_from_key_id(&kid), from)?;
    }

    let signer = jws::verify(signature, Some(digest.as_slice()), resolver).await?;
    check_binding(&signer, from)?;

    Ok(signer)
}

fn check_binding(signer: &str, from: &str) -> Result<(), SignatureError> {
    if signer != from {
        tracing::warn!("signature by {signer} on behalf of {from} rejected");
        return Err(SignatureError::SignerMismatch {
            signer: signer.to_string(),
            from: from.to_string(),
        });
    }

    Ok(())
}
