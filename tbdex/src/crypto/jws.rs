//! Compact JWS: `base64url(header).base64url(payload).base64url(signature)`.
//!
//! Message and resource signatures are *detached*: the payload segment is
//! left empty and the verifier supplies the digest it expects.

use base64ct::{Base64UrlUnpadded, Encoding};
use serde::{Deserialize, Serialize};

use super::{CryptoError, SignatureError, Signer};
use crate::did::{self, DidResolver};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct JwsHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

/// A compact JWS split into its parts; nothing has been verified yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedJws<'a> {
    pub header: JwsHeader,
    pub encoded_header: &'a str,
    pub encoded_payload: &'a str,
    pub signature: Vec<u8>,
}

impl DecodedJws<'_> {
    pub fn is_detached(&self) -> bool {
        self.encoded_payload.is_empty()
    }

    /// The decoded (attached) payload
    pub fn payload(&self) -> Result<Vec<u8>, SignatureError> {
        if self.is_detached() {
            return Err(SignatureError::MissingPayload);
        }

        Base64UrlUnpadded::decode_vec(self.encoded_payload).map_err(SignatureError::MalformedPayload)
    }
}

/// Sign `payload` with `signer`, either attached or detached
pub fn sign(payload: &[u8], signer: &dyn Signer, detached: bool) -> Result<String, CryptoError> {
    let header = JwsHeader {
        alg: Some(signer.algorithm().as_str().to_string()),
        kid: Some(signer.key_id().to_string()),
        typ: (!detached).then(|| "JWT".to_string()),
    };

    let encoded_header = Base64UrlUnpadded::encode_string(&serde_json::to_vec(&header)?);
    let encoded_payload = Base64UrlUnpadded::encode_string(payload);
    let signing_input = format!("{encoded_header}.{encoded_payload}");

    let signature = Base64UrlUnpadded::encode_string(&signer.sign(signing_input.as_bytes())?);

    if detached {
        Ok(format!("{encoded_header}..{signature}"))
    } else {
        Ok(format!("{signing_input}.{signature}"))
    }
}

/// Split a compact JWS and decode its header and signature
pub fn decode(token: &str) -> Result<DecodedJws<'_>, SignatureError> {
    if token.is_empty() {
        return Err(SignatureError::MissingSignature);
    }

    let parts = token.split('.').collect::<Vec<&str>>();
    let [encoded_header, encoded_payload, encoded_signature] = parts[..] else {
        return Err(SignatureError::MalformedToken(parts.len()));
    };

    let header_bytes = Base64UrlUnpadded::decode_vec(encoded_header)
        .map_err(|err| SignatureError::MalformedHeader(err.to_string()))?;
    let header = serde_json::from_slice::<JwsHeader>(&header_bytes)
        .map_err(|err| SignatureError::MalformedHeader(err.to_string()))?;
    let signature = Base64UrlUnpadded::decode_vec(encoded_signature)
        .map_err(SignatureError::MalformedSignature)?;

    Ok(DecodedJws {
        header,
        encoded_header,
        encoded_payload,
        signature,
    })
}

/// Verify a compact JWS and return the DID of the signer.
///
/// With `detached_payload` set, the token must carry an empty payload segment
/// and the signature is checked over the supplied bytes instead.
pub async fn verify(
    token: &str,
    detached_payload: Option<&[u8]>,
    resolver: &dyn DidResolver,
) -> Result<String, SignatureError> {
    let jws = decode(token)?;

    let signing_input = match detached_payload {
        Some(payload) => {
            if !jws.is_detached() {
                return Err(SignatureError::DetachedPayloadNotEmpty);
            }
            format!(
                "{}.{}",
                jws.encoded_header,
                Base64UrlUnpadded::encode_string(payload)
            )
        }
        None => {
            if jws.is_detached() {
                return Err(SignatureError::MissingPayload);
            }
            format!("{}.{}", jws.encoded_header, jws.encoded_payload)
        }
    };

    let alg = jws
        .header
        .alg
        .as_deref()
        .ok_or(SignatureError::MissingAlgorithm)?;
    let kid = jws
        .header
        .kid
        .as_deref()
        .ok_or(SignatureError::MissingKeyId)?;

    let method = did::dereference(resolver, kid)
        .await
        .map_err(|source| SignatureError::Dereference {
            kid: kid.to_string(),
            source,
        })?;

    let public_key = method
        .public_key_jwk
        .as_ref()
        .ok_or_else(|| SignatureError::MissingPublicKey(kid.to_string()))?;

    let algorithm = public_key
        .curve()
        .map_err(|source| SignatureError::UnusableKey {
            kid: kid.to_string(),
            source,
        })?
        .algorithm();

    if algorithm.as_str() != alg {
        return Err(SignatureError::AlgorithmMismatch {
            header: alg.to_string(),
            key: algorithm.to_string(),
        });
    }

    public_key
        .verify(signing_input.as_bytes(), &jws.signature)
        .map_err(|source| SignatureError::Verification {
            kid: kid.to_string(),
            source,
        })?;

    tracing::trace!("verified {algorithm} signature by {kid}");

    Ok(did::did_from_key_id(kid).to_string())
}
