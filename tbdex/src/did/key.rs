//! `did:key` for Ed25519 and secp256k1 keys.
//! See <https://w3c-ccg.github.io/did-method-key/>

use super::{DidDocument, VerificationMethod, error::DidError};
use crate::crypto::{Curve, PublicJwk};

pub(crate) const SCHEME: &str = "key";

// multicodec varints for ed25519-pub and secp256k1-pub
const ED25519_CODEC: [u8; 2] = [0xed, 0x01];
const SECP256K1_CODEC: [u8; 2] = [0xe7, 0x01];

// base58btc multibase prefix
const MULTIBASE_BASE58BTC: char = 'z';

/// Encode a public key as a `did:key`
pub fn encode_did_key(public_key: &PublicJwk) -> Result<String, DidError> {
    let codec = match public_key.curve()? {
        Curve::Ed25519 => ED25519_CODEC,
        Curve::Secp256k1 => SECP256K1_CODEC,
    };

    let key_bytes = public_key.to_key_bytes()?;
    let mut v = Vec::with_capacity(codec.len() + key_bytes.len());
    v.extend_from_slice(&codec);
    v.extend_from_slice(&key_bytes);

    let identifier = bs58::encode(&v)
        .with_alphabet(bs58::Alphabet::BITCOIN)
        .into_string();

    Ok(format!("did:key:{MULTIBASE_BASE58BTC}{identifier}"))
}

/// Expand a `did:key` into its DID document; this needs no network access
pub fn resolve_did_key(did: &str, parts: &[&str]) -> Result<DidDocument, DidError> {
    let [_, _, identifier] = parts else {
        return Err(DidError::InvalidDid(did.to_string()));
    };

    let Some(encoded) = identifier.strip_prefix(MULTIBASE_BASE58BTC) else {
        return Err(DidError::ResolveDid {
            did: did.to_string(),
            reason: "only base58btc multibase is supported for did:key",
        });
    };

    let decoded = bs58::decode(encoded)
        .with_alphabet(bs58::Alphabet::BITCOIN)
        .into_vec()
        .map_err(|_| DidError::ResolveDid {
            did: did.to_string(),
            reason: "invalid encoded key in did:key",
        })?;

    let public_key_jwk = match decoded.as_slice() {
        [0xed, 0x01, key @ ..] => {
            tracing::trace!("found Ed25519 key in {did}");
            PublicJwk::from_ed25519_bytes(key)?
        }
        [0xe7, 0x01, key @ ..] => {
            tracing::trace!("found secp256k1 key in {did}");
            PublicJwk::from_secp256k1_sec1(key)?
        }
        _ => {
            return Err(DidError::ResolveDid {
                did: did.to_string(),
                reason: "unsupported key type in did:key",
            });
        }
    };

    let method_id = format!("{did}#{identifier}");

    Ok(DidDocument {
        context: vec![
            "https://www.w3.org/ns/did/v1".to_string(),
            "https://w3id.org/security/suites/jws-2020/v1".to_string(),
        ],
        id: did.to_string(),
        verification_method: vec![VerificationMethod {
            id: method_id.clone(),
            method_type: "JsonWebKey2020".to_string(),
            controller: did.to_string(),
            public_key_jwk: Some(public_key_jwk),
        }],
        authentication: vec![method_id.clone()],
        assertion_method: vec![method_id],
        service: vec![],
    })
}
