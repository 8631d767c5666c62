use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::{Algorithm, CryptoError, PrivateJwk, Signer};

pub mod error;
pub mod key;
pub mod resolve;
#[cfg(feature = "resolve")]
pub mod web;

pub use error::DidError;
pub use resolve::{UniversalResolver, resolve_offline};
#[cfg(feature = "resolve")]
pub use web::get_resolve_url;

pub(crate) const SCHEME: &str = "did";

/// Service type under which a PFI publishes its tbDEX endpoint
pub const PFI_SERVICE_TYPE: &str = "PFI";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    #[serde(rename = "@context", default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verification_method: Vec<VerificationMethod>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authentication: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assertion_method: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service: Vec<Service>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    pub id: String,
    #[serde(rename = "type")]
    pub method_type: String,
    pub controller: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_jwk: Option<crate::crypto::PublicJwk>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    #[serde(rename = "type")]
    pub service_type: String,
    pub service_endpoint: ServiceEndpoint,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ServiceEndpoint {
    Single(String),
    Many(Vec<String>),
}

impl ServiceEndpoint {
    pub fn first(&self) -> Option<&str> {
        match self {
            ServiceEndpoint::Single(endpoint) => Some(endpoint.as_str()),
            ServiceEndpoint::Many(endpoints) => endpoints.first().map(String::as_str),
        }
    }
}

impl DidDocument {
    /// Find the verification method for a full key id (`did#fragment`);
    /// relative method ids (`#fragment`) are matched on the fragment
    pub fn verification_method(&self, key_id: &str) -> Option<&VerificationMethod> {
        let fragment = key_id.split_once('#').map(|(_, fragment)| fragment);

        self.verification_method.iter().find(|method| {
            method.id == key_id
                || matches!(
                    (method.id.strip_prefix('#'), fragment),
                    (Some(a), Some(b)) if a == b
                )
        })
    }

    /// The tbDEX endpoint of a PFI, if this document advertises one
    pub fn pfi_service_endpoint(&self) -> Option<url::Url> {
        self.service
            .iter()
            .filter(|service| service.service_type == PFI_SERVICE_TYPE)
            .find_map(|service| service.service_endpoint.first()?.parse().ok())
    }
}

/// Resolves a DID to its DID document
#[async_trait]
pub trait DidResolver: Send + Sync {
    async fn resolve(&self, did: &str) -> Result<DidDocument, DidError>;
}

/// The DID part of a DID URL, i.e. everything before the `#` fragment
pub fn did_from_key_id(key_id: &str) -> &str {
    key_id.split_once('#').map_or(key_id, |(did, _)| did)
}

/// Resolve the DID in `key_id` and return the verification method it points at
pub async fn dereference(
    resolver: &dyn DidResolver,
    key_id: &str,
) -> Result<VerificationMethod, DidError> {
    let document = resolver.resolve(did_from_key_id(key_id)).await?;

    document
        .verification_method(key_id)
        .cloned()
        .ok_or_else(|| DidError::VerificationMethodNotFound(key_id.to_string()))
}

/// A DID together with the private key for one of its verification methods
#[derive(Clone)]
pub struct BearerDid {
    uri: String,
    document: DidDocument,
    key_id: String,
    algorithm: Algorithm,
    key: PrivateJwk,
}

/// A custom implementation of Debug for BearerDid to avoid key material from leaking during panics.
impl fmt::Debug for BearerDid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerDid")
            .field("uri", &self.uri)
            .field("key_id", &self.key_id)
            .field("key", &"<secret>")
            .finish()
    }
}

impl BearerDid {
    /// Generate a fresh key and wrap it in a `did:key`
    pub fn generate(algorithm: Algorithm) -> Result<Self, DidError> {
        Self::from_private_jwk(PrivateJwk::generate(algorithm.curve()))
    }

    /// Wrap an existing private key in a `did:key`
    pub fn from_private_jwk(key: PrivateJwk) -> Result<Self, DidError> {
        let uri = key::encode_did_key(&key.public())?;
        let document = resolve_offline(&uri)?;
        let key_id = document
            .verification_method
            .first()
            .map(|method| method.id.clone())
            .ok_or_else(|| DidError::VerificationMethodNotFound(uri.clone()))?;

        Self::new(document, key_id, key)
    }

    /// Bind a private key to the verification method `key_id` of `document`
    pub fn new(document: DidDocument, key_id: String, key: PrivateJwk) -> Result<Self, DidError> {
        let method = document
            .verification_method(&key_id)
            .ok_or_else(|| DidError::VerificationMethodNotFound(key_id.clone()))?;

        let public = key.public();
        if !method.public_key_jwk.as_ref().is_some_and(|jwk| jwk.same_key(&public)) {
            return Err(CryptoError::InvalidKey("private key does not match verification method").into());
        }

        let key_id = match key_id.strip_prefix('#') {
            Some(fragment) => format!("{}#{fragment}", document.id),
            None => key_id,
        };

        Ok(Self {
            uri: document.id.clone(),
            algorithm: key.curve()?.algorithm(),
            document,
            key_id,
            key,
        })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn document(&self) -> &DidDocument {
        &self.document
    }
}

impl Signer for BearerDid {
    fn key_id(&self) -> &str {
        &self.key_id
    }

    fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.key.sign(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_id_to_did() {
        assert_eq!(did_from_key_id("did:key:z6Mk#z6Mk"), "did:key:z6Mk");
        assert_eq!(did_from_key_id("did:web:example.com"), "did:web:example.com");
    }

    #[test]
    fn relative_method_ids() {
        let bearer = BearerDid::generate(Algorithm::EdDsa).unwrap();
        let mut document = bearer.document().clone();
        let fragment = bearer.key_id().split_once('#').unwrap().1.to_string();
        document.verification_method[0].id = format!("#{fragment}");

        assert!(document.verification_method(bearer.key_id()).is_some());
        assert!(document.verification_method("did:key:other#nope").is_none());
    }

    #[test]
    fn pfi_endpoint() {
        let document: DidDocument = serde_json::from_value(serde_json::json!({
            "id": "did:web:pfi.example.com",
            "service": [
                {"id": "#other", "type": "LinkedDomains", "serviceEndpoint": "https://example.com"},
                {"id": "#pfi", "type": "PFI", "serviceEndpoint": ["https://pfi.example.com/tbdex"]}
            ]
        }))
        .unwrap();

        assert_eq!(
            document.pfi_service_endpoint().unwrap().as_str(),
            "https://pfi.example.com/tbdex"
        );
    }

    #[test]
    fn mismatched_private_key() {
        let bearer = BearerDid::generate(Algorithm::Es256k).unwrap();
        let other = PrivateJwk::generate(crate::crypto::Curve::Secp256k1);

        assert!(
            BearerDid::new(bearer.document().clone(), bearer.key_id().to_string(), other).is_err()
        );
    }

    #[test]
    fn jwk_metadata_is_not_key_material() {
        let key = PrivateJwk::generate(crate::crypto::Curve::Ed25519);
        let bearer = BearerDid::from_private_jwk(key.clone()).unwrap();

        // did:web documents commonly annotate their keys
        let mut document = bearer.document().clone();
        for jwk in document
            .verification_method
            .iter_mut()
            .filter_map(|method| method.public_key_jwk.as_mut())
        {
            jwk.alg = Some("EdDSA".to_string());
            jwk.kid = Some("key-1".to_string());
        }

        let rebound = BearerDid::new(document, bearer.key_id().to_string(), key).unwrap();
        assert_eq!(rebound.uri(), bearer.uri());
        assert_eq!(rebound.key_id(), bearer.key_id());
    }

    #[tokio::test]
    async fn dereference_key_id() {
        let bearer = BearerDid::generate(Algorithm::Es256k).unwrap();
        let resolver = UniversalResolver::default();

        let method = dereference(&resolver, bearer.key_id()).await.unwrap();
        assert_eq!(method.controller, bearer.uri());

        assert!(matches!(
            resolver.resolve("did:example:123").await,
            Err(DidError::UnsupportedMethod(_))
        ));
        assert!(matches!(
            resolver.resolve("not-a-did").await,
            Err(DidError::InvalidDid(_))
        ));
    }
}
