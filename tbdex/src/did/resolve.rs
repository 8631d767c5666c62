use async_trait::async_trait;

#[cfg(feature = "resolve")]
use super::web;
use super::{DidDocument, DidResolver, SCHEME, error::DidError, key};

/// Resolves every DID method this crate knows about: `did:key` offline and,
/// with the `resolve` feature, `did:web` over HTTPS
#[derive(Debug, Default, Clone)]
pub struct UniversalResolver {
    #[cfg(feature = "resolve")]
    client: reqwest::Client,
}

impl UniversalResolver {
    #[cfg(feature = "resolve")]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DidResolver for UniversalResolver {
    async fn resolve(&self, did: &str) -> Result<DidDocument, DidError> {
        let parts = did.split(':').collect::<Vec<&str>>();

        match parts.get(0..2) {
            Some([SCHEME, key::SCHEME]) => key::resolve_did_key(did, &parts),
            #[cfg(feature = "resolve")]
            Some([SCHEME, web::SCHEME]) => web::resolve(&self.client, did, &parts).await,
            Some([SCHEME, _]) => Err(DidError::UnsupportedMethod(did.to_string())),
            _ => Err(DidError::InvalidDid(did.to_string())),
        }
    }
}

/// Resolve a DID using only offline methods
pub fn resolve_offline(did: &str) -> Result<DidDocument, DidError> {
    let parts = did.split(':').collect::<Vec<&str>>();

    match parts.get(0..2) {
        Some([SCHEME, key::SCHEME]) => key::resolve_did_key(did, &parts),
        _ => Err(DidError::UnsupportedMethod(did.to_string())),
    }
}
