//! `did:web` resolution over HTTPS.
//! See <https://w3c-ccg.github.io/did-method-web/>

use url::Url;

use super::{DidDocument, error::DidError};

pub(crate) const SCHEME: &str = "web";

const PROTOCOL: &str = "https://";
const DEFAULT_PATH: &str = ".well-known";
const DOCUMENT: &str = "did.json";

pub async fn resolve(
    client: &reqwest::Client,
    did: &str,
    parts: &[&str],
) -> Result<DidDocument, DidError> {
    let url = resolve_url(parts)?;

    tracing::debug!("fetching DID document for {did} from {url}");

    let response = client
        .get(url.as_ref())
        .send()
        .await
        .map_err(|e| DidError::Http(url.to_string(), e))?;

    let document = match response.error_for_status() {
        Ok(r) => r
            .json::<DidDocument>()
            .await
            .map_err(|e| DidError::Json(url.to_string(), e))?,
        Err(e) => Err(DidError::Http(url.to_string(), e))?,
    };

    if document.id != did {
        return Err(DidError::ResolveDid {
            did: did.to_string(),
            reason: "DID document id does not match the resolved DID",
        });
    }

    Ok(document)
}

pub fn get_resolve_url(did: &str) -> Result<Url, DidError> {
    let parts = did.split(':').collect::<Vec<_>>();
    resolve_url(&parts)
}

fn resolve_url(parts: &[&str]) -> Result<Url, DidError> {
    match parts {
        ["did", "web", domain] => format!(
            "{PROTOCOL}{}/{DEFAULT_PATH}/{DOCUMENT}",
            domain.replace("%3A", ":")
        ),
        ["did", "web", domain, path @ ..] => {
            format!(
                "{PROTOCOL}{}/{}/{DOCUMENT}",
                domain.replace("%3A", ":"),
                path.join("/")
            )
        }
        _ => return Err(DidError::InvalidDid(parts.join(":"))),
    }
    .parse()
    .map_err(|_| DidError::InvalidDid(parts.join(":")))
}
