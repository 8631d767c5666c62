use serde::Serialize;
use serde_json::{Map, Value};

use super::CryptoError;

pub type Digest = [u8; 32];

/// Calculate the SHA2-256 of a piece of arbitrary data
pub fn sha256(content: &[u8]) -> Digest {
    use sha2::Digest;
    sha2::Sha256::digest(content).into()
}

/// Serialize a JSON value deterministically: object keys sorted by their
/// UTF-16 code units, no insignificant whitespace.
pub fn canonicalize(value: &Value) -> Vec<u8> {
    let mut out = Vec::with_capacity(256);
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Object(map) => {
            let mut entries = map.iter().collect::<Vec<_>>();
            entries.sort_by(|(a, _), (b, _)| a.encode_utf16().cmp(b.encode_utf16()));

            out.push(b'{');
            for (i, (key, value)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                out.extend_from_slice(Value::String(key.clone()).to_string().as_bytes());
                out.push(b':');
                write_canonical(value, out);
            }
            out.push(b'}');
        }
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical(item, out);
            }
            out.push(b']');
        }
        // the compact Display form of scalars is already canonical
        scalar => out.extend_from_slice(scalar.to_string().as_bytes()),
    }
}

/// Hash of the canonical form of `{"metadata": .., "data": ..}`; this is the
/// detached payload of every message and resource signature
pub fn digest<M: Serialize, D: Serialize>(metadata: &M, data: &D) -> Result<Digest, CryptoError> {
    let mut payload = Map::with_capacity(2);
    payload.insert("metadata".to_string(), serde_json::to_value(metadata)?);
    payload.insert("data".to_string(), serde_json::to_value(data)?);

    Ok(sha256(&canonicalize(&Value::Object(payload))))
}
