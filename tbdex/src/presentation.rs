//! Presentation definitions, as used by an offering's `requiredClaims`.
//!
//! Selecting the credentials that satisfy a definition sits behind the
//! [PresentationExchange] trait. [FieldPathEvaluator] covers the common
//! case: every field names one or more JSONPath expressions into the
//! VC-JWT payload, optionally constrained by a JSON Schema `filter`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{crypto::jws, schema};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PresentationDefinition {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    pub input_descriptors: Vec<InputDescriptor>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct InputDescriptor {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Constraints>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Constraints {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Field {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub path: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(thiserror::Error, Debug)]
pub enum PresentationError {
    #[error("credential {index} is not a readable VC-JWT: {reason}")]
    MalformedCredential { index: usize, reason: String },
    #[error("unsupported JSONPath expression '{0}'")]
    InvalidPath(String),
    #[error("invalid filter on field {path}: {reason}")]
    InvalidFilter { path: String, reason: String },
    #[error("no credential satisfies input descriptor '{0}'")]
    Unsatisfied(String),
}

/// Picks, out of the VC-JWTs presented by Alice, the credentials that
/// satisfy a presentation definition
pub trait PresentationExchange: Send + Sync {
    /// Returns the satisfying credentials in the order they were presented,
    /// or fails if any input descriptor is left unsatisfied
    fn select_credentials(
        &self,
        vc_jwts: &[String],
        definition: &PresentationDefinition,
    ) -> Result<Vec<String>, PresentationError>;
}

/// Default [PresentationExchange] over `path`/`filter` field constraints
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldPathEvaluator;

impl PresentationExchange for FieldPathEvaluator {
    fn select_credentials(
        &self,
        vc_jwts: &[String],
        definition: &PresentationDefinition,
    ) -> Result<Vec<String>, PresentationError> {
        let payloads = vc_jwts
            .iter()
            .enumerate()
            .map(|(index, vc_jwt)| {
                credential_payload(vc_jwt)
                    .map_err(|reason| PresentationError::MalformedCredential { index, reason })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut selected = vec![false; vc_jwts.len()];

        for descriptor in &definition.input_descriptors {
            let mut satisfied = false;

            for (index, payload) in payloads.iter().enumerate() {
                if satisfies(descriptor, payload)? {
                    selected[index] = true;
                    satisfied = true;
                }
            }

            if !satisfied {
                tracing::debug!("input descriptor {} unsatisfied", descriptor.id);
                return Err(PresentationError::Unsatisfied(descriptor.id.clone()));
            }
        }

        Ok(vc_jwts
            .iter()
            .zip(selected)
            .filter_map(|(vc_jwt, selected)| selected.then(|| vc_jwt.clone()))
            .collect())
    }
}

fn credential_payload(vc_jwt: &str) -> Result<Value, String> {
    let decoded = jws::decode(vc_jwt).map_err(|err| err.to_string())?;
    let payload = decoded.payload().map_err(|err| err.to_string())?;

    serde_json::from_slice(&payload).map_err(|err| err.to_string())
}

fn satisfies(descriptor: &InputDescriptor, payload: &Value) -> Result<bool, PresentationError> {
    let fields = descriptor.constraints.iter().flat_map(|constraints| &constraints.fields);
    for field in fields {
        if field.optional == Some(true) {
            continue;
        }

        if !field_matches(field, payload)? {
            return Ok(false);
        }
    }

    Ok(true)
}

/// A field matches when any of its paths resolves to a value that passes
/// the filter
fn field_matches(field: &Field, payload: &Value) -> Result<bool, PresentationError> {
    for path in &field.path {
        let Some(value) = select_path(payload, path)? else {
            continue;
        };

        let Some(filter) = &field.filter else {
            return Ok(true);
        };

        match schema::validate_with(filter, value, path) {
            Ok(()) => return Ok(true),
            Err(schema::SchemaError::Compile { reason, .. }) => {
                return Err(PresentationError::InvalidFilter {
                    path: path.clone(),
                    reason,
                });
            }
            Err(_) => {}
        }
    }

    Ok(false)
}

/// Evaluate the JSONPath subset `$`, `.name`, `['name']` and `[index]`
pub fn select_path<'a>(value: &'a Value, path: &str) -> Result<Option<&'a Value>, PresentationError> {
    let invalid = || PresentationError::InvalidPath(path.to_string());

    let mut rest = path.strip_prefix('$').ok_or_else(invalid)?;
    let mut current = value;

    while !rest.is_empty() {
        let next = if let Some(tail) = rest.strip_prefix('.') {
            let end = tail.find(['.', '[']).unwrap_or(tail.len());
            let (name, tail) = tail.split_at(end);
            if name.is_empty() {
                return Err(invalid());
            }
            rest = tail;
            current.get(name)
        } else if let Some(tail) = rest.strip_prefix('[') {
            let end = tail.find(']').ok_or_else(invalid)?;
            let (segment, tail) = tail.split_at(end);
            rest = &tail[1..];

            match segment.as_bytes().first() {
                Some(b'\'' | b'"') => {
                    let quote = &segment[..1];
                    let name = segment[1..]
                        .strip_suffix(quote)
                        .ok_or_else(invalid)?;
                    current.get(name)
                }
                _ => {
                    let index = segment.parse::<usize>().map_err(|_| invalid())?;
                    current.get(index)
                }
            }
        } else {
            return Err(invalid());
        };

        match next {
            Some(value) => current = value,
            None => return Ok(None),
        }
    }

    Ok(Some(current))
}
