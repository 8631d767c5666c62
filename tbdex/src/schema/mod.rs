//! Named JSON Schemas for every envelope and kind-specific `data` payload.
//!
//! Validation collects every violation instead of stopping at the first one.

use jsonschema::Validator;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::{collections::HashMap, fmt};

mod error;

pub use error::{SchemaError, SchemaViolation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaName {
    Message,
    Resource,
    Rfq,
    Quote,
    Order,
    OrderStatus,
    Close,
    Offering,
    Balance,
}

impl SchemaName {
    const ALL: [SchemaName; 9] = [
        SchemaName::Message,
        SchemaName::Resource,
        SchemaName::Rfq,
        SchemaName::Quote,
        SchemaName::Order,
        SchemaName::OrderStatus,
        SchemaName::Close,
        SchemaName::Offering,
        SchemaName::Balance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaName::Message => "message",
            SchemaName::Resource => "resource",
            SchemaName::Rfq => "rfq",
            SchemaName::Quote => "quote",
            SchemaName::Order => "order",
            SchemaName::OrderStatus => "orderstatus",
            SchemaName::Close => "close",
            SchemaName::Offering => "offering",
            SchemaName::Balance => "balance",
        }
    }

    /// Name used for a violation that has no deeper instance path
    fn root(&self) -> &'static str {
        match self {
            SchemaName::Resource | SchemaName::Offering | SchemaName::Balance => "resource",
            _ => "message",
        }
    }

    fn source(&self) -> &'static str {
        match self {
            SchemaName::Message => include_str!("../../schemas/message.schema.json"),
            SchemaName::Resource => include_str!("../../schemas/resource.schema.json"),
            SchemaName::Rfq => include_str!("../../schemas/rfq.schema.json"),
            SchemaName::Quote => include_str!("../../schemas/quote.schema.json"),
            SchemaName::Order => include_str!("../../schemas/order.schema.json"),
            SchemaName::OrderStatus => include_str!("../../schemas/orderstatus.schema.json"),
            SchemaName::Close => include_str!("../../schemas/close.schema.json"),
            SchemaName::Offering => include_str!("../../schemas/offering.schema.json"),
            SchemaName::Balance => include_str!("../../schemas/balance.schema.json"),
        }
    }
}

impl fmt::Display for SchemaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static VALIDATORS: Lazy<HashMap<SchemaName, Result<Validator, String>>> = Lazy::new(|| {
    SchemaName::ALL
        .into_iter()
        .map(|name| (name, compile_source(name.source())))
        .collect()
});

fn compile_source(source: &str) -> Result<Validator, String> {
    let schema = serde_json::from_str::<Value>(source).map_err(|err| err.to_string())?;
    jsonschema::validator_for(&schema).map_err(|err| err.to_string())
}

/// Validate `instance` against one of the built-in schemas
pub fn validate(name: SchemaName, instance: &Value) -> Result<(), SchemaError> {
    let validator = match VALIDATORS.get(&name) {
        Some(Ok(validator)) => validator,
        Some(Err(reason)) => {
            return Err(SchemaError::Compile {
                schema: name.to_string(),
                reason: reason.clone(),
            });
        }
        None => {
            return Err(SchemaError::Compile {
                schema: name.to_string(),
                reason: "unknown schema".to_string(),
            });
        }
    };

    collect(validator, instance, name.as_str(), name.root())
}

/// Validate `instance` against a schema that is only known at runtime,
/// such as an offering's required payment details
pub fn validate_with(schema: &Value, instance: &Value, root: &str) -> Result<(), SchemaError> {
    let validator = jsonschema::validator_for(schema).map_err(|err| SchemaError::Compile {
        schema: root.to_string(),
        reason: err.to_string(),
    })?;

    collect(&validator, instance, root, root)
}

fn collect(
    validator: &Validator,
    instance: &Value,
    schema: &str,
    root: &str,
) -> Result<(), SchemaError> {
    let violations = validator
        .iter_errors(instance)
        .map(|error| SchemaViolation {
            path: to_dotted_path(root, &error.instance_path.to_string()),
            message: error.to_string(),
        })
        .collect::<Vec<_>>();

    if violations.is_empty() {
        return Ok(());
    }

    tracing::debug!("{} violation(s) of schema {schema}", violations.len());

    Err(SchemaError::Invalid {
        schema: schema.to_string(),
        violations,
    })
}

fn to_dotted_path(root: &str, pointer: &str) -> String {
    if pointer.is_empty() || pointer == "/" {
        return root.to_string();
    }

    let mut path = root.to_string();
    for segment in pointer.trim_start_matches('/').split('/') {
        path.push('.');
        path.push_str(&segment.replace("~1", "/").replace("~0", "~"));
    }
    path
}
