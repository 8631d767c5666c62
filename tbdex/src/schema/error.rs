use std::fmt;

/// A single structural violation, located by a dotted path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    pub path: String,
    pub message: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SchemaError {
    #[error("{}", render(.violations))]
    Invalid {
        schema: String,
        violations: Vec<SchemaViolation>,
    },
    #[error("failed to compile schema '{schema}': {reason}")]
    Compile { schema: String, reason: String },
}

/// Numbered, one violation per line
fn render(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .enumerate()
        .map(|(i, violation)| format!("{}. {violation}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}
