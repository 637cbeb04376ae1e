//! Error types for the retirement form engine

use thiserror::Error;

/// Result type for form operations
pub type Result<T> = std::result::Result<T, FormError>;

/// Errors that can occur while building or driving a form.
///
/// Invalid user input is never an error: it only shows up as failure reasons
/// on the affected field.
#[derive(Debug, Error)]
pub enum FormError {
    /// Field not found by name
    #[error("field not found: {name}")]
    UnknownField { name: String },

    /// Two descriptors share a name
    #[error("duplicate field name: {name}")]
    DuplicateField { name: String },

    /// A cross-field constraint points at a field that does not exist
    #[error("field '{field}' references unknown sibling field '{sibling}'")]
    UnknownSibling { field: String, sibling: String },

    /// A pattern constraint does not compile
    #[error("invalid pattern '{pattern}' on field '{field}': {source}")]
    InvalidPattern {
        field: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A range constraint with `min > max`
    #[error("invalid range on field '{field}': {min} > {max}")]
    InvalidRange { field: String, min: f64, max: f64 },

    /// A valid snapshot could not be turned into a calculator request
    #[error("field '{field}' is missing or malformed in the submission payload")]
    IncompletePayload { field: String },

    /// Configuration could not be extracted
    #[error("configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl From<figment::Error> for FormError {
    fn from(err: figment::Error) -> Self {
        FormError::Config(Box::new(err))
    }
}
