//! Error types for introspection lookups and declaration loading.

/// Errors raised at the introspection boundary.
#[derive(Debug, thiserror::Error)]
pub enum IntrospectError {
    /// A type was requested by name but is not declared.
    #[error("type not found: {0}")]
    TypeNotFound(String),

    /// A type with this name is already registered.
    #[error("duplicate type declaration: {0}")]
    DuplicateType(String),

    /// A type expression could not be parsed.
    #[error("malformed type expression `{input}`: {reason}")]
    MalformedTypeRef { input: String, reason: String },

    /// A declared name is empty or not a valid identifier.
    #[error("invalid identifier `{0}`")]
    InvalidIdentifier(String),

    /// The registry document is not valid JSON for the declaration schema.
    #[error("invalid registry document: {0}")]
    ParseJson(#[from] serde_json::Error),
}
