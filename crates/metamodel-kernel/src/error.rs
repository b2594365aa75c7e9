//! Error types for metamodel kernel operations.
//!
//! Only lookup, argument and loading failures are errors. Inconsistencies
//! in a built model are reported as validation failures instead.

use metamodel_introspect::IntrospectError;

/// Errors arising from lookups and malformed requests.
#[derive(Debug, thiserror::Error)]
pub enum MetamodelError {
    /// No member, or more than one compatible member, matches the request.
    #[error("no unique member {type_name}#{name}({params}): {candidates} compatible candidates")]
    NotFound {
        type_name: String,
        name: String,
        params: String,
        candidates: usize,
    },

    /// An argument was rejected before anything was applied.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The introspection source could not answer.
    #[error(transparent)]
    Introspect(#[from] IntrospectError),

    #[error("failed to read file: {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid toml at {path}: {source}")]
    ParseToml {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

impl MetamodelError {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}
