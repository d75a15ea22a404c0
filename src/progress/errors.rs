use thiserror::Error;

/// Errors that can arise inside the progress layers (local cache, remote
/// profiles, catalog loading). The unlock surface never returns these; it logs
/// them and falls back to a default.
#[derive(Debug, Error)]
pub enum ProgressError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around JSON errors (profile documents, catalog seeds).
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Wrapper around IO errors (directory creation, profile files, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when fetching a record that is not present.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Two catalog entries share an id or a display name.
    #[error("duplicate definition {field}: {value}")]
    DuplicateDefinition { field: &'static str, value: String },

    /// Identity id rejected before it could be used as a namespace or filename.
    #[error("invalid identity id: {0}")]
    InvalidIdentity(String),

    /// Returned when a record carries a schema version newer than this build understands.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// Remote profile store failure (unreachable, oversized document, ...).
    #[error("remote profile store error: {0}")]
    Remote(String),

    /// Internal error (task join errors, unexpected conditions)
    #[error("internal error: {0}")]
    Internal(String),
}
