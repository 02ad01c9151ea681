use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClarionError>;

#[derive(Debug, Error)]
pub enum ClarionError {
    #[error("Storage error: {0}")]
    Storage(#[from] redb::Error),

    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Storage operation error: {0}")]
    StorageOperation(#[from] redb::StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No model credential configured. Worded differently from outage
    /// errors on purpose — the user can fix this one themselves.
    #[error("No API key configured. Add your API key to enable AI features.")]
    CredentialMissing,

    /// The endpoint rejected the credential. Aborts fallback chains:
    /// a bad key fails the same way against every model.
    #[error("API key rejected: {0}")]
    InvalidCredential(String),

    #[error("All models failed: {0}")]
    AllModelsFailed(String),

    #[error("Malformed model output: {0}")]
    MalformedModelOutput(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Validation error: {0}")]
    Validation(String),
}
