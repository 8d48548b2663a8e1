use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("storage backend error: {0}")]
    Backend(String),

    /// The in-memory change was applied but could not be written.
    #[error("failed to persist pin store: {0}")]
    Persist(#[source] Box<StoreError>),

    /// The persisted store could not be read; the in-memory snapshot is kept.
    #[error("failed to load pin store: {0}")]
    Load(#[source] Box<StoreError>),
}
