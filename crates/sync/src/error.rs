use thiserror::Error;

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("store error: {0}")]
    Store(#[from] pinboard_store::StoreError),

    #[error("document error: {0}")]
    Document(#[from] pinboard_indexer::IndexerError),

    #[error("site configuration error: {0}")]
    Site(#[from] pinboard_site::SiteError),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// The event loop has stopped; the handle outlived it.
    #[error("pinboard runtime is not running: {0}")]
    Stopped(String),
}
