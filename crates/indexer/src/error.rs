use scraper::Selector;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("invalid selector `{selector}`: {message}")]
    Selector { selector: String, message: String },

    /// The element was re-rendered or removed since it was looked up.
    #[error("stale element reference")]
    StaleElement,

    #[error("invalid page url: {0}")]
    InvalidUrl(String),
}

pub(crate) fn parse_selector(raw: &str) -> Result<Selector> {
    Selector::parse(raw).map_err(|err| IndexerError::Selector {
        selector: raw.to_string(),
        message: err.to_string(),
    })
}
