use thiserror::Error;

pub type Result<T> = std::result::Result<T, SiteError>;

#[derive(Error, Debug)]
pub enum SiteError {
    #[error("site '{site}': invalid selector `{selector}`: {message}")]
    InvalidSelector {
        site: String,
        selector: String,
        message: String,
    },

    #[error("site '{0}' has no host patterns")]
    NoHosts(String),

    #[error("site '{0}' pins user messages but defines no message_selector_user")]
    MissingUserSelector(String),

    #[error("site configuration parse error: {0}")]
    Parse(String),
}
