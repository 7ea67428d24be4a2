use thiserror::Error;

/// Errors surfaced by the NextChapter core.
///
/// Every variant is recoverable at some call site: `Config` disables the
/// affected feature, `Catalog` is shown inline on the failing shelf,
/// `AuthRequired` prompts sign-in, `AlreadySaved` is informational, and
/// `Store` is surfaced as a dismissible message.
#[derive(Debug, Error)]
pub enum Error {
    /// A required configuration value is missing or empty. The payload
    /// names the environment variable.
    #[error("missing configuration value {0}")]
    Config(String),

    /// The catalog source returned a non-success status, a transport
    /// error occurred, or the response body could not be decoded.
    #[error("catalog error: {0}")]
    Catalog(String),

    /// No authenticated session; the caller should prompt sign-in
    /// instead of dropping the action.
    #[error("sign in required")]
    AuthRequired,

    /// The (user, book) link already exists. Expected on a repeat save,
    /// not a failure.
    #[error("already saved")]
    AlreadySaved,

    /// Any other backend store failure.
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
