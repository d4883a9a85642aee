use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedtideError {
    #[error("Database error: {0}")]
    Database(rusqlite::Error),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Post already exists for feed {feed_id}: {url}")]
    DuplicatePost { feed_id: i64, url: String },

    #[error("Fetch error: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("Feed decode error: {0}")]
    Decode(String),

    #[error("Feed has no items: {0}")]
    EmptyFeed(String),

    #[error("Unrecognized time format: {0:?}")]
    UnrecognizedTimeFormat(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Feed not found: {0}")]
    FeedNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("User {user_id} already follows feed {feed_id}")]
    AlreadyFollowing { user_id: i64, feed_id: i64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl FeedtideError {
    /// The store rejected a post because `(feed_id, url)` is already taken.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, FeedtideError::DuplicatePost { .. })
    }

    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, FeedtideError::StoreUnavailable(_))
    }
}

/// Connection-level SQLite failures become `StoreUnavailable`; everything
/// else stays a plain `Database` error.
impl From<rusqlite::Error> for FeedtideError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(
                ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::CannotOpen
                | ErrorCode::SystemIoFailure,
            ) => FeedtideError::StoreUnavailable(err.to_string()),
            _ => FeedtideError::Database(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, FeedtideError>;
