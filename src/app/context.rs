use std::path::PathBuf;
use std::sync::Arc;

use crate::aggregator::{Clock, SystemClock};
use crate::app::error::{FeedtideError, Result};
use crate::config::Config;
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::store::sqlite::SqliteStore;

pub struct AppContext {
    pub store: Arc<SqliteStore>,
    pub fetcher: Arc<dyn Fetcher + Send + Sync>,
    pub clock: Arc<dyn Clock + Send + Sync>,
}

impl AppContext {
    /// Open the store and HTTP client described by `config`.
    ///
    /// `db_path` overrides `config.database.path`.
    pub fn new(config: &Config, db_path: Option<PathBuf>) -> Result<Self> {
        let db_path = match db_path.or_else(|| config.database.path.clone()) {
            Some(p) => p,
            None => Self::default_db_path()?,
        };

        let store = Arc::new(SqliteStore::new(&db_path)?);
        let fetcher = HttpFetcher::with_options(
            &config.aggregator.user_agent,
            config.aggregator.request_timeout()?,
        )?;

        Ok(Self {
            store,
            fetcher: Arc::new(fetcher),
            clock: Arc::new(SystemClock),
        })
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            store: Arc::new(SqliteStore::in_memory()?),
            fetcher: Arc::new(HttpFetcher::new()?),
            clock: Arc::new(SystemClock),
        })
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| FeedtideError::Config("Could not find data directory".into()))?;
        let feedtide_dir = data_dir.join("feedtide");
        std::fs::create_dir_all(&feedtide_dir)?;
        Ok(feedtide_dir.join("feedtide.db"))
    }
}
