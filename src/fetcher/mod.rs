pub mod http_fetcher;

pub use http_fetcher::HttpFetcher;

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::RawFeed;
use crate::normalizer::decode_feed;

/// Retrieves the raw bytes of a feed document.
///
/// Implementations issue exactly one request per call; retrying is left to
/// the scheduler's next tick.
#[async_trait]
pub trait Fetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Fetch `url` and decode it into a [`RawFeed`].
///
/// Errors are [`Fetch`](crate::app::FeedtideError::Fetch) for transport
/// failures, [`Decode`](crate::app::FeedtideError::Decode) for malformed
/// XML and [`EmptyFeed`](crate::app::FeedtideError::EmptyFeed) when the
/// channel has no items.
pub async fn fetch_feed(fetcher: &(dyn Fetcher + Send + Sync), url: &str) -> Result<RawFeed> {
    let body = fetcher.fetch(url).await?;
    tracing::debug!(url, bytes = body.len(), "fetched feed body");
    decode_feed(url, &body)
}
