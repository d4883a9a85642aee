pub mod timestamp;

pub use timestamp::normalize_timestamp;

use html_escape::decode_html_entities;
use rss::Channel;

use crate::app::{FeedtideError, Result};
use crate::domain::{NormalizedItem, RawFeed, RawItem};

/// Decode an RSS document into a [`RawFeed`].
///
/// Titles and descriptions are HTML-unescaped after XML decoding, since
/// feeds routinely double-encode entities (`&amp;amp;`). A channel without
/// items is an error.
pub fn decode_feed(url: &str, body: &[u8]) -> Result<RawFeed> {
    let channel = Channel::read_from(body).map_err(|e| FeedtideError::Decode(e.to_string()))?;

    if channel.items().is_empty() {
        return Err(FeedtideError::EmptyFeed(url.to_string()));
    }

    let items = channel
        .items()
        .iter()
        .map(|item| RawItem {
            title: item.title().map(unescape).unwrap_or_default(),
            link: item
                .link()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from),
            description: item.description().map(unescape),
            pub_date: item.pub_date().map(|d| d.trim().to_string()),
        })
        .collect();

    Ok(RawFeed {
        title: unescape(channel.title()),
        link: channel.link().trim().to_string(),
        description: unescape(channel.description()),
        items,
    })
}

/// Pair every item with its parsed publish date.
pub fn normalize_items(feed: RawFeed) -> Vec<NormalizedItem> {
    feed.items
        .into_iter()
        .map(|item| {
            let published_at = normalize_timestamp(item.pub_date.as_deref().unwrap_or(""));
            NormalizedItem { item, published_at }
        })
        .collect()
}

fn unescape(s: &str) -> String {
    decode_html_entities(s.trim()).to_string()
}
