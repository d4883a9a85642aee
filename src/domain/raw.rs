//! Transient shapes of a fetched RSS document, before normalization.

/// One decoded RSS channel. Text fields are already HTML-unescaped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFeed {
    pub title: String,
    pub link: String,
    pub description: String,
    pub items: Vec<RawItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawItem {
    pub title: String,
    pub link: Option<String>,
    pub description: Option<String>,
    /// The `<pubDate>` text exactly as published.
    pub pub_date: Option<String>,
}
