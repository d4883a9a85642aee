//! # feedtide
//!
//! Collects RSS feeds that users subscribe to into one shared post store.
//!
//! ## Architecture
//!
//! ```text
//! Scheduler → Worker → Fetcher → Normalizer → Store
//! ```
//!
//! - [`aggregator`]: polling scheduler and per-feed ingestion worker
//! - [`fetcher`]: HTTP retrieval of feed documents
//! - [`normalizer`]: RSS decoding and publication-date parsing
//! - [`store`]: SQLite persistence
//!
//! ## Quick Start
//!
//! ```bash
//! feedtide register alice
//! feedtide addfeed "Rust Blog" https://blog.rust-lang.org/feed.xml --user alice
//! feedtide agg 1m
//! feedtide browse --limit 10
//! ```

/// Polling scheduler and ingestion worker.
///
/// - [`Scheduler`](aggregator::Scheduler): one feed per tick, least recently fetched first
/// - [`IngestWorker`](aggregator::IngestWorker): mark, fetch, normalize, store
/// - [`run_aggregator`](aggregator::run_aggregator): entry point used by `feedtide agg`
pub mod aggregator;

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the store,
/// fetcher and clock.
pub mod app;

/// Command-line interface using clap.
pub mod cli;

/// Configuration file and interval parsing.
pub mod config;

/// Core domain models: users, feeds, posts and the transient fetched shapes.
pub mod domain;

/// HTTP fetching.
///
/// - [`Fetcher`](fetcher::Fetcher): async trait for feed retrieval
/// - [`HttpFetcher`](fetcher::HttpFetcher): reqwest-based implementation
pub mod fetcher;

/// RSS decoding and timestamp normalization.
pub mod normalizer;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;
