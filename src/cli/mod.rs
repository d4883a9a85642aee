pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub const DEFAULT_BROWSE_LIMIT: usize = 2;

#[derive(Parser)]
#[command(name = "feedtide")]
#[command(about = "Collect RSS feeds into a shared post store", long_about = None)]
pub struct Cli {
    /// SQLite database path (overrides the config file)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register a user who can own feeds
    Register {
        name: String,
    },
    /// List registered users
    Users,
    /// Add a feed owned by a registered user, who also starts following it
    Addfeed {
        /// Display name of the feed
        name: String,
        /// URL of the RSS document
        url: String,
        /// Owning user
        #[arg(short, long)]
        user: String,
    },
    /// Follow an existing feed
    Follow {
        /// URL of the feed
        url: String,
        #[arg(short, long)]
        user: String,
    },
    /// List the feeds a user follows
    Following {
        #[arg(short, long)]
        user: String,
    },
    /// Stop following a feed
    Unfollow {
        url: String,
        #[arg(short, long)]
        user: String,
    },
    /// List feeds
    Feeds {
        #[arg(long)]
        json: bool,
    },
    /// Collect feeds until interrupted, one feed per tick
    Agg {
        /// Time between ticks (e.g. "30s", "1m", "1h30m"); defaults to the config value
        interval: Option<String>,
    },
    /// Show the most recent posts
    Browse {
        #[arg(short, long, default_value_t = DEFAULT_BROWSE_LIMIT)]
        limit: usize,
        /// Only posts from the feed with this URL
        #[arg(long)]
        feed: Option<String>,
        /// Only posts from feeds this user follows
        #[arg(short, long, conflicts_with = "feed")]
        user: Option<String>,
        #[arg(long)]
        json: bool,
    },
}
