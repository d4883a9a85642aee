use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feedtide::app::AppContext;
use feedtide::cli::commands::{self, BrowseScope};
use feedtide::cli::{Cli, Commands};
use feedtide::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("feedtide=info")))
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let ctx = AppContext::new(&config, cli.db)?;

    match cli.command {
        Commands::Register { name } => {
            commands::register_user(&ctx, &name)?;
        }
        Commands::Users => {
            commands::list_users(&ctx)?;
        }
        Commands::Addfeed { name, url, user } => {
            commands::add_feed(&ctx, &name, &url, &user)?;
        }
        Commands::Follow { url, user } => {
            commands::follow(&ctx, &url, &user)?;
        }
        Commands::Following { user } => {
            commands::following(&ctx, &user)?;
        }
        Commands::Unfollow { url, user } => {
            commands::unfollow(&ctx, &url, &user)?;
        }
        Commands::Feeds { json } => {
            commands::list_feeds(&ctx, json)?;
        }
        Commands::Agg { interval } => {
            let interval = interval.unwrap_or(config.aggregator.interval);
            commands::aggregate(&ctx, &interval).await?;
        }
        Commands::Browse {
            limit,
            feed,
            user,
            json,
        } => {
            let scope = match (feed.as_deref(), user.as_deref()) {
                (Some(url), _) => BrowseScope::Feed(url),
                (None, Some(name)) => BrowseScope::User(name),
                (None, None) => BrowseScope::All,
            };
            commands::browse(&ctx, limit, scope, json)?;
        }
    }

    Ok(())
}
