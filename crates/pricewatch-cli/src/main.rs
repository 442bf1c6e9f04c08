mod history;
mod scrape;
mod wish;

use clap::{Parser, Subcommand};
use pricewatch_core::AppConfig;

use crate::scrape::ScrapeTarget;
use crate::wish::WishCommands;

#[derive(Debug, Parser)]
#[command(name = "pricewatch-cli")]
#[command(about = "Track wish-list prices on Amazon BR and Mercado Livre")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Search every site for wish items and record the prices found
    Scrape {
        /// Scrape a single wish item by id
        #[arg(long, conflicts_with = "term")]
        item: Option<i64>,

        /// Search an ad hoc term instead of the wish list (nothing is stored)
        #[arg(long)]
        term: Option<String>,

        /// Run the searches but write nothing to the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Manage the wish list
    Wish {
        #[command(subcommand)]
        command: WishCommands,
    },
    /// Show recorded prices, newest first
    History {
        /// Only show prices for this wish item
        #[arg(long)]
        item: Option<i64>,

        /// Maximum number of rows to show
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("pricewatch-cli ready; run with --help for commands");
        return Ok(());
    };

    let config = pricewatch_core::load_app_config_from_env()?;
    init_tracing(&config.log_level);

    match command {
        Commands::Db { command } => {
            let pool = connect(&config).await?;
            match command {
                DbCommands::Ping => {
                    pricewatch_db::health_check(&pool).await?;
                    println!("database reachable");
                }
                DbCommands::Migrate => {
                    let applied = pricewatch_db::run_migrations(&pool).await?;
                    println!("applied {applied} migration(s)");
                }
            }
        }
        Commands::Scrape {
            item,
            term,
            dry_run,
        } => {
            let target = match (item, term) {
                (_, Some(term)) => ScrapeTarget::Term(term),
                (Some(id), None) => ScrapeTarget::Item(id),
                (None, None) => ScrapeTarget::All,
            };
            scrape::run_scrape(&config, target, dry_run).await?;
        }
        Commands::Wish { command } => {
            let pool = connect(&config).await?;
            wish::run_wish(&pool, command).await?;
        }
        Commands::History { item, limit } => {
            let pool = connect(&config).await?;
            history::run_history(&pool, item, limit).await?;
        }
    }

    Ok(())
}

fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

pub(crate) async fn connect(config: &AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool = pricewatch_db::connect_pool(
        &config.database_url,
        pricewatch_db::PoolConfig::from_app_config(config),
    )
    .await?;
    Ok(pool)
}
