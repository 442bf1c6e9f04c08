//! `wish` subcommands: add and list wish-list entries.

use clap::Subcommand;

#[derive(Debug, Subcommand)]
pub enum WishCommands {
    /// Add a product to the wish list; the name is used as the search term
    Add {
        name: String,

        /// Reference link to the product
        #[arg(long)]
        url: Option<String>,

        /// Higher priorities are scraped first
        #[arg(long, default_value_t = 0)]
        priority: i32,
    },
    /// List the wish list in scrape order
    List,
}

/// # Errors
///
/// Returns an error if the name is blank or the database call fails.
pub(crate) async fn run_wish(pool: &sqlx::PgPool, command: WishCommands) -> anyhow::Result<()> {
    match command {
        WishCommands::Add {
            name,
            url,
            priority,
        } => {
            if name.trim().is_empty() {
                anyhow::bail!("wish item name must not be blank");
            }
            let row =
                pricewatch_db::insert_wish_item(pool, &name, url.as_deref(), priority).await?;
            println!("added wish item #{} \"{}\"", row.id, row.name);
        }
        WishCommands::List => {
            let rows = pricewatch_db::list_wish_items(pool).await?;
            if rows.is_empty() {
                println!("wish list is empty; add one with `wish add <name>`");
                return Ok(());
            }
            println!("{:<6}{:<10}{:<40}URL", "ID", "PRIORITY", "NAME");
            for row in &rows {
                println!(
                    "{:<6}{:<10}{:<40}{}",
                    row.id,
                    row.priority,
                    truncate(&row.name, 38),
                    row.url.as_deref().unwrap_or("-")
                );
            }
        }
    }
    Ok(())
}

pub(crate) fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        format!("{}...", s.chars().take(max_chars.saturating_sub(3)).collect::<String>())
    } else {
        s.to_string()
    }
}
