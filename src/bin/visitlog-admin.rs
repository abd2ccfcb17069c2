use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use visitlog::config::{AdminConfig, Config};
use visitlog::storage::{self, VisitStorage, SCHEMA_SQL};

#[derive(Parser)]
#[command(name = "visitlog-admin")]
#[command(about = "visitlog storage management CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the SQL that creates the visits table
    Schema,
    /// Check that storage is reachable and the visits table exists
    Check,
    /// Print the most recent visits
    Recent {
        /// Number of visits to show
        #[arg(short, long, default_value_t = 20)]
        limit: i64,
        /// Print rows as JSON lines
        #[arg(long)]
        json: bool,
    },
}

async fn open_storage() -> Result<Arc<dyn VisitStorage>> {
    let config = Config::from_env()?;
    storage::connect(&config.database).await
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Schema => {
            println!("{SCHEMA_SQL}");
        }
        Commands::Check => {
            let storage = open_storage().await?;
            storage
                .init()
                .await
                .context("storage check failed; run `visitlog-admin schema` for the table DDL")?;
            println!("✅ Storage is reachable and the visits table is available");
        }
        Commands::Recent { limit, json } => {
            let limit = limit.clamp(1, AdminConfig::MAX_LIST_LIMIT);
            let storage = open_storage().await?;
            let visits = storage
                .list_recent(limit)
                .await
                .context("failed to fetch recent visits")?;

            if visits.is_empty() {
                println!("No visits recorded.");
                return Ok(());
            }

            for visit in &visits {
                if json {
                    println!("{}", serde_json::to_string(visit)?);
                } else {
                    println!(
                        "{}  {:<39}  {:<30}  {}",
                        visit.ts.to_rfc3339(),
                        visit.ip.as_deref().unwrap_or("-"),
                        visit.remote_host.as_deref().unwrap_or("-"),
                        visit.user_agent.as_deref().unwrap_or("-"),
                    );
                }
            }

            if !json {
                println!("\nTotal: {}", visits.len());
            }
        }
    }

    Ok(())
}
