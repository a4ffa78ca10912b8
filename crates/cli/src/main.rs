mod commands;

use clap::{Parser, Subcommand};
use commands::migration::MigrationCommands;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "campus")]
#[command(about = "Campus platform CLI")]
struct Cli {
    /// Postgres connection string; falls back to DATABASE_URL
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Directory holding migration script pairs
    #[arg(long, global = true, default_value = "migrations")]
    migrations_dir: String,

    /// Directory holding seed scripts
    #[arg(long, global = true, default_value = "seeds")]
    seeds_dir: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database schema migration management
    Migration {
        #[command(subcommand)]
        migration_command: MigrationCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Migration { migration_command } => {
            commands::migration::run(
                migration_command,
                cli.database_url,
                &cli.migrations_dir,
                &cli.seeds_dir,
            )
            .await
        }
    }
}
