use std::sync::Arc;

use anyhow::Context;
use campus_migrate::{DirBundle, MigrationRunner, ScaffoldTool, ScriptBundle, SeedRunner};
use clap::Subcommand;
use sqlx::PgPool;

#[derive(Subcommand)]
pub enum MigrationCommands {
    /// Create a new up/down migration script pair
    Create {
        /// Short name for the migration, e.g. add_exam_table
        name: String,
    },

    /// Apply pending migrations
    Up,

    /// Roll back the latest applied migration
    Down,

    /// Run every seed script
    Seed,

    /// Drop all tables and enum types, then re-apply every migration
    Fresh,

    /// Show applied and pending migrations
    Status,
}

pub async fn run(
    command: MigrationCommands,
    database_url: Option<String>,
    migrations_dir: &str,
    seeds_dir: &str,
) -> anyhow::Result<()> {
    // Scaffolding never touches the database.
    let command = match command {
        MigrationCommands::Create { name } => {
            let tool = ScaffoldTool::new(migrations_dir);
            let (up, down) = tool.create(&name)?;
            println!("create migration file on {}", up.display());
            println!("create migration file on {}", down.display());
            return Ok(());
        }
        other => other,
    };

    let pool = connect(database_url).await?;
    let bundle: Arc<dyn ScriptBundle> = Arc::new(DirBundle::new(migrations_dir, seeds_dir));

    match command {
        MigrationCommands::Create { .. } => unreachable!("handled above"),
        MigrationCommands::Up => {
            let runner = MigrationRunner::new(pool, bundle);
            let result = runner.up().await?;
            println!("applied {} migration(s)", result.applied_count());
        }
        MigrationCommands::Down => {
            let runner = MigrationRunner::new(pool, bundle);
            let result = runner.down().await?;
            match result.rolled_back {
                Some(version) => println!("rolled back {}", version),
                None => println!("no migration version to roll back"),
            }
        }
        MigrationCommands::Seed => {
            let seeder = SeedRunner::new(pool, bundle);
            let result = seeder.seed().await?;
            println!("executed {} seed script(s)", result.executed_count());
        }
        MigrationCommands::Fresh => {
            let runner = MigrationRunner::new(pool, bundle);
            let result = runner.fresh().await?;
            println!(
                "dropped {} table(s) and {} type(s), applied {} migration(s)",
                result.dropped_tables,
                result.dropped_types,
                result.up.applied_count()
            );
        }
        MigrationCommands::Status => {
            let runner = MigrationRunner::new(pool, bundle);
            let status = runner.status().await?;
            if status.is_empty() {
                println!("no migrations found");
            } else {
                for (script, applied) in status {
                    let marker = if applied { "applied" } else { "pending" };
                    println!("  [{}] {}", marker, script.version);
                }
            }
        }
    }

    Ok(())
}

async fn connect(database_url: Option<String>) -> anyhow::Result<PgPool> {
    let url = match database_url {
        Some(url) => url,
        None => std::env::var("DATABASE_URL")
            .context("no --database-url given and DATABASE_URL is not set")?,
    };

    PgPool::connect(&url)
        .await
        .context("failed to connect to database")
}
