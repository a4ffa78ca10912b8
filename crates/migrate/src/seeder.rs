//! Seed runner - unconditional reference-data scripts.
//!
//! Seeds run every time, in bundle listing order, with no ledger and no
//! transaction spanning files. A failure stops the run but leaves earlier
//! scripts' effects in place; scripts that need to be re-runnable must
//! carry their own upsert logic.

use std::sync::Arc;

use sqlx::PgPool;

use crate::bundle::ScriptBundle;
use crate::error::{MigrationError, MigrationResult};
use crate::sql::split_statements;

/// Result of a seed run
#[derive(Debug)]
pub struct SeedResult {
    /// Seed scripts executed to completion
    pub executed: Vec<String>,
}

impl SeedResult {
    pub fn executed_count(&self) -> usize {
        self.executed.len()
    }
}

/// Executes every seed script in the bundle.
pub struct SeedRunner {
    pool: PgPool,
    bundle: Arc<dyn ScriptBundle>,
}

impl SeedRunner {
    pub fn new(pool: PgPool, bundle: Arc<dyn ScriptBundle>) -> Self {
        Self { pool, bundle }
    }

    /// Run every seed script once, in listing order.
    pub async fn seed(&self) -> MigrationResult<SeedResult> {
        let mut executed = Vec::new();

        for path in self.bundle.list_seeds()? {
            tracing::info!(script = %path, "running seed script");

            let body = self.bundle.read_script(&path)?;
            for statement in split_statements(&body) {
                sqlx::query(&statement)
                    .execute(&self.pool)
                    .await
                    .map_err(|source| MigrationError::ScriptExecution {
                        path: path.clone(),
                        source,
                    })?;
            }

            executed.push(path);
        }

        tracing::info!(count = executed.len(), "seed scripts executed");
        Ok(SeedResult { executed })
    }
}
