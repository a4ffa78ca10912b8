//! Migration runner - applies, rolls back and resets schema migrations.
//!
//! Each operation is one transaction: `up` covers the whole pending batch,
//! `down` a single version, `fresh` the drop phase. The runner assumes at
//! most one migration process per database; there is no advisory lock, so
//! two concurrent invocations can read the same latest version and both
//! apply it.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use sqlx::PgPool;

use crate::bundle::{extract_sequence, ordered_migrations, Direction, MigrationScript, ScriptBundle};
use crate::error::{MigrationError, MigrationResult};
use crate::ledger::{VersionLedger, VersionRecord};
use crate::sql::split_statements;

/// Result of applying pending migrations
#[derive(Debug)]
pub struct UpResult {
    /// Versions applied in this run, in execution order
    pub applied: Vec<String>,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

impl UpResult {
    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }
}

/// Result of a single-step rollback
#[derive(Debug)]
pub struct DownResult {
    /// The rolled-back version, or `None` when the ledger was empty
    pub rolled_back: Option<String>,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

/// Result of a destructive reset
#[derive(Debug)]
pub struct FreshResult {
    /// Base tables dropped from the working schema
    pub dropped_tables: usize,
    /// Enum types dropped from the working schema
    pub dropped_types: usize,
    /// The full re-migration that followed the drop phase
    pub up: UpResult,
}

/// Executes migration operations against a Postgres database.
pub struct MigrationRunner {
    pool: PgPool,
    bundle: Arc<dyn ScriptBundle>,
    ledger: VersionLedger,
}

impl MigrationRunner {
    /// Create a runner over the default ledger table.
    pub fn new(pool: PgPool, bundle: Arc<dyn ScriptBundle>) -> Self {
        Self::with_ledger(pool, bundle, VersionLedger::default())
    }

    /// Create a runner with a custom ledger.
    pub fn with_ledger(pool: PgPool, bundle: Arc<dyn ScriptBundle>, ledger: VersionLedger) -> Self {
        Self {
            pool,
            bundle,
            ledger,
        }
    }

    /// Get the database pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get the version ledger
    pub fn ledger(&self) -> &VersionLedger {
        &self.ledger
    }

    /// Apply every pending migration, ascending by sequence, inside one
    /// transaction. A failure anywhere in the batch rolls back the whole
    /// batch, ledger rows included.
    pub async fn up(&self) -> MigrationResult<UpResult> {
        let start = Instant::now();

        self.ledger.ensure_table(&self.pool).await?;
        let latest = self.ledger.latest(&self.pool).await?;

        let scripts = ordered_migrations(self.bundle.as_ref(), Direction::Up)?;
        let pending = pending_after(scripts, latest.as_ref());

        let mut applied = Vec::new();
        if !pending.is_empty() {
            let mut tx = self.pool.begin().await?;

            // Millisecond timestamps can tie within a fast batch; keep them
            // strictly increasing so latest() stays well-defined.
            let mut last_timestamp = 0_i64;

            for script in &pending {
                tracing::info!(script = %script.path, "applying migration");

                let body = self.bundle.read_script(&script.path)?;
                for statement in split_statements(&body) {
                    sqlx::query(&statement)
                        .execute(&mut *tx)
                        .await
                        .map_err(|source| MigrationError::ScriptExecution {
                            path: script.path.clone(),
                            source,
                        })?;
                }

                let timestamp = Utc::now().timestamp_millis().max(last_timestamp + 1);
                last_timestamp = timestamp;

                self.ledger
                    .record(&mut tx, &script.version, timestamp)
                    .await?;
                applied.push(script.version.clone());
            }

            tx.commit().await?;
        }

        tracing::info!(count = applied.len(), "migrations applied");
        Ok(UpResult {
            applied,
            execution_time_ms: start.elapsed().as_millis(),
        })
    }

    /// Roll back the single most recently applied version.
    ///
    /// An empty ledger is a no-op, not an error. A latest version with no
    /// matching down script is an error: silently skipping it would let an
    /// operator believe a rollback happened when nothing changed.
    pub async fn down(&self) -> MigrationResult<DownResult> {
        let start = Instant::now();

        self.ledger.ensure_table(&self.pool).await?;
        let latest = match self.ledger.latest(&self.pool).await? {
            Some(record) => record,
            None => {
                tracing::info!("no migration version to roll back");
                return Ok(DownResult {
                    rolled_back: None,
                    execution_time_ms: start.elapsed().as_millis(),
                });
            }
        };

        let downs = ordered_migrations(self.bundle.as_ref(), Direction::Down)?;
        let script = downs
            .iter()
            .find(|s| s.version == latest.version)
            .ok_or_else(|| MigrationError::MissingDownScript {
                version: latest.version.clone(),
            })?;

        tracing::info!(script = %script.path, "rolling back migration");
        let body = self.bundle.read_script(&script.path)?;

        let mut tx = self.pool.begin().await?;
        for statement in split_statements(&body) {
            sqlx::query(&statement)
                .execute(&mut *tx)
                .await
                .map_err(|source| MigrationError::ScriptExecution {
                    path: script.path.clone(),
                    source,
                })?;
        }
        self.ledger.remove(&mut tx, &script.version).await?;
        tx.commit().await?;

        Ok(DownResult {
            rolled_back: Some(script.version.clone()),
            execution_time_ms: start.elapsed().as_millis(),
        })
    }

    /// Drop every base table and enum type in the working schema, then
    /// replay all migrations from the beginning.
    ///
    /// The drop phase is one transaction; if any drop fails the schema is
    /// left untouched and re-migration is skipped.
    pub async fn fresh(&self) -> MigrationResult<FreshResult> {
        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT tablename FROM pg_tables WHERE schemaname = current_schema()",
        )
        .fetch_all(&self.pool)
        .await?;

        let types: Vec<String> = sqlx::query_scalar(
            "SELECT t.typname FROM pg_type t \
             JOIN pg_namespace n ON n.oid = t.typnamespace \
             WHERE n.nspname = current_schema() AND t.typtype = 'e'",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut tx = self.pool.begin().await?;
        for table in &tables {
            let sql = format!("DROP TABLE IF EXISTS \"{}\" CASCADE", table);
            sqlx::query(&sql).execute(&mut *tx).await?;
        }
        for type_name in &types {
            let sql = format!("DROP TYPE IF EXISTS \"{}\" CASCADE", type_name);
            sqlx::query(&sql).execute(&mut *tx).await?;
        }
        tx.commit().await?;

        tracing::info!(
            tables = tables.len(),
            types = types.len(),
            "dropped schema objects"
        );

        let up = self.up().await?;
        Ok(FreshResult {
            dropped_tables: tables.len(),
            dropped_types: types.len(),
            up,
        })
    }

    /// Every up migration with whether it is currently applied, derived
    /// from the latest recorded version (applied versions always form a
    /// prefix of the ordered sequence).
    pub async fn status(&self) -> MigrationResult<Vec<(MigrationScript, bool)>> {
        self.ledger.ensure_table(&self.pool).await?;
        let latest = self.ledger.latest(&self.pool).await?;

        let threshold = latest
            .as_ref()
            .map(|record| extract_sequence(&record.version));

        let scripts = ordered_migrations(self.bundle.as_ref(), Direction::Up)?;
        Ok(scripts
            .into_iter()
            .map(|script| {
                let applied = threshold.map_or(false, |t| script.sequence <= t);
                (script, applied)
            })
            .collect())
    }
}

/// Pending scripts are everything strictly after the latest recorded
/// version: all of them when the ledger is empty, otherwise the scripts
/// whose sequence exceeds the latest version's sequence. `scripts` must
/// already be in ascending sequence order.
fn pending_after(
    scripts: Vec<MigrationScript>,
    latest: Option<&VersionRecord>,
) -> Vec<MigrationScript> {
    match latest {
        None => scripts,
        Some(record) => {
            let threshold = extract_sequence(&record.version);
            scripts
                .into_iter()
                .filter(|script| script.sequence > threshold)
                .collect()
        }
    }
}
