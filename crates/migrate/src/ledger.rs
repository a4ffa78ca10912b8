//! Version ledger - the persisted record of applied migration versions.
//!
//! One row per applied version. The table carries no primary key or
//! uniqueness constraint; correctness relies on the runner only ever
//! appending the next pending versions and removing the single latest one.

use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool, Row};

use crate::error::MigrationResult;

/// Default name of the ledger table
pub const DEFAULT_LEDGER_TABLE: &str = "migrations";

/// One applied migration version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Version string shared with the script pair, e.g. `3_add_index`
    pub version: String,
    /// When the version was applied, epoch milliseconds
    pub created_at: i64,
}

/// Operations on the ledger table.
///
/// Reads run on the pool; writes take the caller's connection so they can
/// join the transaction that executes the script they describe.
#[derive(Debug, Clone)]
pub struct VersionLedger {
    table: String,
}

impl VersionLedger {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    /// Name of the ledger table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the ledger table if it does not exist yet.
    pub async fn ensure_table(&self, pool: &PgPool) -> MigrationResult<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    \
                version VARCHAR(255) NOT NULL,\n    \
                created_at BIGINT NOT NULL\n\
            )",
            self.table
        );
        sqlx::query(&sql).execute(pool).await?;
        Ok(())
    }

    /// The most recently applied version, or `None` when no migration has
    /// been applied yet. `None` is the expected empty-ledger signal, not
    /// an error.
    pub async fn latest(&self, pool: &PgPool) -> MigrationResult<Option<VersionRecord>> {
        let sql = format!(
            "SELECT version, created_at FROM {} ORDER BY created_at DESC LIMIT 1",
            self.table
        );
        let row = sqlx::query(&sql).fetch_optional(pool).await?;

        match row {
            Some(row) => Ok(Some(VersionRecord {
                version: row.try_get("version")?,
                created_at: row.try_get("created_at")?,
            })),
            None => Ok(None),
        }
    }

    /// Insert a row for a freshly applied version.
    pub async fn record(
        &self,
        conn: &mut PgConnection,
        version: &str,
        created_at: i64,
    ) -> MigrationResult<()> {
        let sql = format!(
            "INSERT INTO {} (version, created_at) VALUES ($1, $2)",
            self.table
        );
        sqlx::query(&sql)
            .bind(version)
            .bind(created_at)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Delete the row for a rolled-back version.
    pub async fn remove(&self, conn: &mut PgConnection, version: &str) -> MigrationResult<()> {
        let sql = format!("DELETE FROM {} WHERE version = $1", self.table);
        sqlx::query(&sql).bind(version).execute(conn).await?;
        Ok(())
    }
}

impl Default for VersionLedger {
    fn default() -> Self {
        Self::new(DEFAULT_LEDGER_TABLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_name() {
        assert_eq!(VersionLedger::default().table(), DEFAULT_LEDGER_TABLE);
    }

    #[test]
    fn custom_table_name() {
        assert_eq!(VersionLedger::new("schema_history").table(), "schema_history");
    }
}
