//! Scaffolding for new migration script pairs.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::MigrationResult;

/// Creates empty up/down script pairs in the migrations directory.
pub struct ScaffoldTool {
    migrations_dir: PathBuf,
}

impl ScaffoldTool {
    pub fn new(migrations_dir: impl Into<PathBuf>) -> Self {
        Self {
            migrations_dir: migrations_dir.into(),
        }
    }

    pub fn migrations_dir(&self) -> &Path {
        &self.migrations_dir
    }

    /// Create `<next>_<name>.up.sql` and `<next>_<name>.down.sql`.
    ///
    /// Scripts come in pairs, so the next sequence number is half the
    /// current entry count plus one. Returns both paths for printing.
    pub fn create(&self, name: &str) -> MigrationResult<(PathBuf, PathBuf)> {
        fs::create_dir_all(&self.migrations_dir)?;

        let entries = fs::read_dir(&self.migrations_dir)?.count();
        let sequence = entries / 2 + 1;

        let up = self
            .migrations_dir
            .join(format!("{}_{}.up.sql", sequence, name));
        let down = self
            .migrations_dir
            .join(format!("{}_{}.down.sql", sequence, name));

        fs::write(&up, "")?;
        fs::write(&down, "")?;

        Ok((up, down))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_pair_gets_sequence_one() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ScaffoldTool::new(dir.path());

        let (up, down) = tool.create("init").unwrap();
        assert_eq!(up.file_name().unwrap(), "1_init.up.sql");
        assert_eq!(down.file_name().unwrap(), "1_init.down.sql");
        assert!(up.exists());
        assert!(down.exists());
    }

    #[test]
    fn sequence_advances_per_pair() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ScaffoldTool::new(dir.path());

        tool.create("init").unwrap();
        let (up, _) = tool.create("add_users").unwrap();
        assert_eq!(up.file_name().unwrap(), "2_add_users.up.sql");

        let (up, _) = tool.create("add_index").unwrap();
        assert_eq!(up.file_name().unwrap(), "3_add_index.up.sql");
    }

    #[test]
    fn creates_missing_migrations_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("db").join("migrations");
        let tool = ScaffoldTool::new(&nested);

        let (up, _) = tool.create("init").unwrap();
        assert!(up.exists());
        assert!(nested.is_dir());
    }
}
