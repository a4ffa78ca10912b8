//! Script bundles - read-only access to migration and seed scripts.
//!
//! The engine never touches storage directly; it reads scripts through the
//! [`ScriptBundle`] trait. Backends exist for compiled-in script tables,
//! real directories, and in-memory maps for tests.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MigrationError, MigrationResult};

/// Bundle path prefix for migration scripts
pub const MIGRATIONS_PREFIX: &str = "migrations";
/// Bundle path prefix for seed scripts
pub const SEEDS_PREFIX: &str = "seeds";

/// Read-only access to the scripts shipped with an application.
///
/// Listings return bundle paths (`migrations/1_init.up.sql`,
/// `seeds/admin_user.sql`) that can be passed back to [`read_script`].
/// Migration listings are returned in storage order; callers that need
/// sequence order sort afterwards. Seed scripts are executed in exactly
/// the order listed here.
///
/// [`read_script`]: ScriptBundle::read_script
pub trait ScriptBundle: Send + Sync {
    /// List every migration script in the bundle.
    fn list_migrations(&self) -> MigrationResult<Vec<String>>;

    /// List every seed script in the bundle.
    fn list_seeds(&self) -> MigrationResult<Vec<String>>;

    /// Read the body of a script by its bundle path.
    fn read_script(&self, path: &str) -> MigrationResult<String>;
}

/// Direction of a migration script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    fn suffix(self) -> &'static str {
        match self {
            Direction::Up => ".up.sql",
            Direction::Down => ".down.sql",
        }
    }
}

/// A parsed migration script name.
///
/// `3_add_index.up.sql` parses to version `3_add_index`, sequence 3,
/// direction [`Direction::Up`]. The sequence is the integer prefix before
/// the first underscore; names without a parsable prefix get sequence 0
/// and sort before everything else in listing order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationScript {
    /// Bundle path of the script
    pub path: String,
    /// Version string shared by an up/down pair
    pub version: String,
    /// Integer ordering key parsed from the filename
    pub sequence: i64,
    /// Which direction this script runs in
    pub direction: Direction,
}

impl MigrationScript {
    /// Parse a bundle path into a script, or `None` when the file name
    /// does not follow the `<n>_<name>.up.sql` / `.down.sql` convention.
    pub fn parse(path: &str) -> Option<Self> {
        let file_name = path.rsplit('/').next().unwrap_or(path);

        let (version, direction) = if let Some(v) = file_name.strip_suffix(Direction::Up.suffix())
        {
            (v, Direction::Up)
        } else if let Some(v) = file_name.strip_suffix(Direction::Down.suffix()) {
            (v, Direction::Down)
        } else {
            return None;
        };

        Some(Self {
            path: path.to_string(),
            version: version.to_string(),
            sequence: extract_sequence(version),
            direction,
        })
    }
}

/// Extract the integer ordering key from a version string.
///
/// Unparsable prefixes fall back to 0, so such scripts sort first and
/// keep their listing order relative to each other.
pub fn extract_sequence(version: &str) -> i64 {
    version
        .split('_')
        .next()
        .and_then(|prefix| prefix.parse().ok())
        .unwrap_or(0)
}

/// List the bundle's migration scripts for one direction, ordered
/// ascending by sequence. The sort is stable: equal sequences keep their
/// listing order, so repeated runs see the same order.
pub fn ordered_migrations(
    bundle: &dyn ScriptBundle,
    direction: Direction,
) -> MigrationResult<Vec<MigrationScript>> {
    let mut scripts: Vec<MigrationScript> = bundle
        .list_migrations()?
        .iter()
        .filter_map(|path| MigrationScript::parse(path))
        .filter(|script| script.direction == direction)
        .collect();

    scripts.sort_by_key(|script| script.sequence);
    Ok(scripts)
}

/// Bundle backed by compiled-in script tables.
///
/// The tables are `(file name, body)` pairs, typically populated with
/// `include_str!` so the scripts travel inside the binary:
///
/// ```ignore
/// static MIGRATIONS: &[(&str, &str)] = &[
///     ("1_init.up.sql", include_str!("../migrations/1_init.up.sql")),
///     ("1_init.down.sql", include_str!("../migrations/1_init.down.sql")),
/// ];
/// let bundle = StaticBundle::new(MIGRATIONS, &[]);
/// ```
pub struct StaticBundle {
    migrations: &'static [(&'static str, &'static str)],
    seeds: &'static [(&'static str, &'static str)],
}

impl StaticBundle {
    pub fn new(
        migrations: &'static [(&'static str, &'static str)],
        seeds: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self { migrations, seeds }
    }
}

impl ScriptBundle for StaticBundle {
    fn list_migrations(&self) -> MigrationResult<Vec<String>> {
        Ok(self
            .migrations
            .iter()
            .map(|(name, _)| format!("{}/{}", MIGRATIONS_PREFIX, name))
            .collect())
    }

    fn list_seeds(&self) -> MigrationResult<Vec<String>> {
        Ok(self
            .seeds
            .iter()
            .map(|(name, _)| format!("{}/{}", SEEDS_PREFIX, name))
            .collect())
    }

    fn read_script(&self, path: &str) -> MigrationResult<String> {
        let entry = if let Some(name) = path.strip_prefix(&format!("{}/", MIGRATIONS_PREFIX)) {
            self.migrations.iter().find(|(n, _)| *n == name)
        } else if let Some(name) = path.strip_prefix(&format!("{}/", SEEDS_PREFIX)) {
            self.seeds.iter().find(|(n, _)| *n == name)
        } else {
            None
        };

        entry
            .map(|(_, body)| body.to_string())
            .ok_or_else(|| MigrationError::ScriptNotFound {
                path: path.to_string(),
            })
    }
}

/// Bundle backed by real directories on disk. This is what the CLI uses.
pub struct DirBundle {
    migrations_dir: PathBuf,
    seeds_dir: PathBuf,
}

impl DirBundle {
    pub fn new(migrations_dir: impl Into<PathBuf>, seeds_dir: impl Into<PathBuf>) -> Self {
        Self {
            migrations_dir: migrations_dir.into(),
            seeds_dir: seeds_dir.into(),
        }
    }

    fn list_dir(&self, dir: &Path, prefix: &str) -> MigrationResult<Vec<String>> {
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                paths.push(format!(
                    "{}/{}",
                    prefix,
                    entry.file_name().to_string_lossy()
                ));
            }
        }
        Ok(paths)
    }
}

impl ScriptBundle for DirBundle {
    fn list_migrations(&self) -> MigrationResult<Vec<String>> {
        self.list_dir(&self.migrations_dir, MIGRATIONS_PREFIX)
    }

    fn list_seeds(&self) -> MigrationResult<Vec<String>> {
        self.list_dir(&self.seeds_dir, SEEDS_PREFIX)
    }

    fn read_script(&self, path: &str) -> MigrationResult<String> {
        let file = if let Some(name) = path.strip_prefix(&format!("{}/", MIGRATIONS_PREFIX)) {
            self.migrations_dir.join(name)
        } else if let Some(name) = path.strip_prefix(&format!("{}/", SEEDS_PREFIX)) {
            self.seeds_dir.join(name)
        } else {
            return Err(MigrationError::ScriptNotFound {
                path: path.to_string(),
            });
        };

        fs::read_to_string(&file).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                MigrationError::ScriptNotFound {
                    path: path.to_string(),
                }
            } else {
                MigrationError::Io(source)
            }
        })
    }
}

/// Owned in-memory bundle, mostly useful in tests.
#[derive(Default)]
pub struct MemoryBundle {
    migrations: Vec<(String, String)>,
    seeds: Vec<(String, String)>,
}

impl MemoryBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_migration(mut self, name: impl Into<String>, body: impl Into<String>) -> Self {
        self.migrations.push((name.into(), body.into()));
        self
    }

    pub fn with_seed(mut self, name: impl Into<String>, body: impl Into<String>) -> Self {
        self.seeds.push((name.into(), body.into()));
        self
    }
}

impl ScriptBundle for MemoryBundle {
    fn list_migrations(&self) -> MigrationResult<Vec<String>> {
        Ok(self
            .migrations
            .iter()
            .map(|(name, _)| format!("{}/{}", MIGRATIONS_PREFIX, name))
            .collect())
    }

    fn list_seeds(&self) -> MigrationResult<Vec<String>> {
        Ok(self
            .seeds
            .iter()
            .map(|(name, _)| format!("{}/{}", SEEDS_PREFIX, name))
            .collect())
    }

    fn read_script(&self, path: &str) -> MigrationResult<String> {
        let entry = if let Some(name) = path.strip_prefix(&format!("{}/", MIGRATIONS_PREFIX)) {
            self.migrations.iter().find(|(n, _)| n == name)
        } else if let Some(name) = path.strip_prefix(&format!("{}/", SEEDS_PREFIX)) {
            self.seeds.iter().find(|(n, _)| n == name)
        } else {
            None
        };

        entry
            .map(|(_, body)| body.clone())
            .ok_or_else(|| MigrationError::ScriptNotFound {
                path: path.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_up_and_down_names() {
        let up = MigrationScript::parse("migrations/3_add_index.up.sql").unwrap();
        assert_eq!(up.version, "3_add_index");
        assert_eq!(up.sequence, 3);
        assert_eq!(up.direction, Direction::Up);

        let down = MigrationScript::parse("migrations/3_add_index.down.sql").unwrap();
        assert_eq!(down.version, "3_add_index");
        assert_eq!(down.direction, Direction::Down);
    }

    #[test]
    fn rejects_names_without_direction_suffix() {
        assert!(MigrationScript::parse("migrations/notes.txt").is_none());
        assert!(MigrationScript::parse("migrations/3_add_index.sql").is_none());
    }

    #[test]
    fn unparsable_prefix_defaults_to_zero() {
        assert_eq!(extract_sequence("init"), 0);
        assert_eq!(extract_sequence("abc_init"), 0);
        assert_eq!(extract_sequence("10_users"), 10);
        assert_eq!(extract_sequence("7"), 7);
    }

    #[test]
    fn orders_by_sequence_regardless_of_listing_order() {
        let bundle = MemoryBundle::new()
            .with_migration("10_ten.up.sql", "SELECT 10")
            .with_migration("2_two.up.sql", "SELECT 2")
            .with_migration("1_one.up.sql", "SELECT 1");

        let scripts = ordered_migrations(&bundle, Direction::Up).unwrap();
        let versions: Vec<&str> = scripts.iter().map(|s| s.version.as_str()).collect();
        assert_eq!(versions, vec!["1_one", "2_two", "10_ten"]);
    }

    #[test]
    fn equal_sequences_keep_listing_order() {
        let bundle = MemoryBundle::new()
            .with_migration("first.up.sql", "")
            .with_migration("second.up.sql", "")
            .with_migration("1_real.up.sql", "");

        let scripts = ordered_migrations(&bundle, Direction::Up).unwrap();
        let versions: Vec<&str> = scripts.iter().map(|s| s.version.as_str()).collect();
        assert_eq!(versions, vec!["first", "second", "1_real"]);
    }

    #[test]
    fn ordered_migrations_filters_by_direction() {
        let bundle = MemoryBundle::new()
            .with_migration("1_init.up.sql", "")
            .with_migration("1_init.down.sql", "")
            .with_migration("2_next.up.sql", "");

        let ups = ordered_migrations(&bundle, Direction::Up).unwrap();
        assert_eq!(ups.len(), 2);
        let downs = ordered_migrations(&bundle, Direction::Down).unwrap();
        assert_eq!(downs.len(), 1);
    }

    #[test]
    fn memory_bundle_reads_by_bundle_path() {
        let bundle = MemoryBundle::new()
            .with_migration("1_init.up.sql", "CREATE TABLE a (id INT);")
            .with_seed("admins.sql", "INSERT INTO a VALUES (1);");

        let body = bundle.read_script("migrations/1_init.up.sql").unwrap();
        assert_eq!(body, "CREATE TABLE a (id INT);");
        let seed = bundle.read_script("seeds/admins.sql").unwrap();
        assert_eq!(seed, "INSERT INTO a VALUES (1);");

        let missing = bundle.read_script("migrations/9_nope.up.sql");
        assert!(matches!(
            missing,
            Err(MigrationError::ScriptNotFound { .. })
        ));
    }

    #[test]
    fn dir_bundle_lists_and_reads_files() {
        let migrations = tempfile::tempdir().unwrap();
        let seeds = tempfile::tempdir().unwrap();
        std::fs::write(migrations.path().join("1_init.up.sql"), "SELECT 1;").unwrap();
        std::fs::write(seeds.path().join("roles.sql"), "SELECT 2;").unwrap();

        let bundle = DirBundle::new(migrations.path(), seeds.path());
        assert_eq!(
            bundle.list_migrations().unwrap(),
            vec!["migrations/1_init.up.sql".to_string()]
        );
        assert_eq!(
            bundle.list_seeds().unwrap(),
            vec!["seeds/roles.sql".to_string()]
        );
        assert_eq!(
            bundle.read_script("migrations/1_init.up.sql").unwrap(),
            "SELECT 1;"
        );
    }

    #[test]
    fn dir_bundle_missing_directory_lists_empty() {
        let bundle = DirBundle::new("/nonexistent/migrations", "/nonexistent/seeds");
        assert!(bundle.list_migrations().unwrap().is_empty());
        assert!(bundle.list_seeds().unwrap().is_empty());
    }

    #[test]
    fn static_bundle_round_trip() {
        static MIGRATIONS: &[(&str, &str)] = &[("1_init.up.sql", "CREATE TABLE s (id INT);")];
        static SEEDS: &[(&str, &str)] = &[("base.sql", "INSERT INTO s VALUES (1);")];

        let bundle = StaticBundle::new(MIGRATIONS, SEEDS);
        assert_eq!(
            bundle.list_migrations().unwrap(),
            vec!["migrations/1_init.up.sql".to_string()]
        );
        assert_eq!(
            bundle.read_script("seeds/base.sql").unwrap(),
            "INSERT INTO s VALUES (1);"
        );
    }
}
