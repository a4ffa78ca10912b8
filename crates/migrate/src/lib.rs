//! # campus-migrate: Schema migration engine for the campus platform
//!
//! Applies ordered, versioned SQL scripts to a Postgres database, tracks
//! the applied version in a ledger table, supports single-step rollback
//! and a destructive fresh reset, and runs unconditional seed scripts.
//!
//! Scripts reach the engine through the read-only [`ScriptBundle`] trait,
//! so the same runner works over compiled-in scripts, real directories,
//! or in-memory fixtures.

pub mod bundle;
pub mod error;
pub mod ledger;
pub mod runner;
pub mod scaffold;
pub mod seeder;
pub mod sql;

// Re-export core traits and types
pub use bundle::*;
pub use error::*;
pub use ledger::*;
pub use runner::*;
pub use scaffold::*;
pub use seeder::*;
