//! Trace Storage Layer
//!
//! SQLite-backed store for crash reporter metadata ("user info").
//! Entries are written last-write-wins and survive a process crash so the
//! crash reporter can attach them to the next report.

mod database;
mod error;
mod migrations;

pub use database::CrashStore;
pub use error::StorageError;

pub type Result<T> = std::result::Result<T, StorageError>;
