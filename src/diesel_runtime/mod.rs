//! Diesel ORM runtime infrastructure
//!
//! Connection pooling for the local SQLite database and the row store that
//! upserts scraped rows into it.

pub mod database;
pub mod operations;

// Re-export key types
pub use database::{Database, DatabaseConfig, Pool, PooledConnection};
pub use operations::SqliteRowStore;
