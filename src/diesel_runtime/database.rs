//! Database connection management
//!
//! Diesel SQLite connections behind an r2d2 pool.

use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use diesel::sqlite::SqliteConnection;
use std::sync::Arc;
use std::time::Duration;

use crate::error::StoreError;

pub type DbConnection = SqliteConnection;
pub type Pool = r2d2::Pool<ConnectionManager<DbConnection>>;
pub type PooledConnection = r2d2::PooledConnection<ConnectionManager<DbConnection>>;

/// Database connection pool manager
#[derive(Clone)]
pub struct Database {
    pool: Arc<Pool>,
}

impl Database {
    /// Open a pool on a SQLite database file (created if absent).
    ///
    /// # Example
    /// ```ignore
    /// let db = Database::new("data.sqlite")?;
    /// ```
    pub fn new(database_url: &str) -> Result<Self, StoreError> {
        Self::new_with_config(database_url, DatabaseConfig::default())
    }

    /// Create a new database with custom configuration
    pub fn new_with_config(database_url: &str, config: DatabaseConfig) -> Result<Self, StoreError> {
        let manager = ConnectionManager::<DbConnection>::new(database_url);

        let pool = r2d2::Pool::builder()
            .max_size(config.max_connections)
            .min_idle(Some(config.min_idle))
            .connection_timeout(Duration::from_secs(config.connection_timeout_secs))
            .build(manager)?;

        Ok(Database {
            pool: Arc::new(pool),
        })
    }

    /// Get a connection from the pool
    pub fn get_connection(&self) -> Result<PooledConnection, StoreError> {
        Ok(self.pool.get()?)
    }

    /// Test database connectivity
    pub fn test_connection(&self) -> Result<(), StoreError> {
        let mut conn = self.get_connection()?;
        diesel::sql_query("SELECT 1").execute(&mut conn)?;
        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

/// Database configuration options
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub min_idle: u32,
    pub connection_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            max_connections: 2,          // one writer plus one for checks
            min_idle: 1,
            connection_timeout_secs: 30,
        }
    }
}
