//! # wikidata-areas: Wikidata area items as a flat SQLite table
//!
//! Selects every item that is an instance of one class through the Wikidata
//! Query Service, fetches those items from the entity API, shapes each one
//! into a flat row and upserts the rows into a local SQLite table keyed by
//! `id`.
//!
//! ## Row shape
//!
//! | source | row field |
//! |---|---|
//! | item id | `id` |
//! | `P31` | `type` |
//! | `P571` | `start_date` |
//! | `P576` | `end_date` |
//! | label in `pt-br` | `name__pt_br` |
//!
//! `P17`, `P18`, `P242`, `P910` and `P625` are dropped silently. Any other
//! property is dropped with a warning.
//!
//! ## Example
//!
//! ```ignore
//! use wikidata_areas::{AreaCollector, Database, ScraperConfig, SqliteRowStore};
//! use wikidata_areas::sources::{build_client, SparqlIdSource, WikidataFetcher};
//!
//! let config = ScraperConfig::default();
//! let client = build_client(&config.user_agent, config.timeout())?;
//! let collector = AreaCollector::new(
//!     SparqlIdSource::new(client.clone(), &config.sparql_endpoint, &config.target_class),
//!     WikidataFetcher::new(client, &config.wikidata_api, config.batch_size),
//! );
//! let mut store = SqliteRowStore::new(Database::new(&config.database_url)?, &config.table);
//! collector.run(&mut store)?;
//! ```

// Core modules
pub mod entity;
pub mod error;
pub mod extraction;
pub mod serialization;

// Id source and item fetcher
pub mod sources;

// Orchestration and configuration
pub mod runtime;

// Diesel ORM runtime infrastructure
pub mod diesel_runtime;

// Re-export key types
pub use entity::{Item, PropertyValue};
pub use error::{ConfigError, RowError, ScrapeError, SourceError, StoreError};
pub use extraction::{AreaRowBuilder, Row};
pub use serialization::{export_rows, ExportFormat};

pub use runtime::{AreaCollector, RowStore, RunSummary, ScraperConfig};
pub use sources::{IdSource, ItemFetcher};

pub use diesel_runtime::{Database, DatabaseConfig, SqliteRowStore};
