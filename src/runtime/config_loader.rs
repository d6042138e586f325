//! Scraper configuration.
//!
//! Values are layered: built-in defaults, then an optional YAML file, then
//! environment variables. The binary applies CLI flags last.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use crate::error::ConfigError;
use crate::sources::wikidata::MAX_BATCH_SIZE;

/// Settings for one scrape run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Wikidata Query Service endpoint
    pub sparql_endpoint: String,

    /// Wikibase action API used for `wbgetentities`
    pub wikidata_api: String,

    /// Class whose instances are scraped (`?item wdt:P31 wd:<class>`)
    pub target_class: String,

    /// SQLite database file
    pub database_url: String,

    /// Table the rows are saved into
    pub table: String,

    /// Ids per `wbgetentities` request
    pub batch_size: usize,

    pub timeout_secs: u64,

    pub user_agent: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            sparql_endpoint: "https://query.wikidata.org/sparql".to_string(),
            wikidata_api: "https://www.wikidata.org/w/api.php".to_string(),
            target_class: "Q28007428".to_string(),
            database_url: "data.sqlite".to_string(),
            table: "data".to_string(),
            batch_size: MAX_BATCH_SIZE,
            timeout_secs: 60,
            user_agent: concat!("wikidata-areas/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ScraperConfig {
    /// Load configuration from a YAML file, filling gaps with defaults.
    ///
    /// # Example
    /// ```ignore
    /// use wikidata_areas::runtime::ScraperConfig;
    ///
    /// let config = ScraperConfig::load_from_file("scraper.yaml")?;
    /// println!("Scraping instances of {}", config.target_class);
    /// ```
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Override fields from process environment variables.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Override fields from any variable lookup.
    pub fn apply_env_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SPARQL_ENDPOINT") {
            self.sparql_endpoint = v;
        }
        if let Some(v) = lookup("WIKIDATA_API") {
            self.wikidata_api = v;
        }
        if let Some(v) = lookup("TARGET_CLASS") {
            self.target_class = v;
        }
        if let Some(v) = lookup("DATABASE_URL") {
            self.database_url = v;
        }
        if let Some(v) = lookup("SCRAPER_TABLE") {
            self.table = v;
        }
        if let Some(v) = lookup("SCRAPER_BATCH_SIZE") {
            self.batch_size = parse_number("batch_size", &v)?;
        }
        if let Some(v) = lookup("SCRAPER_TIMEOUT_SECS") {
            self.timeout_secs = parse_number("timeout_secs", &v)?;
        }
        if let Some(v) = lookup("SCRAPER_USER_AGENT") {
            self.user_agent = v;
        }
        Ok(self)
    }

    /// Reject values the scraper cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        static ITEM_ID: OnceLock<Regex> = OnceLock::new();
        let item_id = ITEM_ID.get_or_init(|| Regex::new(r"^Q[1-9][0-9]*$").expect("static regex"));

        if !item_id.is_match(&self.target_class) {
            return Err(ConfigError::Invalid {
                field: "target_class",
                reason: format!("'{}' is not an item id like Q28007428", self.target_class),
            });
        }
        if !(1..=MAX_BATCH_SIZE).contains(&self.batch_size) {
            return Err(ConfigError::Invalid {
                field: "batch_size",
                reason: format!("{} is outside 1..={}", self.batch_size, MAX_BATCH_SIZE),
            });
        }
        if self.table.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "table",
                reason: "table name is empty".to_string(),
            });
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "timeout_secs",
                reason: "timeout must be at least one second".to_string(),
            });
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn parse_number<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        field,
        reason: format!("'{}': {}", value, e),
    })
}
