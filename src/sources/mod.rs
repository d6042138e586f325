//! Collaborators that supply ids and items to the collector.
//!
//! The collector only sees the [`IdSource`] and [`ItemFetcher`] traits; the
//! Wikidata implementations live in [`sparql`] and [`wikidata`].

pub mod sparql;
pub mod wikidata;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::entity::Item;
use crate::error::SourceError;

pub use sparql::SparqlIdSource;
pub use wikidata::WikidataFetcher;

/// Selects the entities to scrape.
pub trait IdSource {
    /// Distinct entity ids, in query order.
    fn fetch_ids(&self) -> Result<Vec<String>, SourceError>;
}

/// Resolves ids into items.
pub trait ItemFetcher {
    /// One item per id that exists in the store.
    fn fetch_items(&self, ids: &[String]) -> Result<Vec<Item>, SourceError>;
}

/// Build the blocking HTTP client shared by both Wikidata collaborators.
pub fn build_client(user_agent: &str, timeout: Duration) -> Result<Client, SourceError> {
    let mut headers = HeaderMap::new();
    let agent = HeaderValue::from_str(user_agent)
        .map_err(|e| SourceError::Malformed(format!("invalid user agent '{}': {}", user_agent, e)))?;
    headers.insert(USER_AGENT, agent);

    let client = Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()?;
    Ok(client)
}

/// GET `url` with query parameters and decode a JSON body.
///
/// Non-success statuses become [`SourceError::Status`] carrying the body text.
pub(crate) fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    params: &[(&str, &str)],
    accept: &'static str,
) -> Result<T, SourceError> {
    let response = client
        .get(url)
        .query(params)
        .header(ACCEPT, accept)
        .send()?;

    let status = response.status();
    let body = response.text()?;
    if !status.is_success() {
        return Err(SourceError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    Ok(serde_json::from_str(&body)?)
}
