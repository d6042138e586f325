//! Id source backed by the Wikidata Query Service.

use indexmap::{IndexMap, IndexSet};
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::SourceError;
use crate::sources::IdSource;

const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

/// Selects every item that is an instance of one fixed class.
pub struct SparqlIdSource {
    client: Client,
    endpoint: String,
    target_class: String,
}

#[derive(Debug, Deserialize)]
struct SparqlResponse {
    results: SparqlResults,
}

#[derive(Debug, Deserialize)]
struct SparqlResults {
    #[serde(default)]
    bindings: Vec<IndexMap<String, SparqlBinding>>,
}

#[derive(Debug, Deserialize)]
struct SparqlBinding {
    value: String,
}

impl SparqlIdSource {
    pub fn new(client: Client, endpoint: impl Into<String>, target_class: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            target_class: target_class.into(),
        }
    }

    /// The SPARQL text sent to the endpoint.
    pub fn query(&self) -> String {
        build_query(&self.target_class)
    }
}

impl IdSource for SparqlIdSource {
    fn fetch_ids(&self) -> Result<Vec<String>, SourceError> {
        let query = self.query();
        debug!("Running SPARQL query against {}:\n{}", self.endpoint, query);

        let response: serde_json::Value = super::get_json(
            &self.client,
            &self.endpoint,
            &[("query", query.as_str()), ("format", "json")],
            SPARQL_RESULTS_JSON,
        )?;

        let ids = parse_ids(response)?;
        info!("SPARQL query for instances of {} returned {} ids", self.target_class, ids.len());
        Ok(ids)
    }
}

/// `SELECT DISTINCT ?item` for instances of `target_class`.
pub fn build_query(target_class: &str) -> String {
    format!(
        "SELECT DISTINCT ?item\nWHERE\n{{\n  ?item wdt:P31 wd:{} .\n}}\n",
        target_class
    )
}

/// Extract entity ids from a SPARQL JSON result, keeping first-seen order.
pub fn parse_ids(response: serde_json::Value) -> Result<Vec<String>, SourceError> {
    let response: SparqlResponse = serde_json::from_value(response)?;

    let mut ids = IndexSet::new();
    for binding in response.results.bindings {
        let item = binding
            .get("item")
            .ok_or_else(|| SourceError::Malformed("SPARQL binding without ?item".to_string()))?;
        ids.insert(entity_id_from_uri(&item.value)?);
    }

    Ok(ids.into_iter().collect())
}

/// `http://www.wikidata.org/entity/Q42` -> `Q42`
fn entity_id_from_uri(uri: &str) -> Result<String, SourceError> {
    uri.rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .map(|id| id.to_string())
        .ok_or_else(|| SourceError::Malformed(format!("not an entity URI: '{}'", uri)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn binding(uri: &str) -> serde_json::Value {
        json!({ "item": { "type": "uri", "value": uri } })
    }

    #[test]
    fn test_build_query() {
        let query = build_query("Q28007428");

        assert!(query.contains("SELECT DISTINCT ?item"));
        assert!(query.contains("?item wdt:P31 wd:Q28007428 ."));
        assert!(!query.contains('%'));
    }

    #[test]
    fn test_parse_ids_strips_uri_and_dedupes() {
        let response = json!({
            "head": { "vars": ["item"] },
            "results": {
                "bindings": [
                    binding("http://www.wikidata.org/entity/Q2"),
                    binding("http://www.wikidata.org/entity/Q1"),
                    binding("http://www.wikidata.org/entity/Q2"),
                ]
            }
        });

        let ids = parse_ids(response).unwrap();
        assert_eq!(ids, vec!["Q2", "Q1"]);
    }

    #[test]
    fn test_parse_ids_empty() {
        let response = json!({ "head": { "vars": ["item"] }, "results": { "bindings": [] } });

        assert!(parse_ids(response).unwrap().is_empty());
    }

    #[test]
    fn test_parse_ids_missing_item_binding() {
        let response = json!({ "results": { "bindings": [ { "other": { "value": "x" } } ] } });

        assert!(matches!(parse_ids(response), Err(SourceError::Malformed(_))));
    }

    #[test]
    fn test_entity_id_from_uri_rejects_trailing_slash() {
        assert!(entity_id_from_uri("http://www.wikidata.org/entity/").is_err());
        assert_eq!(entity_id_from_uri("Q5").unwrap(), "Q5");
    }
}
