//! Item fetcher backed by the Wikibase `wbgetentities` API.
//!
//! Raw entities carry every claim for a property; [`select_claim`] reduces
//! them to the single value an [`Item`] exposes per property code.

use indexmap::IndexMap;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use crate::entity::{Item, PropertyValue};
use crate::error::SourceError;
use crate::extraction::SKIP;
use crate::sources::ItemFetcher;

/// Largest id batch `wbgetentities` accepts for anonymous clients.
pub const MAX_BATCH_SIZE: usize = 50;

/// Fetches items in batches of at most `batch_size` ids.
pub struct WikidataFetcher {
    client: Client,
    api_url: String,
    batch_size: usize,
}

impl WikidataFetcher {
    pub fn new(client: Client, api_url: impl Into<String>, batch_size: usize) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            batch_size: batch_size.clamp(1, MAX_BATCH_SIZE),
        }
    }

    fn fetch_batch(&self, ids: &[String]) -> Result<Vec<Item>, SourceError> {
        let joined = ids.join("|");
        let response: JsonValue = super::get_json(
            &self.client,
            &self.api_url,
            &[
                ("action", "wbgetentities"),
                ("ids", joined.as_str()),
                ("props", "labels|claims"),
                ("format", "json"),
            ],
            "application/json",
        )?;
        parse_entities(response, ids)
    }
}

impl ItemFetcher for WikidataFetcher {
    fn fetch_items(&self, ids: &[String]) -> Result<Vec<Item>, SourceError> {
        let mut items = Vec::with_capacity(ids.len());
        for (n, batch) in ids.chunks(self.batch_size).enumerate() {
            debug!("Fetching batch {} ({} ids)", n + 1, batch.len());
            items.extend(self.fetch_batch(batch)?);
        }
        info!("Fetched {} items for {} ids", items.len(), ids.len());
        Ok(items)
    }
}

#[derive(Debug, Deserialize)]
struct EntitiesResponse {
    #[serde(default)]
    entities: IndexMap<String, RawEntity>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    info: String,
}

#[derive(Debug, Deserialize)]
struct RawEntity {
    id: Option<String>,
    missing: Option<JsonValue>,
    #[serde(default)]
    labels: IndexMap<String, RawLabel>,
    #[serde(default)]
    claims: IndexMap<String, Vec<RawClaim>>,
}

#[derive(Debug, Deserialize)]
struct RawLabel {
    value: String,
}

/// Statement rank; deprecated claims never supply a value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    Preferred,
    #[default]
    Normal,
    Deprecated,
}

#[derive(Debug, Deserialize)]
struct RawClaim {
    mainsnak: RawSnak,
    #[serde(default)]
    rank: Rank,
}

#[derive(Debug, Deserialize)]
struct RawSnak {
    snaktype: String,
    datavalue: Option<RawDataValue>,
}

#[derive(Debug, Deserialize)]
struct RawDataValue {
    #[serde(rename = "type")]
    kind: String,
    value: JsonValue,
}

/// Decode a `wbgetentities` response into items, ordered as `requested`.
///
/// Missing entities are skipped with a warning. Entities returned under a
/// key that was not requested (redirect targets) are appended at the end.
pub fn parse_entities(response: JsonValue, requested: &[String]) -> Result<Vec<Item>, SourceError> {
    let response: EntitiesResponse = serde_json::from_value(response)?;
    if let Some(error) = response.error {
        return Err(SourceError::Api {
            code: error.code,
            info: error.info,
        });
    }

    let mut entities = response.entities;
    let mut items = Vec::with_capacity(entities.len());

    for id in requested {
        match entities.shift_remove(id) {
            Some(entity) => items.extend(convert_entity(id, entity)?),
            None => warn!("Entity {} was not returned by the API", id),
        }
    }
    for (key, entity) in entities {
        items.extend(convert_entity(&key, entity)?);
    }

    Ok(items)
}

fn convert_entity(key: &str, entity: RawEntity) -> Result<Option<Item>, SourceError> {
    if entity.missing.is_some() {
        warn!("Entity {} is missing", key);
        return Ok(None);
    }

    let mut item = Item::new(entity.id.unwrap_or_else(|| key.to_string()));
    for (code, claims) in entity.claims {
        let Some(claim) = select_claim(&claims) else {
            continue;
        };
        match snak_value(&item.id, &code, &claim.mainsnak) {
            Ok(value) => {
                item.properties.insert(code, value);
            }
            // skipped properties never reach a row, so a bad value is dropped
            Err(e) if SKIP.contains(&code.as_str()) => {
                debug!("Dropping skipped property: {}", e);
            }
            Err(e) => return Err(e),
        }
    }
    item.labels = entity
        .labels
        .into_iter()
        .map(|(language, label)| (language, label.value))
        .collect();

    Ok(Some(item))
}

/// The claim an item exposes for a property: the first preferred claim if
/// any, else the first normal one. Deprecated claims are ignored.
fn select_claim(claims: &[RawClaim]) -> Option<&RawClaim> {
    claims
        .iter()
        .find(|c| c.rank == Rank::Preferred)
        .or_else(|| claims.iter().find(|c| c.rank == Rank::Normal))
}

fn snak_value(item: &str, code: &str, snak: &RawSnak) -> Result<PropertyValue, SourceError> {
    match snak.snaktype.as_str() {
        "novalue" => return Ok(PropertyValue::NoValue),
        "somevalue" => return Ok(PropertyValue::SomeValue),
        _ => {}
    }

    let datavalue = snak.datavalue.as_ref().ok_or_else(|| {
        SourceError::Malformed(format!("{} {} has a value snak without datavalue", item, code))
    })?;
    let value = &datavalue.value;
    let malformed = |what: &str| {
        SourceError::Malformed(format!("{} {}: {} value without {}", item, code, datavalue.kind, what))
    };

    let converted = match datavalue.kind.as_str() {
        "wikibase-entityid" => PropertyValue::Entity {
            id: str_field(value, "id").ok_or_else(|| malformed("id"))?,
        },
        "string" => PropertyValue::String {
            value: value.as_str().map(|s| s.to_string()).ok_or_else(|| malformed("string"))?,
        },
        "monolingualtext" => PropertyValue::MonolingualText {
            text: str_field(value, "text").ok_or_else(|| malformed("text"))?,
            language: str_field(value, "language").unwrap_or_default(),
        },
        "time" => PropertyValue::Time {
            time: str_field(value, "time").ok_or_else(|| malformed("time"))?,
            precision: value
                .get("precision")
                .and_then(|p| p.as_u64())
                .and_then(|p| u8::try_from(p).ok())
                .ok_or_else(|| malformed("precision"))?,
        },
        "quantity" => PropertyValue::Quantity {
            amount: str_field(value, "amount").ok_or_else(|| malformed("amount"))?,
        },
        "globecoordinate" => PropertyValue::Coordinate {
            latitude: value.get("latitude").and_then(|v| v.as_f64()).ok_or_else(|| malformed("latitude"))?,
            longitude: value.get("longitude").and_then(|v| v.as_f64()).ok_or_else(|| malformed("longitude"))?,
        },
        other => {
            debug!("{} {}: storing {} value as JSON text", item, code, other);
            PropertyValue::String {
                value: value.to_string(),
            }
        }
    };

    Ok(converted)
}

fn str_field(value: &JsonValue, key: &str) -> Option<String> {
    value.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}
