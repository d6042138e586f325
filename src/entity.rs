//! Linked-data items as consumed by the row builder.
//!
//! An [`Item`] is the already-resolved view of a Wikidata entity: one chosen
//! value per property code plus its labels. Claim selection happens in the
//! fetcher; everything here is read-only data.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::RowError;

/// The chosen value of one property on an item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PropertyValue {
    /// Reference to another entity, e.g. `Q515`
    Entity { id: String },
    String { value: String },
    MonolingualText { text: String, language: String },
    /// Wikibase timestamp (`+2016-01-01T00:00:00Z`) with its precision code
    Time { time: String, precision: u8 },
    Quantity { amount: String },
    Coordinate { latitude: f64, longitude: f64 },
    /// Snak explicitly stating there is no value
    NoValue,
    /// Snak stating an unknown value
    SomeValue,
}

/// Wikibase precision codes.
const PRECISION_MONTH: u8 = 10;
const PRECISION_DAY: u8 = 11;

impl PropertyValue {
    /// Render the value as the string stored in a row field.
    ///
    /// Only `NoValue` and `SomeValue` (and timestamps that are not in
    /// Wikibase format) fail; the caller attaches item and property context.
    pub fn render(&self) -> Result<String, String> {
        match self {
            PropertyValue::Entity { id } => Ok(id.clone()),
            PropertyValue::String { value } => Ok(value.clone()),
            PropertyValue::MonolingualText { text, .. } => Ok(text.clone()),
            PropertyValue::Time { time, precision } => render_time(time, *precision),
            PropertyValue::Quantity { amount } => {
                Ok(amount.strip_prefix('+').unwrap_or(amount).to_string())
            }
            PropertyValue::Coordinate { latitude, longitude } => {
                Ok(format!("{},{}", latitude, longitude))
            }
            PropertyValue::NoValue => Err("property has no value".to_string()),
            PropertyValue::SomeValue => Err("property value is unknown".to_string()),
        }
    }

    /// Like [`render`](Self::render), but `NoValue` and `SomeValue` become
    /// `<novalue>` and `<somevalue>`. Used where the value is only reported.
    pub fn describe(&self) -> Result<String, String> {
        match self {
            PropertyValue::NoValue => Ok("<novalue>".to_string()),
            PropertyValue::SomeValue => Ok("<somevalue>".to_string()),
            other => other.render(),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.describe() {
            Ok(s) => write!(f, "{}", s),
            Err(_) => write!(f, "{:?}", self),
        }
    }
}

/// Truncate a Wikibase timestamp to its precision.
///
/// `+2016-03-04T00:00:00Z` renders as `2016`, `2016-03` or `2016-03-04` for
/// year, month and day precision. BCE dates keep their leading `-`.
fn render_time(time: &str, precision: u8) -> Result<String, String> {
    let (sign, rest) = match time.as_bytes().first() {
        Some(b'+') => ("", &time[1..]),
        Some(b'-') => ("-", &time[1..]),
        _ => ("", time),
    };

    let date = rest.split('T').next().unwrap_or_default();
    let parts: Vec<&str> = date.split('-').collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit())) {
        return Err(format!("malformed timestamp '{}'", time));
    }

    let rendered = if precision >= PRECISION_DAY {
        format!("{}-{}-{}", parts[0], parts[1], parts[2])
    } else if precision == PRECISION_MONTH {
        format!("{}-{}", parts[0], parts[1])
    } else {
        parts[0].to_string()
    };

    Ok(format!("{}{}", sign, rendered))
}

/// A linked-data entity: id, one value per property code, and labels.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub id: String,

    /// property code (`P31`) -> chosen value; a code appears at most once
    #[serde(default)]
    pub properties: IndexMap<String, PropertyValue>,

    /// language code (`pt-br`) -> label text
    #[serde(default)]
    pub labels: IndexMap<String, String>,
}

impl Item {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_property(mut self, code: impl Into<String>, value: PropertyValue) -> Self {
        self.properties.insert(code.into(), value);
        self
    }

    pub fn with_label(mut self, language: impl Into<String>, text: impl Into<String>) -> Self {
        self.labels.insert(language.into(), text.into());
        self
    }

    pub fn property(&self, code: &str) -> Option<&PropertyValue> {
        self.properties.get(code)
    }

    /// Render a property, attaching item and property context to failures.
    pub fn render_property(&self, code: &str, value: &PropertyValue) -> Result<String, RowError> {
        value.render().map_err(|reason| self.unrenderable(code, reason))
    }

    /// Describe a property for diagnostics; only malformed values fail.
    pub fn describe_property(&self, code: &str, value: &PropertyValue) -> Result<String, RowError> {
        value.describe().map_err(|reason| self.unrenderable(code, reason))
    }

    fn unrenderable(&self, code: &str, reason: String) -> RowError {
        RowError::Unrenderable {
            item: self.id.clone(),
            property: code.to_string(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(t: &str, precision: u8) -> PropertyValue {
        PropertyValue::Time {
            time: t.to_string(),
            precision,
        }
    }

    #[test]
    fn test_render_time_precisions() {
        assert_eq!(time("+2016-03-04T00:00:00Z", 11).render().unwrap(), "2016-03-04");
        assert_eq!(time("+2016-03-00T00:00:00Z", 10).render().unwrap(), "2016-03");
        assert_eq!(time("+2016-00-00T00:00:00Z", 9).render().unwrap(), "2016");
        assert_eq!(time("+1900-00-00T00:00:00Z", 7).render().unwrap(), "1900");
    }

    #[test]
    fn test_render_time_bce() {
        assert_eq!(time("-0500-00-00T00:00:00Z", 9).render().unwrap(), "-0500");
    }

    #[test]
    fn test_render_time_malformed() {
        assert!(time("yesterday", 11).render().is_err());
    }

    #[test]
    fn test_render_scalars() {
        let entity = PropertyValue::Entity { id: "Q123".to_string() };
        assert_eq!(entity.render().unwrap(), "Q123");

        let quantity = PropertyValue::Quantity { amount: "+42".to_string() };
        assert_eq!(quantity.render().unwrap(), "42");

        let coord = PropertyValue::Coordinate { latitude: -41.5, longitude: 174.25 };
        assert_eq!(coord.render().unwrap(), "-41.5,174.25");

        let text = PropertyValue::MonolingualText {
            text: "Aotearoa".to_string(),
            language: "mi".to_string(),
        };
        assert_eq!(text.render().unwrap(), "Aotearoa");
    }

    #[test]
    fn test_render_property_attaches_context() {
        let item = Item::new("Q1").with_property("P576", PropertyValue::NoValue);
        let value = item.property("P576").unwrap();

        let err = item.render_property("P576", value).unwrap_err();
        assert_eq!(
            err,
            RowError::Unrenderable {
                item: "Q1".to_string(),
                property: "P576".to_string(),
                reason: "property has no value".to_string(),
            }
        );
    }

    #[test]
    fn test_describe_reports_missing_values() {
        assert_eq!(PropertyValue::NoValue.describe().unwrap(), "<novalue>");
        assert_eq!(PropertyValue::SomeValue.describe().unwrap(), "<somevalue>");
        assert!(PropertyValue::NoValue.render().is_err());
        assert!(time("not a date", 11).describe().is_err());
    }

    #[test]
    fn test_display_falls_back_for_missing_values() {
        assert_eq!(PropertyValue::SomeValue.to_string(), "<somevalue>");
        assert_eq!(PropertyValue::Entity { id: "Q5".to_string() }.to_string(), "Q5");
    }
}
