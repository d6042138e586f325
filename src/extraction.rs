//! Row shaping: turns one [`Item`] into one flat [`Row`].
//!
//! Properties fall into three groups. Want-listed codes are renamed into
//! row fields, skip-listed codes are dropped silently, and anything else is
//! reported with a warning and dropped. Labels become `name__<lang>` fields.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::entity::Item;
use crate::error::RowError;

/// Properties that are expected on area items but not stored.
pub const SKIP: &[&str] = &["P17", "P18", "P242", "P910", "P625"];

/// Properties that are stored, with their output field names, in field order.
pub const WANT: &[(&str, &str)] = &[
    ("P31", "type"),
    ("P571", "start_date"),
    ("P576", "end_date"),
];

/// Unique key of every row.
pub const ID_FIELD: &str = "id";

const NAME_PREFIX: &str = "name__";

/// A flat, string-keyed record ready for tabular storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    fields: IndexMap<String, String>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(|s| s.as_str())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn id(&self) -> Option<&str> {
        self.get(ID_FIELD)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    /// Merge `other` into this row; keys in `other` win.
    pub fn merge(mut self, other: IndexMap<String, String>) -> Self {
        self.fields.extend(other);
        self
    }
}

impl FromIterator<(String, String)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Column name for a label language: `pt-br` becomes `name__pt_br`.
pub fn name_field(language: &str) -> String {
    format!("{}{}", NAME_PREFIX, language.replace('-', "_"))
}

/// Builds rows for area items from the fixed skip and want tables.
#[derive(Debug, Clone, Copy)]
pub struct AreaRowBuilder {
    skip: &'static [&'static str],
    want: &'static [(&'static str, &'static str)],
}

impl Default for AreaRowBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AreaRowBuilder {
    pub const fn new() -> Self {
        Self { skip: SKIP, want: WANT }
    }

    fn is_wanted(&self, code: &str) -> bool {
        self.want.iter().any(|(p, _)| *p == code)
    }

    fn is_skipped(&self, code: &str) -> bool {
        self.skip.contains(&code)
    }

    /// Property codes on `item` that are neither skipped nor wanted, in item order.
    pub fn unknown_properties<'a>(&self, item: &'a Item) -> Vec<&'a str> {
        item.properties
            .keys()
            .map(|code| code.as_str())
            .filter(|code| !self.is_skipped(code) && !self.is_wanted(code))
            .collect()
    }

    /// Shape one item into a row.
    ///
    /// Warns once per unknown property. Fails when a wanted property has no
    /// concrete value, or when any reported value is malformed.
    pub fn build(&self, item: &Item) -> Result<Row, RowError> {
        for code in self.unknown_properties(item) {
            if let Some(value) = item.property(code) {
                let rendered = item.describe_property(code, value)?;
                warn!(item = %item.id, property = code, "Unknown property for {}: {} = {}", item.id, code, rendered);
            }
        }

        let base = Row::from_iter([(ID_FIELD.to_string(), item.id.clone())]);
        Ok(base
            .merge(self.wanted_fields(item)?)
            .merge(self.name_fields(item)))
    }

    fn wanted_fields(&self, item: &Item) -> Result<IndexMap<String, String>, RowError> {
        let mut fields = IndexMap::new();
        for (code, field) in self.want {
            if let Some(value) = item.property(code) {
                fields.insert(field.to_string(), item.render_property(code, value)?);
            }
        }
        Ok(fields)
    }

    fn name_fields(&self, item: &Item) -> IndexMap<String, String> {
        item.labels
            .iter()
            .map(|(language, text)| (name_field(language), text.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::PropertyValue;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Log output shared between the test and the fmt subscriber.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn warnings(&self) -> Vec<String> {
            let bytes = self.0.lock().unwrap().clone();
            String::from_utf8(bytes)
                .unwrap()
                .lines()
                .filter(|line| line.contains("WARN"))
                .map(|line| line.to_string())
                .collect()
        }
    }

    /// Run `f` with a subscriber writing plain-text logs into the returned buffer.
    fn with_captured_logs<T>(f: impl FnOnce() -> T) -> (T, CapturedLogs) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let result = tracing::subscriber::with_default(subscriber, f);
        (result, logs)
    }

    fn entity(id: &str) -> PropertyValue {
        PropertyValue::Entity { id: id.to_string() }
    }

    #[test]
    fn test_skip_list_only_item() {
        let item = Item::new("Q1")
            .with_property("P17", entity("Q664"))
            .with_property("P18", PropertyValue::String { value: "map.png".to_string() })
            .with_property("P242", PropertyValue::String { value: "locator.svg".to_string() })
            .with_property("P910", entity("Q9"))
            .with_property("P625", PropertyValue::Coordinate { latitude: 1.0, longitude: 2.0 });

        let builder = AreaRowBuilder::new();
        assert!(builder.unknown_properties(&item).is_empty());

        let row = builder.build(&item).unwrap();
        assert_eq!(row.len(), 1);
        assert_eq!(row.id(), Some("Q1"));
        for (_, field) in WANT {
            assert!(!row.contains(field));
        }
    }

    #[test]
    fn test_want_list_renaming() {
        let item = Item::new("Q1").with_property("P31", entity("Q123"));

        let row = AreaRowBuilder::new().build(&item).unwrap();

        assert_eq!(row.get("type"), Some("Q123"));
        assert!(!row.contains("P31"));
    }

    #[test]
    fn test_unknown_property_detected_and_dropped() {
        let item = Item::new("Q7")
            .with_property("P31", entity("Q123"))
            .with_property("P999", PropertyValue::String { value: "x".to_string() });

        let builder = AreaRowBuilder::new();
        assert_eq!(builder.unknown_properties(&item), vec!["P999"]);

        let row = builder.build(&item).unwrap();
        assert!(!row.contains("P999"));
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn test_label_flattening() {
        let item = Item::new("Q1")
            .with_label("en", "Name")
            .with_label("pt-br", "Nome");

        let row = AreaRowBuilder::new().build(&item).unwrap();

        assert_eq!(row.get("name__en"), Some("Name"));
        assert_eq!(row.get("name__pt_br"), Some("Nome"));
        assert!(!row.contains("name__pt-br"));
    }

    #[test]
    fn test_missing_wanted_property_is_omitted() {
        let item = Item::new("Q1").with_property(
            "P571",
            PropertyValue::Time {
                time: "+2016-01-01T00:00:00Z".to_string(),
                precision: 11,
            },
        );

        let row = AreaRowBuilder::new().build(&item).unwrap();

        assert_eq!(row.get("start_date"), Some("2016-01-01"));
        assert!(!row.contains("end_date"));
        assert!(!row.contains("type"));
    }

    #[test]
    fn test_field_order() {
        let item = Item::new("Q1")
            .with_label("fr", "Nom")
            .with_property("P576", entity("Q2"))
            .with_property("P31", entity("Q3"));

        let row = AreaRowBuilder::new().build(&item).unwrap();
        let names: Vec<&str> = row.field_names().collect();

        assert_eq!(names, vec!["id", "type", "end_date", "name__fr"]);
    }

    #[test]
    fn test_build_is_repeatable() {
        let item = Item::new("Q1")
            .with_property("P31", entity("Q123"))
            .with_property("P999", entity("Q5"))
            .with_label("en", "Name");

        let builder = AreaRowBuilder::new();
        assert_eq!(builder.build(&item).unwrap(), builder.build(&item).unwrap());
    }

    #[test]
    fn test_unrenderable_wanted_property_fails() {
        let item = Item::new("Q1").with_property("P576", PropertyValue::SomeValue);

        let err = AreaRowBuilder::new().build(&item).unwrap_err();
        assert!(matches!(err, RowError::Unrenderable { ref property, .. } if property == "P576"));
    }

    #[test]
    fn test_unknown_property_warns_once_with_item_and_code() {
        let item = Item::new("Q7")
            .with_property("P31", entity("Q123"))
            .with_property("P17", entity("Q664"))
            .with_property("P999", PropertyValue::String { value: "x".to_string() });

        let (row, logs) = with_captured_logs(|| AreaRowBuilder::new().build(&item));

        assert!(row.is_ok());
        let warnings = logs.warnings();
        assert_eq!(warnings.len(), 1, "warnings: {:?}", warnings);
        assert!(warnings[0].contains("Q7"));
        assert!(warnings[0].contains("P999"));
        assert!(warnings[0].contains("= x"));
    }

    #[test]
    fn test_known_properties_do_not_warn() {
        let item = Item::new("Q7")
            .with_property("P31", entity("Q123"))
            .with_property("P17", entity("Q664"))
            .with_property("P625", PropertyValue::Coordinate { latitude: 1.0, longitude: 2.0 });

        let (_, logs) = with_captured_logs(|| AreaRowBuilder::new().build(&item));

        assert!(logs.warnings().is_empty());
    }

    #[test]
    fn test_unknown_property_without_value_is_only_reported() {
        let item = Item::new("Q1")
            .with_property("P1366", PropertyValue::SomeValue)
            .with_property("P999", PropertyValue::NoValue);

        let (row, logs) = with_captured_logs(|| AreaRowBuilder::new().build(&item));

        assert_eq!(row.unwrap().len(), 1);
        let warnings = logs.warnings();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("P1366 = <somevalue>"));
        assert!(warnings[1].contains("P999 = <novalue>"));
    }

    #[test]
    fn test_malformed_unknown_property_fails() {
        let item = Item::new("Q1").with_property(
            "P999",
            PropertyValue::Time {
                time: "sometime".to_string(),
                precision: 11,
            },
        );

        let err = AreaRowBuilder::new().build(&item).unwrap_err();
        assert!(matches!(err, RowError::Unrenderable { ref property, .. } if property == "P999"));
    }

    #[test]
    fn test_skipped_property_is_never_rendered() {
        let item = Item::new("Q1").with_property("P625", PropertyValue::SomeValue);

        let row = AreaRowBuilder::new().build(&item).unwrap();
        assert_eq!(row.len(), 1);
    }
}
