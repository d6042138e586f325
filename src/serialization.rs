//! Row export as JSON text.
//!
//! Used by the `dump` command to inspect rows without touching the database.

use serde::Serialize;
use std::io::Write;
use thiserror::Error;

use crate::extraction::Row;

/// Error type for serialization operations
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Output layout for exported rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// One JSON object per line
    #[default]
    Ndjson,
    /// A single JSON array
    JsonArray,
}

/// NDJSON (Newline Delimited JSON) writer
pub struct NdjsonWriter<W: Write> {
    writer: W,
}

impl<W: Write> NdjsonWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write a single record as an NDJSON line
    pub fn write<T: Serialize>(&mut self, record: &T) -> Result<(), SerializationError> {
        let json = serde_json::to_string(record)?;
        writeln!(self.writer, "{}", json)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), SerializationError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// JSON array writer
pub struct JsonArrayWriter<W: Write> {
    writer: W,
    first: bool,
}

impl<W: Write> JsonArrayWriter<W> {
    /// Create a new JSON array writer and write the opening bracket
    pub fn new(mut writer: W) -> Result<Self, SerializationError> {
        write!(writer, "[")?;
        Ok(Self {
            writer,
            first: true,
        })
    }

    pub fn write<T: Serialize>(&mut self, record: &T) -> Result<(), SerializationError> {
        if !self.first {
            write!(self.writer, ",")?;
        }
        self.first = false;

        let json = serde_json::to_string(record)?;
        write!(self.writer, "{}", json)?;
        Ok(())
    }

    /// Finish writing the array and close the bracket
    pub fn finish(mut self) -> Result<(), SerializationError> {
        writeln!(self.writer, "]")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Write `rows` to `writer` in the given format.
pub fn export_rows<W: Write>(writer: W, rows: &[Row], format: ExportFormat) -> Result<(), SerializationError> {
    match format {
        ExportFormat::Ndjson => {
            let mut out = NdjsonWriter::new(writer);
            for row in rows {
                out.write(row)?;
            }
            out.flush()
        }
        ExportFormat::JsonArray => {
            let mut out = JsonArrayWriter::new(writer)?;
            for row in rows {
                out.write(row)?;
            }
            out.finish()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<Row> {
        vec![
            [("id", "Q1"), ("name__en", "Alpha")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            [("id", "Q2"), ("type", "Q5")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ]
    }

    #[test]
    fn test_export_ndjson() {
        let mut buf = Vec::new();
        export_rows(&mut buf, &rows(), ExportFormat::Ndjson).unwrap();

        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"{"id":"Q1","name__en":"Alpha"}"#);
        assert_eq!(lines[1], r#"{"id":"Q2","type":"Q5"}"#);
    }

    #[test]
    fn test_export_json_array() {
        let mut buf = Vec::new();
        export_rows(&mut buf, &rows(), ExportFormat::JsonArray).unwrap();

        let output = String::from_utf8(buf).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(parsed.as_array().map(|a| a.len()), Some(2));
        assert_eq!(parsed[1]["type"], "Q5");
    }

    #[test]
    fn test_export_empty_array() {
        let mut buf = Vec::new();
        export_rows(&mut buf, &[], ExportFormat::JsonArray).unwrap();

        assert_eq!(String::from_utf8(buf).unwrap(), "[]\n");
    }
}
