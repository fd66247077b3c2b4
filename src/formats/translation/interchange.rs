//! Row-oriented interchange for translators
//!
//! Messages are exported as `index,original,translated` rows (every
//! field quoted, `translated` left blank). Row order is the canonical
//! message order, and must survive the editing round trip: import feeds
//! the rows straight back into `replace`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One exported message row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRow {
    pub index: usize,
    pub original: String,
    pub translated: String,
}

/// Write messages to a CSV file, returning how many rows were written.
pub fn export_messages<P: AsRef<Path>>(messages: &[String], path: P) -> Result<usize> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_path(path)?;
    for (index, message) in messages.iter().enumerate() {
        writer.serialize(MessageRow {
            index,
            original: message.clone(),
            translated: String::new(),
        })?;
    }
    writer.flush()?;
    Ok(messages.len())
}

/// Read replacement messages in row order: the `translated` column when
/// non-empty, otherwise `original`.
pub fn import_messages<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut messages = Vec::new();
    for row in reader.deserialize() {
        let row: MessageRow = row?;
        messages.push(if row.translated.is_empty() {
            row.original
        } else {
            row.translated
        });
    }
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_export_import_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("messages.csv");

        let messages = vec![
            "Hello".to_string(),
            "A line\nwith a break, and a comma".to_string(),
            "Quoted \"text\"".to_string(),
        ];
        assert_eq!(export_messages(&messages, &path).unwrap(), 3);

        let header = std::fs::read_to_string(&path).unwrap();
        assert!(header.starts_with("\"index\",\"original\",\"translated\""));

        // No translations filled in: originals come back in row order
        assert_eq!(import_messages(&path).unwrap(), messages);
    }

    #[test]
    fn test_import_prefers_translated_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("messages.csv");
        std::fs::write(
            &path,
            "index,original,translated\n0,Hello,Bonjour\n1,World,\n",
        )
        .unwrap();

        assert_eq!(import_messages(&path).unwrap(), ["Bonjour", "World"]);
    }
}
