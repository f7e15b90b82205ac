//! Corpus loading
//!
//! Annotated documents and cleaned product records both arrive as JSON
//! lines. Blank lines are skipped; a malformed line fails with its 1-based
//! line number.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use mkg_core::schema::{raw_attribute, APPROVAL_NUMBER_KEY, GENERIC_NAME_KEY};
use mkg_core::{content_hash, Document, MkgError, Result};

/// Recognized attributes of one cleaned product record
pub type RawRecord = BTreeMap<String, String>;

/// Parse JSON-lines text; `path` is only used for error reporting
pub fn parse_json_lines<T: DeserializeOwned>(text: &str, path: &Path) -> Result<Vec<T>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|source| MkgError::Parse {
                path: path.to_path_buf(),
                line: i + 1,
                source,
            })
        })
        .collect()
}

/// Read a JSON-lines file
pub fn read_json_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let text = std::fs::read_to_string(path).map_err(|source| MkgError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_json_lines(&text, path)
}

/// Labeled documents followed by predicted ones
pub fn read_corpus(labeled: &Path, predicted: Option<&Path>) -> Result<Vec<Document>> {
    let mut documents: Vec<Document> = read_json_lines(labeled)?;
    let labeled_count = documents.len();

    if let Some(predicted) = predicted {
        documents.extend(read_json_lines::<Document>(predicted)?);
    }

    debug!(
        labeled = labeled_count,
        predicted = documents.len() - labeled_count,
        "Loaded document corpus"
    );
    Ok(documents)
}

// ============================================================================
// Raw Catalog
// ============================================================================

/// Cleaned product records keyed by drug id (MD5 of the approval number)
#[derive(Debug, Clone, Default)]
pub struct RawCatalog {
    records: HashMap<String, RawRecord>,
}

/// String form of a raw field; strings are taken without quotes
fn field_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl RawCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the generic name and recognized attributes of one record.
    ///
    /// Records without an approval number cannot be joined and are dropped.
    pub fn insert_record(&mut self, record: &serde_json::Map<String, Value>) -> Option<String> {
        let Some(approval) = record.get(APPROVAL_NUMBER_KEY) else {
            warn!("Skipping product record without {}", APPROVAL_NUMBER_KEY);
            return None;
        };
        let drug_id = content_hash(&field_text(approval));

        let kept: RawRecord = record
            .iter()
            .filter(|(key, _)| key.as_str() == GENERIC_NAME_KEY || raw_attribute(key).is_some())
            .map(|(key, value)| (key.clone(), field_text(value)))
            .collect();

        self.records.insert(drug_id.clone(), kept);
        Some(drug_id)
    }

    pub fn from_records(records: &[serde_json::Map<String, Value>]) -> Self {
        let mut catalog = Self::new();
        for record in records {
            catalog.insert_record(record);
        }
        catalog
    }

    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let records: Vec<serde_json::Map<String, Value>> = parse_json_lines(text, path)?;
        Ok(Self::from_records(&records))
    }

    pub fn read(path: &Path) -> Result<Self> {
        let records: Vec<serde_json::Map<String, Value>> = read_json_lines(path)?;
        Ok(Self::from_records(&records))
    }

    pub fn get(&self, drug_id: &str) -> Option<&RawRecord> {
        self.records.get(drug_id)
    }

    /// Generic name of a drug
    pub fn name(&self, drug_id: &str) -> Option<&str> {
        self.get(drug_id)
            .and_then(|record| record.get(GENERIC_NAME_KEY))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use mkg_core::Category;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_lines(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    #[test]
    fn test_read_corpus_concatenates_and_skips_blank_lines() {
        let labeled = write_lines(&[
            r#"{"folder":"ZhuYaoChengFen","file":["d1"],"entity":{"T1":{"type":"药物","value":"阿司匹林"}},"relation":{}}"#,
            "",
        ]);
        let predicted = write_lines(&[
            "   ",
            r#"{"folder":"JinJi","file":["d1","d2"],"entity":{},"relation":{}}"#,
        ]);

        let docs = read_corpus(labeled.path(), Some(predicted.path())).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].category(), Some(Category::Ingredients));
        assert_eq!(docs[1].file, vec!["d1", "d2"]);

        let labeled_only = read_corpus(labeled.path(), None).unwrap();
        assert_eq!(labeled_only.len(), 1);
    }

    #[test]
    fn test_parse_error_carries_line_number() {
        let file = write_lines(&[r#"{"folder":"JinJi"}"#, "", "{not json"]);

        let err = read_json_lines::<Document>(file.path()).unwrap_err();
        match err {
            MkgError::Parse { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = read_corpus(Path::new("/nonexistent/extracted.json"), None).unwrap_err();
        assert!(matches!(err, MkgError::Io { .. }));
    }

    #[test]
    fn test_raw_catalog_keyed_by_approval_hash() {
        let text = concat!(
            r#"{"通用名称":"布洛芬缓释胶囊","批准文号":"国药准字H10900089","生产企业":"某药业","规格":"0.3g","有效期":24}"#,
            "\n",
            r#"{"通用名称":"无批号药品"}"#,
        );
        let catalog = RawCatalog::parse(text, Path::new("cleaned.json")).unwrap();

        assert_eq!(catalog.len(), 1);
        let drug_id = content_hash("国药准字H10900089");
        assert_eq!(catalog.name(&drug_id), Some("布洛芬缓释胶囊"));

        let record = catalog.get(&drug_id).unwrap();
        assert_eq!(record["有效期"], "24");
        assert!(!record.contains_key("规格"));
    }
}
