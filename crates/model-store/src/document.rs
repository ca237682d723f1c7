//! Dataset document format
//!
//! ```json
//! { "absent": [[0.12, 0.40, ...], ...], "normal_posture": [[...], ...] }
//! ```

use posture::{ClassifierDataset, Label};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::StoreError;

/// Label-keyed document of embedding arrays
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DatasetDocument(BTreeMap<String, Vec<Vec<f32>>>);

impl DatasetDocument {
    /// Encode as pretty-printed JSON
    pub fn to_bytes(&self) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec_pretty(&self.0).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Label keys in the document
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Convert a dataset into its portable document
pub fn save(dataset: &ClassifierDataset) -> DatasetDocument {
    let document: BTreeMap<String, Vec<Vec<f32>>> = dataset
        .iter()
        .map(|(label, vectors)| (label.as_str().to_string(), vectors.to_vec()))
        .collect();
    info!(
        "Saved dataset document ({} labels, {} examples)",
        document.len(),
        dataset.total_examples()
    );
    DatasetDocument(document)
}

/// Parse a dataset document.
///
/// Every label must map to a non-empty rectangular array of numbers, and
/// all labels must share the same embedding length.
pub fn load(source: &[u8]) -> Result<ClassifierDataset, StoreError> {
    let value: Value = serde_json::from_slice(source)
        .map_err(|e| StoreError::MalformedDataset(format!("not a JSON document: {}", e)))?;

    let Value::Object(entries) = value else {
        return Err(StoreError::MalformedDataset(
            "expected an object keyed by label".into(),
        ));
    };
    if entries.is_empty() {
        return Err(StoreError::EmptyDataset);
    }

    let mut dataset = ClassifierDataset::new();
    for (key, rows) in &entries {
        let label: Label = key
            .parse()
            .map_err(|_| StoreError::MalformedDataset(format!("unknown label {:?}", key)))?;

        for row in parse_matrix(key, rows)? {
            dataset
                .insert(label, row)
                .map_err(|e| StoreError::MalformedDataset(format!("{}: {}", key, e)))?;
        }
        debug!("Loaded {} examples for {}", dataset.example_count(label), label);
    }

    info!(
        "Loaded dataset document ({} labels, {} examples)",
        dataset.labels().len(),
        dataset.total_examples()
    );
    Ok(dataset)
}

fn parse_matrix(key: &str, value: &Value) -> Result<Vec<Vec<f32>>, StoreError> {
    let malformed = |msg: String| StoreError::MalformedDataset(format!("{}: {}", key, msg));

    let Value::Array(rows) = value else {
        return Err(malformed("expected an array of embeddings".into()));
    };
    if rows.is_empty() {
        return Err(malformed("no examples".into()));
    }

    let mut width = None;
    let mut matrix = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let Value::Array(cells) = row else {
            return Err(malformed(format!("example {} is not an array", i)));
        };
        if cells.is_empty() {
            return Err(malformed(format!("example {} is empty", i)));
        }
        match width {
            Some(w) if w != cells.len() => {
                return Err(malformed(format!(
                    "jagged array: example {} has {} values, expected {}",
                    i,
                    cells.len(),
                    w
                )));
            }
            None => width = Some(cells.len()),
            _ => {}
        }

        let vector = cells
            .iter()
            .map(|c| c.as_f64().map(|v| v as f32))
            .collect::<Option<Vec<f32>>>()
            .ok_or_else(|| malformed(format!("example {} has a non-numeric value", i)))?;
        matrix.push(vector);
    }
    Ok(matrix)
}
