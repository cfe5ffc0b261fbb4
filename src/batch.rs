//! Batch execution.
//!
//! A batch is a JSON array of operation descriptors, a JSON object with an
//! `operations` array, or a TOML document with `[[operations]]` tables:
//!
//! ```toml
//! [[operations]]
//! operation = "replace"
//! file = "src/app.py"
//! pattern = "old_name"
//! content = "new_name"
//! occurrence = 2
//! ```
//!
//! Entries run in order. Each entry is decoded on its own, so a malformed
//! descriptor fails that entry only.

use crate::operation::OperationType;
use crate::surgery::{OperationResult, Surgeon, SurgeryOptions};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("failed to read batch file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON batch: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML batch: {0}")]
    Toml(#[from] toml_edit::de::Error),

    #[error("batch must be an array of operations or contain an 'operations' array")]
    Shape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchFormat {
    Json,
    Toml,
}

impl BatchFormat {
    /// `.toml` files are TOML; everything else is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => BatchFormat::Toml,
            _ => BatchFormat::Json,
        }
    }
}

/// One entry of a batch.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationDescriptor {
    pub operation: String,
    pub file: PathBuf,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(flatten)]
    pub options: SurgeryOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchEntry {
    pub index: usize,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<OperationResult>,
    /// Set when the descriptor itself could not be decoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub succeeded: usize,
    pub failed: usize,
    pub entries: Vec<BatchEntry>,
}

impl BatchReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Split a batch document into raw entries.
pub fn parse_batch(input: &str, format: BatchFormat) -> Result<Vec<Value>, BatchError> {
    let document: Value = match format {
        BatchFormat::Json => serde_json::from_str(input)?,
        BatchFormat::Toml => toml_edit::de::from_str(input)?,
    };
    match document {
        Value::Array(entries) => Ok(entries),
        Value::Object(mut map) => match map.remove("operations") {
            Some(Value::Array(entries)) => Ok(entries),
            _ => Err(BatchError::Shape),
        },
        _ => Err(BatchError::Shape),
    }
}

pub fn load_batch(path: &Path) -> Result<Vec<Value>, BatchError> {
    let input = fs::read_to_string(path).map_err(|source| BatchError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_batch(&input, BatchFormat::from_path(path))
}

/// Run every entry in order.
pub fn run_batch(surgeon: &Surgeon, entries: Vec<Value>) -> BatchReport {
    let mut report = BatchReport::default();

    for (index, raw) in entries.into_iter().enumerate() {
        let entry = match decode_entry(surgeon, raw) {
            Ok((operation, descriptor)) => {
                let result = surgeon.execute(
                    operation,
                    &descriptor.file,
                    descriptor.pattern.as_deref(),
                    &descriptor.content,
                    &descriptor.options,
                );
                BatchEntry {
                    index,
                    success: result.success,
                    result: Some(result),
                    error: None,
                }
            }
            Err(message) => {
                warn!(index, %message, "skipping malformed batch entry");
                BatchEntry {
                    index,
                    success: false,
                    result: None,
                    error: Some(message),
                }
            }
        };

        if entry.success {
            report.succeeded += 1;
        } else {
            report.failed += 1;
        }
        report.entries.push(entry);
    }

    info!(
        succeeded = report.succeeded,
        failed = report.failed,
        "batch finished"
    );
    report
}

fn decode_entry(
    surgeon: &Surgeon,
    mut raw: Value,
) -> Result<(OperationType, OperationDescriptor), String> {
    let Some(map) = raw.as_object_mut() else {
        return Err("entry is not an object".to_string());
    };
    if !map.contains_key("case_sensitive") {
        map.insert(
            "case_sensitive".to_string(),
            Value::Bool(surgeon.config().default_case_sensitive),
        );
    }

    let descriptor: OperationDescriptor =
        serde_json::from_value(raw).map_err(|e| format!("invalid descriptor: {e}"))?;
    let operation = descriptor
        .operation
        .parse::<OperationType>()
        .map_err(|e| format!("invalid descriptor: {e}"))?;
    if operation == OperationType::PreRestore {
        return Err("invalid descriptor: pre-restore is not a batch operation".to_string());
    }
    Ok((operation, descriptor))
}
