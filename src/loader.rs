//! Example document intake.
//!
//! Reading files from disk belongs to the caller: this module receives file contents
//! that were already read, checks each one against the example document format and
//! indexes the survivors by operation id and title.

use std::sync::OnceLock;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::diagnostics::{DiagnosticCode, Diagnostics};
use crate::error::{ExampleError, ShapeError};

/// One example file as read from the examples directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawExampleFile {
    /// Path relative to the examples directory, `/`-separated.
    pub relative_path: String,
    pub content: String,
}

impl RawExampleFile {
    pub fn new(relative_path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            content: content.into(),
        }
    }
}

/// Parsed example document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExampleDocument {
    pub operation_id: String,
    pub title: String,
    #[serde(default)]
    pub parameters: IndexMap<String, Value>,
    #[serde(default)]
    pub responses: IndexMap<String, ExampleResponseDocument>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExampleResponseDocument {
    pub headers: IndexMap<String, Value>,
    pub body: Option<Value>,
}

/// An indexed document together with the file it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedExample {
    pub file_path: String,
    pub document: ExampleDocument,
    /// The document exactly as written, for emitters that echo it back.
    pub raw: Value,
}

fn document_schema() -> &'static Value {
    static SCHEMA: OnceLock<Value> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        json!({
            "type": "object",
            "required": ["operationId", "title"],
            "properties": {
                "operationId": { "type": "string" },
                "title": { "type": "string" },
                "parameters": { "type": "object" },
                "responses": {
                    "type": "object",
                    "additionalProperties": {
                        "type": "object",
                        "properties": {
                            "headers": { "type": "object" }
                        }
                    }
                }
            }
        })
    })
}

/// Check a JSON value against the example document format.
pub fn check_document_shape(value: &Value) -> Vec<ShapeError> {
    let validator = match jsonschema::validator_for(document_schema()) {
        Ok(v) => v,
        Err(e) => {
            return vec![ShapeError {
                path: String::new(),
                message: e.to_string(),
            }]
        }
    };
    validator
        .iter_errors(value)
        .map(|e| ShapeError {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect()
}

/// Parse one example document.
///
/// # Errors
///
/// Returns `ExampleError::InvalidJson` if the content isn't JSON, or
/// `ExampleError::InvalidShape` if it doesn't follow the example document format.
pub fn parse_example_document(path: &str, content: &str) -> Result<LoadedExample, ExampleError> {
    let raw: Value = serde_json::from_str(content).map_err(|source| ExampleError::InvalidJson {
        path: path.to_string(),
        source,
    })?;
    let errors = check_document_shape(&raw);
    if !errors.is_empty() {
        return Err(ExampleError::InvalidShape {
            path: path.to_string(),
            errors,
        });
    }
    let document =
        ExampleDocument::deserialize(&raw).map_err(|source| ExampleError::InvalidJson {
            path: path.to_string(),
            source,
        })?;
    Ok(LoadedExample {
        file_path: path.to_string(),
        document,
        raw,
    })
}

/// Examples keyed by lower-cased operation id, then by title.
#[derive(Debug, Clone, Default)]
pub struct ExampleIndex {
    entries: IndexMap<String, IndexMap<String, LoadedExample>>,
}

impl ExampleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index example files.
    ///
    /// When `api_version` names a subdirectory that holds files, only that subdirectory
    /// is used. Otherwise the top-level files are. Problems are reported as warnings
    /// and the offending file is skipped.
    pub fn build(
        files: &[RawExampleFile],
        api_version: Option<&str>,
        diagnostics: &mut Diagnostics,
    ) -> Self {
        let mut index = Self::new();
        for file in select_version(files, api_version) {
            let loaded = match parse_example_document(&file.relative_path, &file.content) {
                Ok(loaded) => loaded,
                Err(ExampleError::InvalidShape { path, errors })
                    if missing_identity(&errors) =>
                {
                    diagnostics.report(
                        DiagnosticCode::ExampleLoading,
                        path,
                        "example is missing `operationId` or `title`; skipped",
                    );
                    continue;
                }
                Err(e) => {
                    diagnostics.report(
                        DiagnosticCode::ExampleLoading,
                        file.relative_path.clone(),
                        e.to_string(),
                    );
                    continue;
                }
            };
            index.insert(loaded, diagnostics);
        }
        debug!(
            operations = index.entries.len(),
            examples = index.len(),
            "indexed example documents"
        );
        index
    }

    /// Add one document; a later document with a known title replaces the earlier one.
    pub fn insert(&mut self, loaded: LoadedExample, diagnostics: &mut Diagnostics) {
        let titles = self
            .entries
            .entry(loaded.document.operation_id.to_lowercase())
            .or_default();
        if let Some(previous) = titles.get(&loaded.document.title) {
            diagnostics.report(
                DiagnosticCode::DuplicateExampleFile,
                loaded.file_path.clone(),
                format!(
                    "example `{}` for operation `{}` is also defined in {}",
                    loaded.document.title, loaded.document.operation_id, previous.file_path
                ),
            );
        }
        titles.insert(loaded.document.title.clone(), loaded);
    }

    /// Examples for an operation id, matched case-insensitively.
    pub fn get(&self, operation_id: &str) -> Option<&IndexMap<String, LoadedExample>> {
        self.entries.get(&operation_id.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn missing_identity(errors: &[ShapeError]) -> bool {
    errors.iter().all(|e| e.path.is_empty())
        && errors
            .iter()
            .any(|e| e.message.contains("operationId") || e.message.contains("title"))
}

fn parent_dir(path: &str) -> Option<&str> {
    path.rsplit_once('/').map(|(dir, _)| dir)
}

fn select_version<'f>(
    files: &'f [RawExampleFile],
    api_version: Option<&str>,
) -> Vec<&'f RawExampleFile> {
    if let Some(version) = api_version {
        let versioned: Vec<&RawExampleFile> = files
            .iter()
            .filter(|f| parent_dir(&f.relative_path) == Some(version))
            .collect();
        if !versioned.is_empty() {
            return versioned;
        }
    }
    files
        .iter()
        .filter(|f| parent_dir(&f.relative_path).is_none())
        .collect()
}
