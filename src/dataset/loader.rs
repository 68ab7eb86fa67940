//! @ai:module:intent JSONL dataset loader for golden and trap items
//! @ai:module:layer infrastructure
//! @ai:module:public_api DatasetLoader, DatasetLoaderTrait, DatasetError
//! @ai:module:stateless true

use crate::config::FilterConfig;
use crate::dataset::item::ItemSchema;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// @ai:intent Fatal problems that invalidate a whole dataset
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Failed to read dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid {kind} record at {path}:{line}: {reason}\n  content: {content}")]
    InvalidRecord {
        kind: &'static str,
        path: PathBuf,
        line: usize,
        content: String,
        reason: String,
    },

    #[error("Duplicate {kind} id `{id}` at {path}:{line} (first seen on line {first_line})")]
    DuplicateId {
        kind: &'static str,
        path: PathBuf,
        id: String,
        line: usize,
        first_line: usize,
    },
}

/// @ai:intent Trait for loading item datasets
pub trait DatasetLoaderTrait: Send + Sync {
    /// @ai:intent Load every record from a dataset file
    fn load<T: ItemSchema>(&self, path: &Path) -> Result<Vec<T>, DatasetError>;

    /// @ai:intent Load a dataset and keep records matching the filter
    fn load_filtered<T: ItemSchema>(
        &self,
        path: &Path,
        filter: &FilterConfig,
    ) -> Result<Vec<T>, DatasetError>;
}

/// @ai:intent Loads line-delimited JSON datasets, all-or-nothing
/// @ai:effects pure (stateless)
pub struct DatasetLoader;

impl DatasetLoader {
    /// @ai:intent Create a new dataset loader
    /// @ai:effects pure
    pub fn new() -> Self {
        Self
    }

    /// @ai:intent Parse dataset content already read into memory
    /// @ai:pre source names where content came from, for diagnostics
    /// @ai:post order of returned items matches line order
    /// @ai:effects pure
    pub fn parse<T: ItemSchema>(content: &[u8], source: &Path) -> Result<Vec<T>, DatasetError> {
        let mut items = Vec::new();
        let mut first_seen: HashMap<String, usize> = HashMap::new();

        for (index, bytes) in content.split(|b| *b == b'\n').enumerate() {
            let line = index + 1;
            let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);

            let raw = std::str::from_utf8(bytes).map_err(|e| DatasetError::InvalidRecord {
                kind: T::KIND,
                path: source.to_path_buf(),
                line,
                content: String::from_utf8_lossy(bytes).into_owned(),
                reason: format!("invalid UTF-8: {}", e),
            })?;

            if raw.trim().is_empty() {
                continue;
            }

            let item: T = serde_json::from_str(raw).map_err(|e| DatasetError::InvalidRecord {
                kind: T::KIND,
                path: source.to_path_buf(),
                line,
                content: raw.to_string(),
                reason: e.to_string(),
            })?;

            item.validate().map_err(|reason| DatasetError::InvalidRecord {
                kind: T::KIND,
                path: source.to_path_buf(),
                line,
                content: raw.to_string(),
                reason,
            })?;

            if let Some(&first_line) = first_seen.get(item.id()) {
                return Err(DatasetError::DuplicateId {
                    kind: T::KIND,
                    path: source.to_path_buf(),
                    id: item.id().to_string(),
                    line,
                    first_line,
                });
            }

            first_seen.insert(item.id().to_string(), line);
            items.push(item);
        }

        Ok(items)
    }
}

impl Default for DatasetLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetLoaderTrait for DatasetLoader {
    /// @ai:intent Load every record from a dataset file
    /// @ai:effects fs:read
    fn load<T: ItemSchema>(&self, path: &Path) -> Result<Vec<T>, DatasetError> {
        let content = std::fs::read(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let items = Self::parse(&content, path)?;
        tracing::debug!("Loaded {} {} items from {}", items.len(), T::KIND, path.display());
        Ok(items)
    }

    /// @ai:intent Load a dataset and keep records matching the filter
    /// @ai:effects fs:read
    fn load_filtered<T: ItemSchema>(
        &self,
        path: &Path,
        filter: &FilterConfig,
    ) -> Result<Vec<T>, DatasetError> {
        let all_items: Vec<T> = self.load(path)?;

        let filtered: Vec<T> = all_items
            .into_iter()
            .filter(|item| filter.matches(item.exam_variant()))
            .collect();

        Ok(filtered)
    }
}
