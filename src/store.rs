// =============================================================================
// store.rs — WHERE THE KEYWORDS COME FROM
// =============================================================================
//
// The engine never owns its keyword tables. Operators edit them in the admin
// backend and we re-read them whenever a cache entry goes stale. This module
// is the boundary: a KeywordStore trait plus two implementations.
//
//   MemoryStore   tables held in process, swapped wholesale by the host
//                 (and by tests)
//   JsonDirStore  one JSON array per table in a directory, re-read on every
//                 fetch so edits on disk show up after the next rebuild
// =============================================================================

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

use crate::models::{AreaRow, DrugCategoryRow, DrugKeywordRow, DrugRow, TransactionKeywordRow};

/// Why keyword rows could not be fetched.
#[derive(Debug, Error)]
pub enum SourceError {
    /// No context to fetch from: no session, no directory, no table.
    /// Treated as "nothing configured", not as a failure.
    #[error("keyword configuration unavailable: {0}")]
    Unavailable(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("keyword backend error: {0}")]
    Backend(String),
}

impl SourceError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, SourceError::Unavailable(_))
    }
}

/// Read access to the keyword configuration tables.
///
/// Implementations return every row, active or not. Filtering is the
/// builders' job.
pub trait KeywordStore: Send + Sync {
    fn transaction_keywords(&self) -> Result<Vec<TransactionKeywordRow>, SourceError>;
    fn drug_categories(&self) -> Result<Vec<DrugCategoryRow>, SourceError>;
    fn drugs(&self) -> Result<Vec<DrugRow>, SourceError>;
    fn drug_keywords(&self) -> Result<Vec<DrugKeywordRow>, SourceError>;
    fn areas(&self) -> Result<Vec<AreaRow>, SourceError>;
}

#[derive(Debug, Default, Clone)]
struct Tables {
    transaction_keywords: Vec<TransactionKeywordRow>,
    drug_categories: Vec<DrugCategoryRow>,
    drugs: Vec<DrugRow>,
    drug_keywords: Vec<DrugKeywordRow>,
    areas: Vec<AreaRow>,
}

/// In-process tables. Writers replace a whole table at once.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_transaction_keywords(&self, rows: Vec<TransactionKeywordRow>) {
        self.tables.write().transaction_keywords = rows;
    }

    pub fn set_drug_categories(&self, rows: Vec<DrugCategoryRow>) {
        self.tables.write().drug_categories = rows;
    }

    pub fn set_drugs(&self, rows: Vec<DrugRow>) {
        self.tables.write().drugs = rows;
    }

    pub fn set_drug_keywords(&self, rows: Vec<DrugKeywordRow>) {
        self.tables.write().drug_keywords = rows;
    }

    pub fn set_areas(&self, rows: Vec<AreaRow>) {
        self.tables.write().areas = rows;
    }
}

impl KeywordStore for MemoryStore {
    fn transaction_keywords(&self) -> Result<Vec<TransactionKeywordRow>, SourceError> {
        Ok(self.tables.read().transaction_keywords.clone())
    }

    fn drug_categories(&self) -> Result<Vec<DrugCategoryRow>, SourceError> {
        Ok(self.tables.read().drug_categories.clone())
    }

    fn drugs(&self) -> Result<Vec<DrugRow>, SourceError> {
        Ok(self.tables.read().drugs.clone())
    }

    fn drug_keywords(&self) -> Result<Vec<DrugKeywordRow>, SourceError> {
        Ok(self.tables.read().drug_keywords.clone())
    }

    fn areas(&self) -> Result<Vec<AreaRow>, SourceError> {
        Ok(self.tables.read().areas.clone())
    }
}

pub const TRANSACTION_KEYWORDS_FILE: &str = "transaction_keywords.json";
pub const DRUG_CATEGORIES_FILE: &str = "drug_categories.json";
pub const DRUGS_FILE: &str = "drugs.json";
pub const DRUG_KEYWORDS_FILE: &str = "drug_keywords.json";
pub const AREAS_FILE: &str = "areas.json";

/// Tables stored as JSON arrays, one file per table.
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn load<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>, SourceError> {
        let path = self.dir.join(file);
        if !path.is_file() {
            return Err(SourceError::Unavailable(format!(
                "{} does not exist",
                path.display()
            )));
        }

        let raw = fs::read_to_string(&path).map_err(|source| SourceError::Io {
            path: path.clone(),
            source,
        })?;
        let rows: Vec<T> = serde_json::from_str(&raw).map_err(|source| SourceError::Parse {
            path: path.clone(),
            source,
        })?;

        debug!(path = %path.display(), rows = rows.len(), "Loaded keyword table");
        Ok(rows)
    }
}

impl KeywordStore for JsonDirStore {
    fn transaction_keywords(&self) -> Result<Vec<TransactionKeywordRow>, SourceError> {
        self.load(TRANSACTION_KEYWORDS_FILE)
    }

    fn drug_categories(&self) -> Result<Vec<DrugCategoryRow>, SourceError> {
        self.load(DRUG_CATEGORIES_FILE)
    }

    fn drugs(&self) -> Result<Vec<DrugRow>, SourceError> {
        self.load(DRUGS_FILE)
    }

    fn drug_keywords(&self) -> Result<Vec<DrugKeywordRow>, SourceError> {
        self.load(DRUG_KEYWORDS_FILE)
    }

    fn areas(&self) -> Result<Vec<AreaRow>, SourceError> {
        self.load(AREAS_FILE)
    }
}
