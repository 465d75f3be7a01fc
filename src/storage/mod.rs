//! Artifact storage.
//!
//! Every pipeline run persists its inputs and derived tables through a
//! [`DatasetStore`] rather than fixed global file paths, so the cache
//! location is injected and tests can substitute an in-memory store. The
//! cache is advisory: the pipeline recomputes everything when it is absent.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::dataset::RawTable;
use crate::error::{Error, Result};
use crate::io::csv::{read_csv, write_csv};

/// Keys for the flat-file artifacts a run overwrites
pub mod keys {
    /// The raw uploaded dataset, as received
    pub const UPLOADED_DATASET: &str = "uploaded_dataset";
    /// The cleaned, date-indexed dataset (dates formatted day-month-year)
    pub const PREPROCESSED_DATASET: &str = "preprocessed_dataset";
    /// Best-performing store per product category
    pub const BEST_STORE_FOR_CATEGORY: &str = "best_store_for_category";
    /// Recommended inventory per store and category
    pub const RECOMMENDED_INVENTORY: &str = "recommended_inventory";
}

/// Keyed storage for tabular artifacts
pub trait DatasetStore {
    /// Load a table by key; `Ok(None)` when the artifact does not exist
    fn load(&self, key: &str) -> Result<Option<RawTable>>;

    /// Save a table under a key, replacing any previous version
    fn save(&mut self, key: &str, table: &RawTable) -> Result<()>;

    /// Whether an artifact exists for the key
    fn contains(&self, key: &str) -> bool;
}

/// Flat-file store: one `<key>.csv` per artifact inside a directory.
///
/// There is no locking; concurrent sessions writing the same directory
/// race. Acceptable only in a single-user deployment.
#[derive(Debug, Clone)]
pub struct DiskStore {
    dir: PathBuf,
}

impl DiskStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(DiskStore { dir })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\', '.']) {
            return Err(Error::InvalidInput(format!("invalid artifact key: {key}")));
        }
        Ok(self.dir.join(format!("{key}.csv")))
    }
}

impl DatasetStore for DiskStore {
    fn load(&self, key: &str) -> Result<Option<RawTable>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        read_csv(path).map(Some)
    }

    fn save(&mut self, key: &str, table: &RawTable) -> Result<()> {
        write_csv(table, self.path_for(key)?)
    }

    fn contains(&self, key: &str) -> bool {
        self.path_for(key).map(|p| p.exists()).unwrap_or(false)
    }
}

/// In-memory store for tests and ephemeral sessions
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: HashMap<String, RawTable>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DatasetStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<RawTable>> {
        Ok(self.tables.get(key).cloned())
    }

    fn save(&mut self, key: &str, table: &RawTable) -> Result<()> {
        self.tables.insert(key.to_string(), table.clone());
        Ok(())
    }

    fn contains(&self, key: &str) -> bool {
        self.tables.contains_key(key)
    }
}
