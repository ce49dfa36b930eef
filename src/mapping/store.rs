//! Storage for named mapping tables.
//!
//! The comparison engine never touches storage: callers load a [`MappingConfig`] through a
//! [`MappingStore`] and pass it to [`super::resolve`] as a plain value.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::{CompareError, CompareResult};

use super::{FieldMapping, MappingConfig};

/// Read/write access to named mapping tables.
pub trait MappingStore: Send + Sync {
    /// Load `name`, or `Ok(None)` if it has never been saved.
    fn load(&self, name: &str) -> CompareResult<Option<MappingConfig>>;

    /// Replace `name` with `config`.
    fn save(&self, name: &str, config: &MappingConfig) -> CompareResult<()>;

    /// Merge an edit into `name` (see [`MappingConfig::apply_update`]) and return the result.
    ///
    /// The default implementation is load-then-save; concurrent writers must be serialized by
    /// the caller.
    fn update(
        &self,
        name: &str,
        field_mapping: &FieldMapping,
        key_fields: &[String],
    ) -> CompareResult<MappingConfig> {
        let mut config = self.load(name)?.unwrap_or_default();
        config.apply_update(field_mapping, key_fields);
        self.save(name, &config)?;
        Ok(config)
    }
}

/// Stores each mapping as `<dir>/<name>.csv`.
#[derive(Debug, Clone)]
pub struct DirectoryMappingStore {
    dir: PathBuf,
}

impl DirectoryMappingStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// File backing `name`.
    pub fn path_for(&self, name: &str) -> CompareResult<PathBuf> {
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\']);
        if !valid {
            return Err(CompareError::config(format!("invalid mapping name '{name}'")));
        }
        Ok(self.dir.join(format!("{name}.csv")))
    }
}

impl MappingStore for DirectoryMappingStore {
    fn load(&self, name: &str) -> CompareResult<Option<MappingConfig>> {
        let path = self.path_for(name)?;
        match fs::File::open(&path) {
            Ok(file) => MappingConfig::from_reader(file).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, name: &str, config: &MappingConfig) -> CompareResult<()> {
        let path = self.path_for(name)?;
        fs::create_dir_all(&self.dir)?;
        // Write beside the target and rename so readers never see a half-written table.
        let tmp = path.with_extension("csv.tmp");
        config.to_path(&tmp)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Process-local store, mainly for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemoryMappingStore {
    configs: RwLock<HashMap<String, MappingConfig>>,
}

impl InMemoryMappingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> CompareError {
    CompareError::config("mapping store lock poisoned")
}

impl MappingStore for InMemoryMappingStore {
    fn load(&self, name: &str) -> CompareResult<Option<MappingConfig>> {
        let configs = self.configs.read().map_err(|_| poisoned())?;
        Ok(configs.get(name).cloned())
    }

    fn save(&self, name: &str, config: &MappingConfig) -> CompareResult<()> {
        let mut configs = self.configs.write().map_err(|_| poisoned())?;
        configs.insert(name.to_string(), config.clone());
        Ok(())
    }

    fn update(
        &self,
        name: &str,
        field_mapping: &FieldMapping,
        key_fields: &[String],
    ) -> CompareResult<MappingConfig> {
        let mut configs = self.configs.write().map_err(|_| poisoned())?;
        let config = configs.entry(name.to_string()).or_default();
        config.apply_update(field_mapping, key_fields);
        Ok(config.clone())
    }
}
