//! Version registry (`.copilot/registry.json`).
//!
//! Maps artifact id to version metadata. Created on import, updated on
//! refresh, read on every resolution pass. Callers load it once and pass
//! it by reference; nothing here is global.

use crate::core::error::ResolverError;
use crate::core::time;
use crate::core::version::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const REGISTRY_SCHEMA_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistryEntry {
    pub version: Version,
    /// Library the artifact was imported from.
    pub source: String,
    /// Workspace-relative path of the imported copy.
    pub path: PathBuf,
    /// SHA-256 of the imported file, for local-edit detection.
    pub checksum: String,
    pub imported_at: String,
    pub updated_at: String,
}

impl RegistryEntry {
    pub fn new(version: Version, source: &str, path: &Path, checksum: &str) -> Self {
        let now = time::now_epoch_z();
        Self {
            version,
            source: source.to_string(),
            path: path.to_path_buf(),
            checksum: checksum.to_string(),
            imported_at: now.clone(),
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Registry {
    pub schema_version: String,
    #[serde(default)]
    pub artifacts: BTreeMap<String, RegistryEntry>,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            schema_version: REGISTRY_SCHEMA_VERSION.to_string(),
            artifacts: BTreeMap::new(),
        }
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `path`. A missing file is an empty registry.
    pub fn load(path: &Path) -> Result<Self, ResolverError> {
        if !path.exists() {
            debug!(path = %path.display(), "no registry file, starting empty");
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).map_err(ResolverError::IoError)?;
        let registry: Registry = serde_json::from_str(&raw).map_err(|e| {
            ResolverError::ValidationError(format!(
                "REGISTRY_INVALID: {}: {}",
                path.display(),
                e
            ))
        })?;
        if registry.schema_version != REGISTRY_SCHEMA_VERSION {
            return Err(ResolverError::ValidationError(format!(
                "REGISTRY_SCHEMA_MISMATCH: actual={} expected={}",
                registry.schema_version, REGISTRY_SCHEMA_VERSION
            )));
        }
        Ok(registry)
    }

    /// Write pretty JSON through a temp file so readers never see half a file.
    pub fn save(&self, path: &Path) -> Result<(), ResolverError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ResolverError::IoError)?;
        }
        let body = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, format!("{}\n", body)).map_err(ResolverError::IoError)?;
        fs::rename(&tmp, path).map_err(ResolverError::IoError)?;
        info!(path = %path.display(), entries = self.artifacts.len(), "registry saved");
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&RegistryEntry> {
        self.artifacts.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.artifacts.contains_key(id)
    }

    pub fn version_of(&self, id: &str) -> Option<&Version> {
        self.artifacts.get(id).map(|e| &e.version)
    }

    /// Record a newly imported artifact. Ids are unique.
    pub fn register(&mut self, id: &str, entry: RegistryEntry) -> Result<(), ResolverError> {
        if let Some(existing) = self.artifacts.get(id) {
            return Err(ResolverError::DuplicateArtifact {
                id: id.to_string(),
                first: existing.path.clone(),
                second: entry.path,
            });
        }
        self.artifacts.insert(id.to_string(), entry);
        Ok(())
    }

    /// Update an existing entry after the artifact was refreshed.
    /// Returns the previous version.
    pub fn refresh(
        &mut self,
        id: &str,
        version: Version,
        checksum: &str,
        source: &str,
    ) -> Result<Version, ResolverError> {
        let entry = self
            .artifacts
            .get_mut(id)
            .ok_or_else(|| ResolverError::NotFound(format!("registry entry '{}'", id)))?;
        let previous = std::mem::replace(&mut entry.version, version);
        entry.checksum = checksum.to_string();
        entry.source = source.to_string();
        entry.updated_at = time::now_epoch_z();
        Ok(previous)
    }

    pub fn set_version(&mut self, id: &str, version: Version) -> Result<Version, ResolverError> {
        let entry = self
            .artifacts
            .get_mut(id)
            .ok_or_else(|| ResolverError::NotFound(format!("registry entry '{}'", id)))?;
        entry.updated_at = time::now_epoch_z();
        Ok(std::mem::replace(&mut entry.version, version))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RegistryEntry)> {
        self.artifacts.iter()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}
