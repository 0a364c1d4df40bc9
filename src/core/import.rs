//! Import and refresh artifacts from an external instruction library.
//!
//! The library uses the default directory convention. Each artifact is
//! copied to the same relative place in the workspace layout and recorded
//! in the registry. Project overrides are never imported.
//!
//! A refresh never overwrites a workspace copy that was edited after
//! import (its checksum no longer matches the registry) unless forced.
//! Local changes belong in `.copilot/overrides/`.

use crate::core::artifact::{ArtifactCategory, checksum};
use crate::core::config::LayoutConfig;
use crate::core::error::ResolverError;
use crate::core::registry::{Registry, RegistryEntry};
use crate::core::version::Version;
use crate::core::workspace::{self, DiscoveredFile, Workspace};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_IMPORT_VERSION: &str = "0.0.0";

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub source: PathBuf,
    /// Update artifacts that are already registered.
    pub refresh: bool,
    /// Overwrite locally edited or untracked workspace files.
    pub force: bool,
    /// Version for artifacts without a frontmatter `version`.
    pub version: Option<Version>,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RefreshedArtifact {
    pub id: String,
    pub from: Version,
    pub to: Version,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SkippedArtifact {
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct ImportReport {
    pub source: String,
    pub dry_run: bool,
    pub created: Vec<String>,
    pub refreshed: Vec<RefreshedArtifact>,
    pub skipped: Vec<SkippedArtifact>,
}

impl ImportReport {
    /// True when the registry needs saving.
    pub fn changed(&self) -> bool {
        !self.dry_run && (!self.created.is_empty() || !self.refreshed.is_empty())
    }

    fn skip(&mut self, id: &str, reason: impl Into<String>) {
        self.skipped.push(SkippedArtifact {
            id: id.to_string(),
            reason: reason.into(),
        });
    }
}

/// Where a library file lands in the workspace, relative to its root.
fn destination(file: &DiscoveredFile, library: &LayoutConfig, target: &LayoutConfig) -> PathBuf {
    let (from, to) = match file.category {
        ArtifactCategory::Prompt => (&library.prompts_dir, &target.prompts_dir),
        _ => (&library.instructions_dir, &target.instructions_dir),
    };
    match file.rel_path.strip_prefix(from) {
        Ok(within) => Path::new(to).join(within),
        Err(_) => file.rel_path.clone(),
    }
}

fn write_copy(dest: &Path, raw: &str) -> Result<(), ResolverError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(ResolverError::IoError)?;
    }
    fs::write(dest, raw).map_err(ResolverError::IoError)
}

pub fn import_library(
    ws: &Workspace,
    registry: &mut Registry,
    opts: &ImportOptions,
) -> Result<ImportReport, ResolverError> {
    if !opts.source.is_dir() {
        return Err(ResolverError::NotFound(format!(
            "library directory {}",
            opts.source.display()
        )));
    }
    let library_layout = LayoutConfig::default();
    let source = opts.source.display().to_string();
    let mut report = ImportReport {
        source: source.clone(),
        dry_run: opts.dry_run,
        ..Default::default()
    };

    // Validate the whole library before touching the workspace.
    let files = workspace::discover(&opts.source, &library_layout, false);
    let mut seen: FxHashMap<String, PathBuf> = FxHashMap::default();
    let mut staged = Vec::with_capacity(files.len());
    for file in &files {
        let raw = fs::read_to_string(&file.abs_path).map_err(ResolverError::IoError)?;
        let artifact = match file.load() {
            Ok(a) => a,
            Err(e) => {
                warn!(path = %file.rel_path.display(), error = %e, "skipping invalid library artifact");
                report.skip(&file.rel_path.to_string_lossy(), format!("invalid: {}", e));
                continue;
            }
        };
        if let Some(first) = seen.insert(artifact.id.clone(), file.rel_path.clone()) {
            return Err(ResolverError::DuplicateArtifact {
                id: artifact.id,
                first,
                second: file.rel_path.clone(),
            });
        }
        staged.push((file, raw, artifact));
    }

    for (file, raw, artifact) in staged {
        let id = artifact.id.as_str();
        let version = artifact
            .declared_version
            .clone()
            .or_else(|| opts.version.clone())
            .unwrap_or_else(|| Version::parse(DEFAULT_IMPORT_VERSION));
        let incoming = checksum(raw.as_bytes());
        let dest_rel = destination(file, &library_layout, &ws.config.layout);

        if let Some(entry) = registry.get(id).cloned() {
            if !opts.refresh {
                report.skip(id, "already registered (use --refresh to update)");
                continue;
            }
            let dest = ws.root.join(&entry.path);
            if dest.is_file() && !opts.force {
                let local = checksum(&fs::read(&dest).map_err(ResolverError::IoError)?);
                if local != entry.checksum {
                    report.skip(
                        id,
                        "modified locally; move changes to an override or pass --force",
                    );
                    continue;
                }
            }
            if entry.checksum == incoming && entry.version == version && dest.is_file() {
                report.skip(id, "up to date");
                continue;
            }
            if !opts.dry_run {
                write_copy(&dest, &raw)?;
            }
            let from = if opts.dry_run {
                entry.version.clone()
            } else {
                registry.refresh(id, version.clone(), &incoming, &source)?
            };
            info!(id, from = %from.as_str(), to = %version.as_str(), "artifact refreshed");
            report.refreshed.push(RefreshedArtifact {
                id: id.to_string(),
                from,
                to: version,
            });
            continue;
        }

        let dest = ws.root.join(&dest_rel);
        if dest.is_file() && !opts.force {
            let existing = checksum(&fs::read(&dest).map_err(ResolverError::IoError)?);
            if existing != incoming {
                report.skip(id, format!("untracked file exists at {}", dest_rel.display()));
                continue;
            }
        }
        if !opts.dry_run {
            write_copy(&dest, &raw)?;
            registry.register(id, RegistryEntry::new(version, &source, &dest_rel, &incoming))?;
        }
        info!(id, path = %dest_rel.display(), "artifact imported");
        report.created.push(id.to_string());
    }

    info!(
        source = %source,
        created = report.created.len(),
        refreshed = report.refreshed.len(),
        skipped = report.skipped.len(),
        "import finished"
    );
    Ok(report)
}
