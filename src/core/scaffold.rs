//! Workspace scaffolding for `init`.
//!
//! Creates the library directories, `.copilot/` with config and an empty
//! registry, and a README for overrides. Existing files are never
//! overwritten without `--force`, and an existing registry is always kept.

use crate::core::assets;
use crate::core::config::{CONFIG_REL_PATH, LayoutConfig};
use crate::core::error::ResolverError;
use crate::core::registry::Registry;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub struct ScaffoldOptions {
    pub target_dir: PathBuf,
    pub force: bool,
    /// Report what would happen without writing.
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ScaffoldAction {
    Wrote,
    WouldWrite,
    Kept,
    WouldKeep,
    CreatedDir,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ScaffoldStep {
    pub path: PathBuf,
    pub action: ScaffoldAction,
}

fn ensure_parent(path: &Path) -> Result<(), ResolverError> {
    if let Some(p) = path.parent() {
        fs::create_dir_all(p).map_err(ResolverError::IoError)?;
    }
    Ok(())
}

fn write_file(
    opts: &ScaffoldOptions,
    rel_path: &str,
    content: &str,
) -> Result<ScaffoldStep, ResolverError> {
    let dest = opts.target_dir.join(rel_path);
    let step = |action| ScaffoldStep {
        path: PathBuf::from(rel_path),
        action,
    };

    if dest.exists() && !opts.force {
        if opts.dry_run {
            return Ok(step(ScaffoldAction::WouldKeep));
        }
        return Err(ResolverError::ValidationError(format!(
            "Refusing to overwrite existing path without --force: {}",
            dest.display()
        )));
    }

    if opts.dry_run {
        return Ok(step(ScaffoldAction::WouldWrite));
    }

    ensure_parent(&dest)?;
    fs::write(&dest, content).map_err(ResolverError::IoError)?;
    Ok(step(ScaffoldAction::Wrote))
}

fn template(name: &str) -> Result<String, ResolverError> {
    assets::get_template(name)
        .ok_or_else(|| ResolverError::NotFound(format!("embedded template {}", name)))
}

pub fn scaffold_workspace(opts: &ScaffoldOptions) -> Result<Vec<ScaffoldStep>, ResolverError> {
    let layout = LayoutConfig::default();
    let mut steps = Vec::new();

    let dirs = [
        format!("{}/languages", layout.instructions_dir),
        format!("{}/scenarios", layout.instructions_dir),
        layout.prompts_dir.clone(),
        layout.overrides_dir.clone(),
    ];
    for dir in &dirs {
        let path = opts.target_dir.join(dir);
        if !path.is_dir() {
            if !opts.dry_run {
                fs::create_dir_all(&path).map_err(ResolverError::IoError)?;
            }
            steps.push(ScaffoldStep {
                path: PathBuf::from(dir),
                action: ScaffoldAction::CreatedDir,
            });
        }
    }

    steps.push(write_file(opts, CONFIG_REL_PATH, &template("config.toml")?)?);
    steps.push(write_file(
        opts,
        &format!("{}/README.md", layout.overrides_dir),
        &template("OVERRIDES.md")?,
    )?);
    let library_readme = Path::new(&layout.prompts_dir)
        .parent()
        .map(|p| p.join("README.md"))
        .unwrap_or_else(|| PathBuf::from("README.md"));
    steps.push(write_file(
        opts,
        &library_readme.to_string_lossy(),
        &template("LIBRARY.md")?,
    )?);

    let registry_path = opts.target_dir.join(&layout.registry);
    let action = match (registry_path.exists(), opts.dry_run) {
        (true, false) => ScaffoldAction::Kept,
        (true, true) => ScaffoldAction::WouldKeep,
        (false, true) => ScaffoldAction::WouldWrite,
        (false, false) => {
            Registry::new().save(&registry_path)?;
            ScaffoldAction::Wrote
        }
    };
    steps.push(ScaffoldStep {
        path: PathBuf::from(&layout.registry),
        action,
    });

    info!(target_dir = %opts.target_dir.display(), steps = steps.len(), "workspace scaffolded");
    Ok(steps)
}
