//! `.copilot/config.toml` loading.
//!
//! A missing config file means defaults; an unreadable or invalid one is
//! an error.

use crate::core::error::ResolverError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CONFIG_REL_PATH: &str = ".copilot/config.toml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    /// Holds `languages/` and `scenarios/`.
    pub instructions_dir: String,
    pub prompts_dir: String,
    pub overrides_dir: String,
    /// Single repo-wide project instruction file.
    pub project_file: String,
    pub registry: String,
    pub conflict_log: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            instructions_dir: "copilot/instructions".to_string(),
            prompts_dir: "copilot/prompts".to_string(),
            overrides_dir: ".copilot/overrides".to_string(),
            project_file: ".github/copilot-instructions.md".to_string(),
            registry: ".copilot/registry.json".to_string(),
            conflict_log: ".copilot/conflicts.jsonl".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DetectorKind {
    #[default]
    Directive,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ConflictConfig {
    pub detector: DetectorKind,
    /// Append detected conflicts to the conflict log.
    pub log: bool,
}

impl Default for ConflictConfig {
    fn default() -> Self {
        Self {
            detector: DetectorKind::Directive,
            log: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub token_budget: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
    pub layout: LayoutConfig,
    pub conflicts: ConflictConfig,
    pub render: RenderConfig,
}

impl ResolverConfig {
    pub fn from_toml(raw: &str) -> Result<Self, ResolverError> {
        Ok(toml::from_str(raw)?)
    }
}

/// Load config for the workspace at `root`; no file means defaults.
pub fn load_config(root: &Path) -> Result<ResolverConfig, ResolverError> {
    let path = root.join(CONFIG_REL_PATH);
    if !path.exists() {
        return Ok(ResolverConfig::default());
    }
    let content = fs::read_to_string(&path).map_err(ResolverError::IoError)?;
    ResolverConfig::from_toml(&content).map_err(|e| {
        ResolverError::ValidationError(format!("{}: {}", path.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let tmp = tempdir().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config, ResolverConfig::default());
        assert_eq!(config.layout.registry, ".copilot/registry.json");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = ResolverConfig::from_toml(
            "[conflicts]\ndetector = \"none\"\n\n[render]\ntoken_budget = 2000\n",
        )
        .unwrap();
        assert_eq!(config.conflicts.detector, DetectorKind::None);
        assert!(config.conflicts.log);
        assert_eq!(config.render.token_budget, Some(2000));
        assert_eq!(config.layout.prompts_dir, "copilot/prompts");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let tmp = tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join(".copilot")).unwrap();
        std::fs::write(
            tmp.path().join(CONFIG_REL_PATH),
            "[layout]\nprompt_dir = \"x\"\n",
        )
        .unwrap();
        let err = load_config(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("config.toml"));
    }
}
