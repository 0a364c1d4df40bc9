//! Doctor: read-only workspace health checks behind `validate`.
//!
//! - Config and registry parse
//! - Artifacts load (frontmatter, patterns, unique ids)
//! - Library artifacts are registered
//! - Registry entries point at files whose checksums still match

use crate::core::artifact::{ArtifactCategory, ArtifactSet, checksum};
use crate::core::config::{self, CONFIG_REL_PATH, ResolverConfig};
use crate::core::error::ResolverError;
use crate::core::output;
use crate::core::registry::Registry;
use crate::core::time;
use crate::core::workspace::Workspace;
use colored::Colorize;
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct DoctorReport {
    pub checks: Vec<CheckResult>,
    pub passed: usize,
    pub failed: usize,
    pub warnings: usize,
}

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Fail,
    Warn,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
        }
    }
}

pub fn run_validate_cli(project_root: &Path, format: &str) -> Result<(), ResolverError> {
    let report = run_checks(project_root);

    if format == "json" {
        let status = if report.failed > 0 { "error" } else { "ok" };
        let payload = serde_json::to_value(&report)?;
        println!(
            "{}",
            serde_json::to_string_pretty(&time::command_envelope("validate", status, payload))?
        );
    } else {
        println!("{}\n", "copilot-resolver validate".bold());
        for check in &report.checks {
            let icon = match check.status {
                CheckStatus::Pass => "PASS".green(),
                CheckStatus::Fail => "FAIL".red(),
                CheckStatus::Warn => "WARN".yellow(),
            };
            println!("  [{}] {}: {}", icon, check.name, check.message);
        }
        println!(
            "\nSummary: {} passed, {} failed, {} warnings",
            report.passed, report.failed, report.warnings
        );
    }

    if report.failed > 0 {
        return Err(ResolverError::ValidationError(format!(
            "validate: {} check(s) failed",
            report.failed
        )));
    }
    Ok(())
}

pub fn run_checks(project_root: &Path) -> DoctorReport {
    let mut checks = Vec::new();

    let (config_check, config) = check_config(project_root);
    checks.push(config_check);
    let ws = Workspace::with_config(project_root, config);

    checks.push(check_layout(&ws));

    let registry = match Registry::load(&ws.registry_path()) {
        Ok(r) => {
            checks.push(CheckResult::new(
                "Registry",
                CheckStatus::Pass,
                output::plural(r.len(), "entry", "entries"),
            ));
            Some(r)
        }
        Err(e) => {
            checks.push(CheckResult::new("Registry", CheckStatus::Fail, e.to_string()));
            None
        }
    };

    let artifacts = match ws.load_artifacts() {
        Ok(set) => {
            checks.push(CheckResult::new(
                "Artifacts",
                CheckStatus::Pass,
                format!("{} loaded", set.len()),
            ));
            Some(set)
        }
        Err(e) => {
            checks.push(CheckResult::new("Artifacts", CheckStatus::Fail, e.to_string()));
            None
        }
    };

    if let Some(registry) = &registry {
        if let Some(set) = &artifacts {
            checks.push(check_registered(set, registry));
        }
        checks.extend(check_registry_files(&ws, registry));
    }

    let count = |status| checks.iter().filter(|c| c.status == status).count();
    let passed = count(CheckStatus::Pass);
    let failed = count(CheckStatus::Fail);
    let warnings = count(CheckStatus::Warn);

    DoctorReport {
        checks,
        passed,
        failed,
        warnings,
    }
}

fn check_config(project_root: &Path) -> (CheckResult, ResolverConfig) {
    if !project_root.join(CONFIG_REL_PATH).is_file() {
        return (
            CheckResult::new("Config", CheckStatus::Pass, "No config file (using defaults)"),
            ResolverConfig::default(),
        );
    }
    match config::load_config(project_root) {
        Ok(cfg) => (
            CheckResult::new("Config", CheckStatus::Pass, format!("{} is valid", CONFIG_REL_PATH)),
            cfg,
        ),
        Err(e) => (
            CheckResult::new("Config", CheckStatus::Fail, e.to_string()),
            ResolverConfig::default(),
        ),
    }
}

fn check_layout(ws: &Workspace) -> CheckResult {
    let layout = &ws.config.layout;
    let present: Vec<&str> = [&layout.instructions_dir, &layout.prompts_dir]
        .into_iter()
        .filter(|d| ws.root.join(d).is_dir())
        .map(String::as_str)
        .collect();
    if present.is_empty() {
        CheckResult::new(
            "Layout",
            CheckStatus::Warn,
            format!(
                "neither {} nor {} exists (run `copilot-resolver init`)",
                layout.instructions_dir, layout.prompts_dir
            ),
        )
    } else {
        CheckResult::new("Layout", CheckStatus::Pass, present.join(", "))
    }
}

fn check_registered(set: &ArtifactSet, registry: &Registry) -> CheckResult {
    let missing: Vec<String> = set
        .iter()
        .filter(|a| a.category != ArtifactCategory::Project && !registry.contains(&a.id))
        .map(|a| a.id.clone())
        .collect();
    if missing.is_empty() {
        CheckResult::new("Registered", CheckStatus::Pass, "every library artifact is registered")
    } else {
        CheckResult::new(
            "Registered",
            CheckStatus::Warn,
            format!(
                "{} unregistered: {}",
                missing.len(),
                output::preview_messages(&missing, 5, 60)
            ),
        )
    }
}

fn check_registry_files(ws: &Workspace, registry: &Registry) -> Vec<CheckResult> {
    let mut missing = Vec::new();
    let mut modified = Vec::new();
    for (id, entry) in registry.iter() {
        let path = ws.root.join(&entry.path);
        match fs::read(&path) {
            Ok(bytes) if checksum(&bytes) != entry.checksum => modified.push(id.clone()),
            Ok(_) => {}
            Err(_) => missing.push(format!("{} ({})", id, entry.path.display())),
        }
    }

    let files = if missing.is_empty() {
        CheckResult::new("Registry files", CheckStatus::Pass, "every entry has a file")
    } else {
        CheckResult::new(
            "Registry files",
            CheckStatus::Fail,
            format!("missing: {}", output::preview_messages(&missing, 5, 80)),
        )
    };
    let checksums = if modified.is_empty() {
        CheckResult::new("Checksums", CheckStatus::Pass, "imported copies are unmodified")
    } else {
        CheckResult::new(
            "Checksums",
            CheckStatus::Warn,
            format!(
                "modified locally: {}",
                output::preview_messages(&modified, 5, 60)
            ),
        )
    };
    vec![files, checksums]
}
