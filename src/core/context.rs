//! Resolution context: the signals one editing interaction provides.
//!
//! A context is built per request and thrown away afterwards. Signals are
//! kept in ordered sets so two contexts built from the same inputs in a
//! different order are identical.

use crate::core::glob::normalize_path;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    /// Workspace-relative paths of files being edited.
    pub files: BTreeSet<String>,
    /// Scenario names such as `cicd-github`.
    pub scenarios: BTreeSet<String>,
    /// Detected or declared frameworks such as `react`.
    pub frameworks: BTreeSet<String>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl AsRef<str>) -> Self {
        self.add_file(path.as_ref());
        self
    }

    /// A bare extension (`.cs` or `cs`) stands in for any file of that type.
    pub fn with_extension(mut self, ext: impl AsRef<str>) -> Self {
        self.add_extension(ext.as_ref());
        self
    }

    pub fn with_scenario(mut self, scenario: impl AsRef<str>) -> Self {
        self.add_token(scenario.as_ref(), false);
        self
    }

    pub fn with_framework(mut self, framework: impl AsRef<str>) -> Self {
        self.add_token(framework.as_ref(), true);
        self
    }

    /// Classify a loose signal: `.cs` is an extension, anything with a path
    /// separator or a dot is a file, everything else is a scenario name.
    pub fn with_signal(mut self, signal: impl AsRef<str>) -> Self {
        let signal = signal.as_ref().trim();
        if signal.is_empty() {
            return self;
        }
        if signal.starts_with('.') && !signal.contains('/') && signal.matches('.').count() == 1 {
            self.add_extension(signal);
        } else if signal.contains('/') || signal.contains('\\') || signal.contains('.') {
            self.add_file(signal);
        } else {
            self.add_token(signal, false);
        }
        self
    }

    fn add_file(&mut self, path: &str) {
        let path = normalize_path(path.trim());
        if !path.is_empty() {
            self.files.insert(path);
        }
    }

    fn add_extension(&mut self, ext: &str) {
        let ext = ext.trim().trim_start_matches('.');
        if !ext.is_empty() {
            self.files.insert(format!("file.{}", ext));
        }
    }

    fn add_token(&mut self, token: &str, framework: bool) {
        let token = token.trim().to_lowercase();
        if token.is_empty() {
            return;
        }
        if framework {
            self.frameworks.insert(token);
        } else {
            self.scenarios.insert(token);
        }
    }

    pub fn merge(mut self, other: Context) -> Self {
        self.files.extend(other.files);
        self.scenarios.extend(other.scenarios);
        self.frameworks.extend(other.frameworks);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.scenarios.is_empty() && self.frameworks.is_empty()
    }

    /// Every signal, in a fixed order: files, scenarios, frameworks.
    pub fn signals(&self) -> impl Iterator<Item = &str> {
        self.files
            .iter()
            .chain(self.scenarios.iter())
            .chain(self.frameworks.iter())
            .map(String::as_str)
    }

    /// Scenario and framework names.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.scenarios
            .iter()
            .chain(self.frameworks.iter())
            .map(String::as_str)
    }

    pub fn describe(&self) -> String {
        if self.is_empty() {
            return "(empty context)".to_string();
        }
        self.signals().collect::<Vec<_>>().join(", ")
    }
}

/// Marker files and what they imply. Frameworks feed language/framework
/// artifacts; scenarios feed CI/CD and infrastructure artifacts.
const FRAMEWORK_MARKERS: &[(&str, &str)] = &[
    ("package.json", "node"),
    ("tsconfig.json", "typescript"),
    ("requirements.txt", "python"),
    ("pyproject.toml", "python"),
    ("Cargo.toml", "rust"),
    ("go.mod", "go"),
    ("global.json", "dotnet"),
];

const SCENARIO_MARKERS: &[(&str, &str)] = &[
    (".github/workflows", "cicd-github"),
    ("azure-pipelines.yml", "cicd-azure-devops"),
    (".azure-pipelines", "cicd-azure-devops"),
    ("main.bicep", "bicep"),
    ("main.tf", "terraform"),
    (".platform", "fabric"),
];

/// Detect frameworks and scenarios from marker files at `root`.
pub fn detect(root: &Path) -> Context {
    let mut ctx = Context::new();

    for (marker, framework) in FRAMEWORK_MARKERS {
        if root.join(marker).exists() {
            ctx.add_token(framework, true);
        }
    }
    for (marker, scenario) in SCENARIO_MARKERS {
        if root.join(marker).exists() {
            ctx.add_token(scenario, false);
        }
    }

    if let Ok(raw) = std::fs::read_to_string(root.join("package.json"))
        && let Ok(manifest) = serde_json::from_str::<serde_json::Value>(&raw)
    {
        for section in ["dependencies", "devDependencies"] {
            if let Some(deps) = manifest.get(section).and_then(|v| v.as_object()) {
                for (dep, framework) in [("react", "react"), ("next", "nextjs"), ("vue", "vue")] {
                    if deps.contains_key(dep) {
                        ctx.add_token(framework, true);
                    }
                }
            }
        }
    }

    if let Ok(entries) = std::fs::read_dir(root) {
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.ends_with(".csproj") || name.ends_with(".sln") {
                ctx.add_token("dotnet", true);
            } else if name.ends_with(".bicep") {
                ctx.add_token("bicep", false);
            } else if name.ends_with(".tf") {
                ctx.add_token("terraform", false);
            }
        }
    }

    ctx
}
