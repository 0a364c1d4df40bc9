//! Workspace handle and artifact discovery.
//!
//! A workspace is a project root plus its config. Artifacts are discovered
//! by directory convention:
//!
//! ```text
//! copilot/instructions/languages/{language}/*.md   language
//! copilot/instructions/scenarios/**/*.md           scenario
//! copilot/prompts/**/*.md                          prompt
//! .copilot/overrides/**/*.md                       project
//! .github/copilot-instructions.md                  project
//! ```

use crate::core::artifact::{ArtifactCategory, ArtifactSet, ArtifactSource, InstructionArtifact};
use crate::core::config::{self, LayoutConfig, ResolverConfig};
use crate::core::error::ResolverError;
use crate::core::registry::Registry;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

pub const ROOT_ENV: &str = "COPILOT_RESOLVER_ROOT";
pub const MARKER_DIR: &str = ".copilot";

#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
    pub config: ResolverConfig,
}

/// A Markdown file found under the layout, before parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    pub abs_path: PathBuf,
    /// Relative to the layout root.
    pub rel_path: PathBuf,
    /// Relative to the category root; drives the derived id.
    pub id_path: PathBuf,
    pub category: ArtifactCategory,
    pub language: Option<String>,
}

impl DiscoveredFile {
    pub fn load(&self) -> Result<InstructionArtifact, ResolverError> {
        let raw = fs::read_to_string(&self.abs_path).map_err(ResolverError::IoError)?;
        InstructionArtifact::parse(
            &ArtifactSource {
                rel_path: &self.rel_path,
                id_path: &self.id_path,
                category: self.category,
                language: self.language.as_deref(),
            },
            &raw,
        )
    }
}

impl Workspace {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, ResolverError> {
        let root = root.into();
        let config = config::load_config(&root)?;
        Ok(Self { root, config })
    }

    pub fn with_config(root: impl Into<PathBuf>, config: ResolverConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    pub fn registry_path(&self) -> PathBuf {
        self.root.join(&self.config.layout.registry)
    }

    pub fn conflict_log_path(&self) -> PathBuf {
        self.root.join(&self.config.layout.conflict_log)
    }

    pub fn load_registry(&self) -> Result<Registry, ResolverError> {
        Registry::load(&self.registry_path())
    }

    pub fn discover(&self) -> Vec<DiscoveredFile> {
        discover(&self.root, &self.config.layout, true)
    }

    /// Load every artifact in the workspace, sorted by path.
    pub fn load_artifacts(&self) -> Result<ArtifactSet, ResolverError> {
        let artifacts = self
            .discover()
            .iter()
            .map(DiscoveredFile::load)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            root = %self.root.display(),
            count = artifacts.len(),
            "loaded artifacts"
        );
        ArtifactSet::new(artifacts)
    }
}

/// Walk up from `start` to the first directory holding `.copilot/`.
/// `COPILOT_RESOLVER_ROOT` wins; with no marker the start dir is used.
pub fn find_root(start: &Path) -> PathBuf {
    if let Ok(root) = std::env::var(ROOT_ENV)
        && !root.trim().is_empty()
    {
        return PathBuf::from(root);
    }

    let mut current = start.to_path_buf();
    loop {
        if current.join(MARKER_DIR).is_dir() {
            return current;
        }
        if !current.pop() {
            return start.to_path_buf();
        }
    }
}

fn is_markdown(path: &Path) -> bool {
    let is_md = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("md"));
    let is_readme = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.eq_ignore_ascii_case("README.md"));
    is_md && !is_readme
}

fn markdown_under(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping unreadable entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file() && is_markdown(e.path()))
        .map(|e| e.into_path())
        .collect()
}

fn relative(path: &Path, base: &Path) -> PathBuf {
    path.strip_prefix(base).unwrap_or(path).to_path_buf()
}

/// Discover artifacts under `root` using `layout`. Overrides are skipped
/// when scanning an external library.
pub fn discover(root: &Path, layout: &LayoutConfig, include_overrides: bool) -> Vec<DiscoveredFile> {
    let mut found = Vec::new();
    let instructions = root.join(&layout.instructions_dir);

    let languages = instructions.join("languages");
    for path in markdown_under(&languages) {
        let within = relative(&path, &languages);
        let language = within
            .components()
            .next()
            .filter(|_| within.components().count() > 1)
            .map(|c| c.as_os_str().to_string_lossy().to_string());
        found.push(DiscoveredFile {
            rel_path: relative(&path, root),
            id_path: relative(&path, &instructions),
            abs_path: path,
            category: ArtifactCategory::Language,
            language,
        });
    }

    let scenarios = instructions.join("scenarios");
    for path in markdown_under(&scenarios) {
        found.push(DiscoveredFile {
            rel_path: relative(&path, root),
            id_path: relative(&path, &instructions),
            abs_path: path,
            category: ArtifactCategory::Scenario,
            language: None,
        });
    }

    let prompts = root.join(&layout.prompts_dir);
    for path in markdown_under(&prompts) {
        found.push(DiscoveredFile {
            rel_path: relative(&path, root),
            id_path: Path::new("prompts").join(relative(&path, &prompts)),
            abs_path: path,
            category: ArtifactCategory::Prompt,
            language: None,
        });
    }

    if include_overrides {
        let overrides = root.join(&layout.overrides_dir);
        for path in markdown_under(&overrides) {
            found.push(DiscoveredFile {
                rel_path: relative(&path, root),
                id_path: Path::new("overrides").join(relative(&path, &overrides)),
                abs_path: path,
                category: ArtifactCategory::Project,
                language: None,
            });
        }

        let project_file = root.join(&layout.project_file);
        if project_file.is_file() {
            let name = project_file
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("copilot-instructions.md"));
            found.push(DiscoveredFile {
                rel_path: relative(&project_file, root),
                id_path: Path::new("project").join(name),
                abs_path: project_file,
                category: ArtifactCategory::Project,
                language: None,
            });
        }
    }

    debug!(root = %root.display(), count = found.len(), "discovered markdown artifacts");
    found
}
