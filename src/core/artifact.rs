//! Instruction artifacts: one Markdown file with optional YAML frontmatter.
//!
//! An artifact's category comes from where it lives in the layout (or an
//! explicit `category:` key). Its `applyTo` comes from frontmatter, falling
//! back to a category default so bare Markdown files still participate.

use crate::core::error::ResolverError;
use crate::core::glob::{ApplyTo, normalize_path, split_patterns};
use crate::core::version::Version;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Precedence bucket. Declaration order is precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactCategory {
    /// Project-specific overrides, always first.
    #[serde(alias = "project-specific")]
    Project,
    /// Language coding standards (`languages/{language}/*.md`).
    #[serde(alias = "language-specific")]
    Language,
    /// Scenario instructions such as CI/CD authoring.
    #[serde(alias = "scenario-based")]
    Scenario,
    /// General prompt templates.
    #[serde(alias = "general")]
    Prompt,
}

impl ArtifactCategory {
    pub const ALL: [ArtifactCategory; 4] = [
        ArtifactCategory::Project,
        ArtifactCategory::Language,
        ArtifactCategory::Scenario,
        ArtifactCategory::Prompt,
    ];

    /// Lower rank wins.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Project => 0,
            Self::Language => 1,
            Self::Scenario => 2,
            Self::Prompt => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Language => "language",
            Self::Scenario => "scenario",
            Self::Prompt => "prompt",
        }
    }
}

impl fmt::Display for ArtifactCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactCategory {
    type Err = ResolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "project" | "project-specific" | "override" => Ok(Self::Project),
            "language" | "language-specific" | "languages" => Ok(Self::Language),
            "scenario" | "scenario-based" | "scenarios" => Ok(Self::Scenario),
            "prompt" | "prompts" | "general" => Ok(Self::Prompt),
            other => Err(ResolverError::ValidationError(format!(
                "unknown artifact category '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Frontmatter {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    apply_to: Option<ApplyToField>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    version: Option<VersionField>,
    #[serde(default)]
    category: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ApplyToField {
    One(String),
    Many(Vec<String>),
}

impl ApplyToField {
    fn into_patterns(self) -> Vec<String> {
        match self {
            Self::One(s) => split_patterns(&s),
            Self::Many(list) => list.iter().flat_map(|s| split_patterns(s)).collect(),
        }
    }
}

// YAML reads `version: 1.10` as the float 1.1, so numbers are re-read
// from the raw frontmatter text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum VersionField {
    Text(String),
    Number(serde_yaml::Number),
}

impl VersionField {
    fn into_version(self, frontmatter: &str) -> Version {
        match self {
            Self::Text(s) => Version::parse(&s),
            Self::Number(n) => match raw_scalar(frontmatter, "version") {
                Some(raw) => Version::parse(&raw),
                None => Version::parse(&n.to_string()),
            },
        }
    }
}

/// Source text of a top-level `key: value` scalar, unquoted and without a
/// trailing comment.
fn raw_scalar(frontmatter: &str, key: &str) -> Option<String> {
    frontmatter.lines().find_map(|line| {
        let value = line.strip_prefix(key)?.trim_start().strip_prefix(':')?;
        let value = match value.find(" #") {
            Some(pos) => &value[..pos],
            None => value,
        };
        let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// Where an artifact came from when it was loaded.
#[derive(Debug, Clone)]
pub struct ArtifactSource<'a> {
    /// Path relative to the workspace root, used for display and registry.
    pub rel_path: &'a Path,
    /// Path relative to the category root, used to derive the id.
    pub id_path: &'a Path,
    pub category: ArtifactCategory,
    /// Language directory name for language artifacts.
    pub language: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstructionArtifact {
    pub id: String,
    pub path: PathBuf,
    pub category: ArtifactCategory,
    #[serde(rename = "applyTo")]
    pub apply_to: ApplyTo,
    pub description: Option<String>,
    pub declared_version: Option<Version>,
    pub checksum: String,
    #[serde(skip)]
    pub body: String,
}

impl InstructionArtifact {
    /// Parse an artifact from raw file content.
    pub fn parse(source: &ArtifactSource<'_>, raw: &str) -> Result<Self, ResolverError> {
        let (frontmatter, body) = split_frontmatter(raw);
        let fm_text = frontmatter.unwrap_or_default();
        let fm: Frontmatter = match frontmatter {
            Some(text) if !text.trim().is_empty() => serde_yaml::from_str(text)
                .map_err(|e| ResolverError::frontmatter(source.rel_path, e.to_string()))?,
            _ => Frontmatter::default(),
        };

        let category = match fm.category.as_deref() {
            Some(c) => c
                .parse::<ArtifactCategory>()
                .map_err(|e| ResolverError::frontmatter(source.rel_path, e.to_string()))?,
            None => source.category,
        };

        let id = fm
            .id
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| derive_id(source.id_path));

        let patterns = match fm.apply_to {
            Some(field) => field.into_patterns(),
            None => default_patterns(category, source.id_path, source.language),
        };
        let apply_to = ApplyTo::from_patterns(&patterns).map_err(|e| {
            ResolverError::frontmatter(source.rel_path, format!("applyTo: {}", e))
        })?;

        Ok(Self {
            id,
            path: source.rel_path.to_path_buf(),
            category,
            apply_to,
            description: fm.description,
            declared_version: fm.version.map(|v| v.into_version(fm_text)),
            checksum: checksum(raw.as_bytes()),
            body: body.trim().to_string(),
        })
    }

    /// Test and library helper: build an artifact from explicit parts.
    pub fn from_parts(
        id: &str,
        category: ArtifactCategory,
        apply_to: &str,
        body: &str,
    ) -> Result<Self, ResolverError> {
        Ok(Self {
            id: id.to_string(),
            path: PathBuf::from(format!("{}.md", id)),
            category,
            apply_to: ApplyTo::parse(apply_to)?,
            description: None,
            declared_version: None,
            checksum: checksum(body.as_bytes()),
            body: body.to_string(),
        })
    }

    pub fn title(&self) -> String {
        self.body
            .lines()
            .find_map(|l| l.strip_prefix("# "))
            .map(|t| t.trim().to_string())
            .unwrap_or_else(|| self.id.clone())
    }
}

pub fn checksum(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Returns (frontmatter, body). Frontmatter must start on the first line.
fn split_frontmatter(raw: &str) -> (Option<&str>, &str) {
    let content = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let Some(rest) = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
    else {
        return (None, content);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let fm = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return (Some(fm), body);
        }
        offset += line.len();
    }
    (None, content)
}

/// `languages/python/python.instructions.md` -> `languages/python/python`
pub fn derive_id(id_path: &Path) -> String {
    let mut id = normalize_path(&id_path.to_string_lossy());
    for suffix in [".md", ".instructions", ".prompt"] {
        if let Some(stripped) = id.strip_suffix(suffix) {
            id = stripped.to_string();
        }
    }
    id
}

fn file_stem(id_path: &Path) -> String {
    let id = derive_id(id_path);
    id.rsplit('/').next().unwrap_or(&id).to_string()
}

fn default_patterns(
    category: ArtifactCategory,
    id_path: &Path,
    language: Option<&str>,
) -> Vec<String> {
    match category {
        ArtifactCategory::Project => vec!["**".to_string()],
        ArtifactCategory::Language => {
            let language = language
                .map(str::to_string)
                .unwrap_or_else(|| file_stem(id_path));
            language_patterns(&language)
        }
        ArtifactCategory::Scenario | ArtifactCategory::Prompt => vec![file_stem(id_path)],
    }
}

/// Default `applyTo` for a language directory: its file patterns plus the
/// names a detected context uses for it (`csharp` is also `dotnet`).
pub fn language_patterns(language: &str) -> Vec<String> {
    let language = language.to_lowercase();
    let (exts, aliases): (&[&str], &[&str]) = match language.as_str() {
        "csharp" | "c#" | "dotnet" => (&["cs", "csx"], &["csharp", "dotnet"]),
        "python" => (&["py", "pyi", "ipynb"], &["python"]),
        "typescript" => (&["ts", "tsx", "mts", "cts"], &["typescript"]),
        "javascript" => (&["js", "jsx", "mjs", "cjs"], &["javascript", "node"]),
        "react" => (&["tsx", "jsx"], &["react"]),
        "bicep" => (&["bicep", "bicepparam"], &["bicep"]),
        "terraform" => (&["tf", "tfvars"], &["terraform"]),
        "rust" => (&["rs"], &["rust"]),
        "go" => (&["go"], &["go"]),
        "java" => (&["java"], &["java"]),
        "powershell" => (&["ps1", "psm1"], &["powershell"]),
        "yaml" => (&["yml", "yaml"], &["yaml"]),
        other => return vec![format!("**/*.{}", other), other.to_string()],
    };
    exts.iter()
        .map(|e| format!("**/*.{}", e))
        .chain(aliases.iter().map(|a| a.to_string()))
        .collect()
}

/// A loaded set of artifacts, sorted by path and unique by id.
#[derive(Debug, Clone, Default)]
pub struct ArtifactSet {
    artifacts: Vec<InstructionArtifact>,
}

impl ArtifactSet {
    pub fn new(mut artifacts: Vec<InstructionArtifact>) -> Result<Self, ResolverError> {
        artifacts.sort_by(|a, b| a.path.cmp(&b.path));
        let mut seen: rustc_hash::FxHashMap<&str, &Path> = rustc_hash::FxHashMap::default();
        for artifact in &artifacts {
            if let Some(first) = seen.insert(&artifact.id, &artifact.path) {
                return Err(ResolverError::DuplicateArtifact {
                    id: artifact.id.clone(),
                    first: first.to_path_buf(),
                    second: artifact.path.clone(),
                });
            }
        }
        Ok(Self { artifacts })
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstructionArtifact> {
        self.artifacts.iter()
    }

    pub fn get(&self, id: &str) -> Option<&InstructionArtifact> {
        self.artifacts.iter().find(|a| a.id == id)
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source<'a>(
        path: &'a Path,
        category: ArtifactCategory,
        language: Option<&'a str>,
    ) -> ArtifactSource<'a> {
        ArtifactSource {
            rel_path: path,
            id_path: path,
            category,
            language,
        }
    }

    #[test]
    fn category_order_is_precedence_order() {
        let mut cats = vec![
            ArtifactCategory::Prompt,
            ArtifactCategory::Language,
            ArtifactCategory::Project,
            ArtifactCategory::Scenario,
        ];
        cats.sort();
        assert_eq!(cats, ArtifactCategory::ALL.to_vec());
        assert_eq!(
            "project-specific".parse::<ArtifactCategory>().unwrap(),
            ArtifactCategory::Project
        );
        assert!("misc".parse::<ArtifactCategory>().is_err());
    }

    #[test]
    fn frontmatter_fields_are_read() {
        let raw = "---\nid: py-std\napplyTo: \"**/*.py,**/*.pyi\"\ndescription: Python standards\nversion: 1.2\n---\n# Python\n\nUse type hints.\n";
        let path = PathBuf::from("languages/python/standards.md");
        let artifact = InstructionArtifact::parse(
            &source(&path, ArtifactCategory::Language, Some("python")),
            raw,
        )
        .unwrap();

        assert_eq!(artifact.id, "py-std");
        assert_eq!(artifact.apply_to.display(), "**/*.py,**/*.pyi");
        assert_eq!(artifact.description.as_deref(), Some("Python standards"));
        assert_eq!(artifact.declared_version.as_ref().unwrap().as_str(), "1.2");
        assert_eq!(artifact.body, "# Python\n\nUse type hints.");
        assert_eq!(artifact.title(), "Python");
    }

    #[test]
    fn unquoted_versions_keep_their_text() {
        let path = PathBuf::from("prompts/a.md");
        let parse = |raw: &str| {
            InstructionArtifact::parse(&source(&path, ArtifactCategory::Prompt, None), raw)
                .unwrap()
                .declared_version
                .unwrap()
        };
        let ten = parse("---\nversion: 1.10\n---\nbody");
        let nine = parse("---\nversion: 1.9 # stable\n---\nbody");
        assert_eq!(ten.as_str(), "1.10");
        assert_eq!(nine.as_str(), "1.9");
        assert!(ten > nine);
        assert_eq!(parse("---\nversion: '2.0'\n---\nbody").as_str(), "2.0");
        assert_eq!(parse("---\nversion: 3\n---\nbody").as_str(), "3");
    }

    #[test]
    fn language_defaults_include_detected_names() {
        assert_eq!(
            language_patterns("python"),
            ["**/*.py", "**/*.pyi", "**/*.ipynb", "python"]
        );
        assert!(language_patterns("CSharp").contains(&"dotnet".to_string()));
        assert_eq!(language_patterns("elixir"), ["**/*.elixir", "elixir"]);
    }

    #[test]
    fn apply_to_may_be_a_list() {
        let raw = "---\napplyTo:\n  - \"**/*.ts\"\n  - \"**/*.tsx\"\n---\nbody";
        let path = PathBuf::from("scenarios/web.md");
        let artifact =
            InstructionArtifact::parse(&source(&path, ArtifactCategory::Scenario, None), raw)
                .unwrap();
        assert!(artifact.apply_to.matches("src/App.tsx"));
    }

    #[test]
    fn defaults_without_frontmatter() {
        let path = PathBuf::from("languages/csharp/csharp.instructions.md");
        let lang = InstructionArtifact::parse(
            &source(&path, ArtifactCategory::Language, Some("csharp")),
            "# C#",
        )
        .unwrap();
        assert_eq!(lang.id, "languages/csharp/csharp");
        assert!(lang.apply_to.matches("Api/Program.cs"));

        let path = PathBuf::from("scenarios/cicd/cicd-github.md");
        let scenario =
            InstructionArtifact::parse(&source(&path, ArtifactCategory::Scenario, None), "x")
                .unwrap();
        assert!(scenario.apply_to.matches("cicd-github"));
        assert!(!scenario.apply_to.matches("cicd-azure-devops"));

        let path = PathBuf::from("overrides/team.md");
        let project =
            InstructionArtifact::parse(&source(&path, ArtifactCategory::Project, None), "x")
                .unwrap();
        assert!(project.apply_to.matches("anything/at/all.rs"));
    }

    #[test]
    fn category_key_overrides_directory() {
        let raw = "---\ncategory: project-specific\n---\nbody";
        let path = PathBuf::from("prompts/pin.md");
        let artifact =
            InstructionArtifact::parse(&source(&path, ArtifactCategory::Prompt, None), raw)
                .unwrap();
        assert_eq!(artifact.category, ArtifactCategory::Project);
    }

    #[test]
    fn malformed_frontmatter_names_file() {
        let raw = "---\napplyTo: [unclosed\n---\nbody";
        let path = PathBuf::from("prompts/broken.md");
        let err = InstructionArtifact::parse(&source(&path, ArtifactCategory::Prompt, None), raw)
            .unwrap_err();
        assert!(err.to_string().contains("prompts/broken.md"));
    }

    #[test]
    fn unterminated_frontmatter_is_body() {
        let (fm, body) = split_frontmatter("---\nnot closed");
        assert!(fm.is_none());
        assert_eq!(body, "---\nnot closed");
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let a = InstructionArtifact::from_parts("x", ArtifactCategory::Prompt, "x", "").unwrap();
        let mut b = a.clone();
        b.path = PathBuf::from("other.md");
        let err = ArtifactSet::new(vec![a, b]).unwrap_err();
        assert!(matches!(err, ResolverError::DuplicateArtifact { .. }));
    }
}
