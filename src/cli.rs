//! CLI struct definitions for `copilot-resolver`.
//!
//! All clap-derived types live here. Dispatch lives in `lib.rs`.

use crate::core::artifact::ArtifactCategory;
use crate::core::config::DetectorKind;
use crate::core::context::{self, Context};
use crate::core::workspace::ROOT_ENV;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[clap(
    name = "copilot-resolver",
    version = env!("CARGO_PKG_VERSION"),
    about = "Locate, order and cross-check layered Copilot instruction artifacts for an editing context.",
    disable_version_flag = true
)]
pub(crate) struct Cli {
    /// Workspace root (default: nearest ancestor holding `.copilot/`).
    #[clap(long, global = true, env = ROOT_ENV)]
    pub root: Option<PathBuf>,
    /// Debug logging on stderr (`RUST_LOG` wins when set).
    #[clap(long, short = 'v', global = true)]
    pub verbose: bool,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum Format {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum ResolveFormat {
    Text,
    Json,
    /// One Markdown document, ready to hand to an assistant.
    Prompt,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum DetectorArg {
    Directive,
    None,
}

impl From<DetectorArg> for DetectorKind {
    fn from(arg: DetectorArg) -> Self {
        match arg {
            DetectorArg::Directive => DetectorKind::Directive,
            DetectorArg::None => DetectorKind::None,
        }
    }
}

/// Signals describing the editing context.
#[derive(clap::Args, Debug, Default)]
pub(crate) struct ContextArgs {
    /// Loose signals: `src/main.py`, `.cs`, `cicd-github`.
    pub signals: Vec<String>,
    /// File being edited (repeatable).
    #[clap(long = "file", short = 'f')]
    pub files: Vec<String>,
    /// Bare extension such as `.cs` (repeatable).
    #[clap(long = "ext", short = 'e')]
    pub extensions: Vec<String>,
    /// Scenario name such as `cicd-github` (repeatable).
    #[clap(long = "scenario", short = 's')]
    pub scenarios: Vec<String>,
    /// Framework such as `react` (repeatable).
    #[clap(long = "framework")]
    pub frameworks: Vec<String>,
    /// Add frameworks and scenarios detected from marker files in the root.
    #[clap(long)]
    pub detect: bool,
}

impl ContextArgs {
    pub fn build(&self, root: &Path) -> Context {
        let mut ctx = Context::new();
        for s in &self.signals {
            ctx = ctx.with_signal(s);
        }
        for f in &self.files {
            ctx = ctx.with_file(f);
        }
        for e in &self.extensions {
            ctx = ctx.with_extension(e);
        }
        for s in &self.scenarios {
            ctx = ctx.with_scenario(s);
        }
        for f in &self.frameworks {
            ctx = ctx.with_framework(f);
        }
        if self.detect {
            ctx = ctx.merge(context::detect(root));
        }
        ctx
    }
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Create the directory layout, config and an empty registry
    Init(InitCli),
    /// Import or refresh artifacts from an instruction library
    Import(ImportCli),
    /// List loaded artifacts
    List(ListCli),
    /// Show which artifacts apply to a context (unordered)
    Locate(LocateCli),
    /// Resolve a context: applicable artifacts in precedence order
    Resolve(ResolveCli),
    /// Detect conflicts between applicable artifacts
    Conflicts(ConflictsCli),
    /// Inspect or edit the version registry
    Registry(RegistryCli),
    /// Print an artifact, or one section with `<id>#<section>`
    Show(ShowCli),
    /// Read-only workspace health checks
    Validate(FormatCli),
    /// Print the version
    Version,
}

#[derive(clap::Args, Debug)]
pub(crate) struct FormatCli {
    #[clap(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,
}

#[derive(clap::Args, Debug)]
pub(crate) struct InitCli {
    /// Directory to initialize (defaults to the workspace root).
    #[clap(short, long)]
    pub dir: Option<PathBuf>,
    /// Overwrite existing files. The registry is always kept.
    #[clap(long)]
    pub force: bool,
    /// Show what would change without writing files.
    #[clap(long)]
    pub dry_run: bool,
    #[clap(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,
}

#[derive(clap::Args, Debug)]
pub(crate) struct ImportCli {
    /// Library root laid out as `copilot/instructions` and `copilot/prompts`.
    #[clap(long = "from")]
    pub from: PathBuf,
    /// Update artifacts that are already registered.
    #[clap(long)]
    pub refresh: bool,
    /// Overwrite locally edited or untracked files.
    #[clap(long)]
    pub force: bool,
    /// Version for artifacts without a frontmatter `version`.
    #[clap(long = "version")]
    pub version: Option<String>,
    #[clap(long)]
    pub dry_run: bool,
    #[clap(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,
}

#[derive(clap::Args, Debug)]
pub(crate) struct ListCli {
    /// Only this category (`project`, `language`, `scenario`, `prompt`).
    #[clap(long)]
    pub category: Option<ArtifactCategory>,
    #[clap(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,
}

#[derive(clap::Args, Debug)]
pub(crate) struct LocateCli {
    #[clap(flatten)]
    pub context: ContextArgs,
    #[clap(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,
}

#[derive(clap::Args, Debug)]
pub(crate) struct ResolveCli {
    #[clap(flatten)]
    pub context: ContextArgs,
    #[clap(long, value_enum, default_value_t = ResolveFormat::Text)]
    pub format: ResolveFormat,
    /// Token budget for `--format prompt` (cl100k tokens).
    #[clap(long)]
    pub budget: Option<usize>,
    /// Conflict detector (default from config).
    #[clap(long, value_enum)]
    pub detector: Option<DetectorArg>,
    /// Do not append detected conflicts to the conflict log.
    #[clap(long)]
    pub no_log: bool,
}

#[derive(clap::Args, Debug)]
pub(crate) struct ConflictsCli {
    #[clap(flatten)]
    pub context: ContextArgs,
    /// Conflict detector (default from config).
    #[clap(long, value_enum)]
    pub detector: Option<DetectorArg>,
    /// Print the conflict log instead of detecting.
    #[clap(long)]
    pub history: bool,
    /// Do not append detected conflicts to the conflict log.
    #[clap(long)]
    pub no_log: bool,
    #[clap(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,
}

#[derive(clap::Args, Debug)]
pub(crate) struct RegistryCli {
    #[clap(subcommand)]
    pub command: RegistryCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum RegistryCommand {
    /// Print registry entries
    Show {
        /// Only this id.
        id: Option<String>,
        #[clap(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Set the recorded version of a registered artifact
    Set {
        id: String,
        version: String,
        #[clap(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

#[derive(clap::Args, Debug)]
pub(crate) struct ShowCli {
    /// `<id>` or `<id>#<section>`.
    pub reference: String,
    #[clap(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,
}
