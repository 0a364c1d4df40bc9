//! copilot-resolver: layered instruction resolution for AI coding assistants.
//!
//! An instruction library is a tree of Markdown artifacts: language coding
//! standards, scenario guidance (CI/CD, infrastructure) and prompt
//! templates, plus project-specific overrides. For one editing context this
//! crate answers three questions:
//!
//! 1. Which artifacts apply? ([`core::locator`], `applyTo` globs)
//! 2. In what order? ([`core::precedence`]: project > language > scenario >
//!    prompt, newer registry version first, stable)
//! 3. Do any of them contradict each other? ([`plugins::conflicts`])
//!
//! The version registry (`.copilot/registry.json`) is loaded once and passed
//! explicitly; nothing is global.
//!
//! # Examples
//!
//! ```bash
//! copilot-resolver init
//! copilot-resolver import --from ../instruction-library
//! copilot-resolver resolve src/api/Program.cs --scenario cicd-github
//! copilot-resolver resolve --ext .py --format prompt --budget 4000
//! copilot-resolver conflicts --detect
//! copilot-resolver validate
//! ```
//!
//! # Crate Structure
//!
//! - [`core`]: artifacts, context, registry, locate/order/resolve, import
//! - [`plugins`]: conflict detectors and the workspace doctor

mod cli;
pub mod core;
pub mod plugins;

use crate::cli::{Cli, Command, Format, RegistryCommand, ResolveFormat};
use crate::core::artifact::ArtifactSet;
use crate::core::context::Context;
use crate::core::error::ResolverError;
use crate::core::import::{self, ImportOptions};
use crate::core::registry::Registry;
use crate::core::resolution::{Resolution, Resolver};
use crate::core::scaffold::{self, ScaffoldOptions};
use crate::core::version::Version;
use crate::core::workspace::{self, Workspace};
use crate::core::{docs, locator, output, render, time};
use crate::plugins::conflicts::{self, ConflictLog};
use crate::plugins::doctor;
use clap::Parser;
use colored::Colorize;
use serde_json::json;
use std::path::PathBuf;
use tracing::debug;

fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "warn" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn print_json(cmd: &str, payload: serde_json::Value) -> Result<(), ResolverError> {
    let envelope = time::command_envelope(cmd, "ok", payload);
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

fn workspace_root(cli_root: Option<PathBuf>) -> Result<PathBuf, ResolverError> {
    match cli_root {
        Some(root) => Ok(root),
        None => Ok(workspace::find_root(&std::env::current_dir()?)),
    }
}

pub fn run() -> Result<(), ResolverError> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let root = workspace_root(cli.root)?;
    debug!(root = %root.display(), "workspace root");

    match cli.command {
        Command::Version => {
            println!("v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::Init(init) => {
            let opts = ScaffoldOptions {
                target_dir: init.dir.unwrap_or(root),
                force: init.force,
                dry_run: init.dry_run,
            };
            let steps = scaffold::scaffold_workspace(&opts)?;
            match init.format {
                Format::Json => print_json(
                    "init",
                    json!({ "target_dir": opts.target_dir, "dry_run": opts.dry_run, "steps": steps }),
                ),
                Format::Text => {
                    println!(
                        "{} {}",
                        "Initialized".green().bold(),
                        opts.target_dir.display()
                    );
                    for step in &steps {
                        let action = serde_json::to_value(step.action)?;
                        println!(
                            "  {:<12} {}",
                            action.as_str().unwrap_or_default(),
                            step.path.display()
                        );
                    }
                    Ok(())
                }
            }
        }
        Command::Import(args) => {
            let ws = Workspace::open(&root)?;
            let mut registry = ws.load_registry()?;
            let opts = ImportOptions {
                source: args.from,
                refresh: args.refresh,
                force: args.force,
                version: args.version.as_deref().map(Version::parse),
                dry_run: args.dry_run,
            };
            let report = import::import_library(&ws, &mut registry, &opts)?;
            if report.changed() {
                registry.save(&ws.registry_path())?;
            }
            match args.format {
                Format::Json => print_json("import", serde_json::to_value(&report)?),
                Format::Text => {
                    let prefix = if report.dry_run { "(dry run) " } else { "" };
                    println!(
                        "{}{} created, {} refreshed, {} skipped from {}",
                        prefix,
                        report.created.len(),
                        report.refreshed.len(),
                        report.skipped.len(),
                        report.source
                    );
                    for id in &report.created {
                        println!("  {} {}", "+".green(), id);
                    }
                    for r in &report.refreshed {
                        println!(
                            "  {} {} {} -> {}",
                            "~".cyan(),
                            r.id,
                            r.from.as_str(),
                            r.to.as_str()
                        );
                    }
                    for s in &report.skipped {
                        println!("  {} {} ({})", "=".dimmed(), s.id, s.reason);
                    }
                    Ok(())
                }
            }
        }
        Command::List(args) => {
            let ws = Workspace::open(&root)?;
            let artifacts = ws.load_artifacts()?;
            let registry = ws.load_registry()?;
            let listed: Vec<_> = artifacts
                .iter()
                .filter(|a| args.category.is_none_or(|c| a.category == c))
                .collect();
            match args.format {
                Format::Json => {
                    let items: Vec<_> = listed
                        .iter()
                        .map(|a| {
                            json!({
                                "id": a.id,
                                "category": a.category,
                                "path": a.path,
                                "applyTo": a.apply_to,
                                "description": a.description,
                                "version": registry.version_of(&a.id),
                            })
                        })
                        .collect();
                    print_json("list", json!({ "count": items.len(), "artifacts": items }))
                }
                Format::Text => {
                    for a in &listed {
                        let version = registry
                            .version_of(&a.id)
                            .map(|v| v.as_str().to_string())
                            .unwrap_or_else(|| "-".to_string());
                        println!(
                            "{:<9} {:<40} {:<10} {}",
                            a.category.as_str(),
                            a.id,
                            version,
                            output::compact_line(&a.apply_to.display(), 50).dimmed()
                        );
                    }
                    println!("{}", output::plural(listed.len(), "artifact", "artifacts"));
                    Ok(())
                }
            }
        }
        Command::Locate(args) => {
            let ws = Workspace::open(&root)?;
            let artifacts = ws.load_artifacts()?;
            let context = args.context.build(&ws.root);
            let found = locator::locate(&artifacts, &context);
            match args.format {
                Format::Json => {
                    let ids: Vec<_> = found.iter().map(|a| a.id.as_str()).collect();
                    print_json("locate", json!({ "context": context, "artifacts": ids }))
                }
                Format::Text => {
                    println!("{} {}", "Context:".bold(), context.describe());
                    if found.is_empty() {
                        println!("  (no applicable artifacts)");
                    }
                    for a in &found {
                        println!("  {:<9} {}", a.category.as_str(), a.id);
                    }
                    Ok(())
                }
            }
        }
        Command::Resolve(args) => {
            let ws = Workspace::open(&root)?;
            let artifacts = ws.load_artifacts()?;
            let registry = ws.load_registry()?;
            let context = args.context.build(&ws.root);
            let detector = args
                .detector
                .map(Into::into)
                .unwrap_or(ws.config.conflicts.detector);
            let resolver = Resolver::new(&registry, conflicts::detector_for(detector));
            let resolution = resolver.resolve(&artifacts, &context);
            log_conflicts(&ws, &resolution, args.no_log)?;

            match args.format {
                ResolveFormat::Json => print_json("resolve", serde_json::to_value(&resolution)?),
                ResolveFormat::Prompt => {
                    let budget = args.budget.or(ws.config.render.token_budget);
                    let rendered = render::render(&resolution, &artifacts, budget)?;
                    println!("{}", rendered.text);
                    if !rendered.skipped.is_empty() {
                        eprintln!(
                            "{} over budget, left out: {}",
                            "warning:".yellow().bold(),
                            rendered.skipped.join(", ")
                        );
                    }
                    Ok(())
                }
                ResolveFormat::Text => {
                    print_resolution(&resolution);
                    Ok(())
                }
            }
        }
        Command::Conflicts(args) => {
            let ws = Workspace::open(&root)?;
            if args.history {
                let events = ConflictLog::new(ws.conflict_log_path()).read_all()?;
                return match args.format {
                    Format::Json => print_json(
                        "conflicts",
                        json!({ "count": events.len(), "events": events }),
                    ),
                    Format::Text => {
                        for e in &events {
                            println!(
                                "{} [{}] {}",
                                e.ts.dimmed(),
                                e.context,
                                e.conflict.description
                            );
                        }
                        println!("{}", output::plural(events.len(), "event", "events"));
                        Ok(())
                    }
                };
            }

            let artifacts = ws.load_artifacts()?;
            let registry = ws.load_registry()?;
            let context = args.context.build(&ws.root);
            let detector = args
                .detector
                .map(Into::into)
                .unwrap_or(ws.config.conflicts.detector);
            let resolver = Resolver::new(&registry, conflicts::detector_for(detector));
            let resolution = resolver.resolve(&artifacts, &context);
            let logged = log_conflicts(&ws, &resolution, args.no_log)?;
            match args.format {
                Format::Json => print_json(
                    "conflicts",
                    json!({
                        "context": resolution.context,
                        "detector": resolver.detector_name(),
                        "conflicts": resolution.conflicts,
                        "logged": logged,
                    }),
                ),
                Format::Text => {
                    print_conflicts(&resolution);
                    Ok(())
                }
            }
        }
        Command::Registry(reg) => {
            let ws = Workspace::open(&root)?;
            match reg.command {
                RegistryCommand::Show { id, format } => {
                    let registry = ws.load_registry()?;
                    show_registry(&registry, id.as_deref(), format)
                }
                RegistryCommand::Set {
                    id,
                    version,
                    format,
                } => {
                    let mut registry = ws.load_registry()?;
                    let version = Version::parse(&version);
                    let previous = registry.set_version(&id, version.clone())?;
                    registry.save(&ws.registry_path())?;
                    match format {
                        Format::Json => print_json(
                            "registry.set",
                            json!({ "id": id, "from": previous, "to": version }),
                        ),
                        Format::Text => {
                            println!("{} {} -> {}", id, previous.as_str(), version.as_str());
                            Ok(())
                        }
                    }
                }
            }
        }
        Command::Show(args) => {
            let ws = Workspace::open(&root)?;
            let artifacts: ArtifactSet = ws.load_artifacts()?;
            let fragment = docs::get_fragment(&artifacts, &args.reference)?;
            match args.format {
                Format::Json => print_json("show", serde_json::to_value(&fragment)?),
                Format::Text => {
                    println!("{}", fragment.content);
                    println!("\n{} sha256:{}", fragment.r#ref.dimmed(), fragment.hash.dimmed());
                    Ok(())
                }
            }
        }
        Command::Validate(args) => {
            let format = match args.format {
                Format::Json => "json",
                Format::Text => "text",
            };
            doctor::run_validate_cli(&root, format)
        }
    }
}

fn log_conflicts(
    ws: &Workspace,
    resolution: &Resolution,
    no_log: bool,
) -> Result<usize, ResolverError> {
    if no_log || !ws.config.conflicts.log {
        return Ok(0);
    }
    ConflictLog::new(ws.conflict_log_path()).append(&resolution.context, &resolution.conflicts)
}

fn print_resolution(resolution: &Resolution) {
    println!("{} {}", "Context:".bold(), resolution.context.describe());
    if resolution.is_empty() {
        println!("  (no applicable artifacts)");
        return;
    }
    for (i, a) in resolution.ordered.iter().enumerate() {
        let version = a
            .version
            .as_ref()
            .map(|v| v.as_str().to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:>2}. {:<9} {:<40} {}",
            i + 1,
            a.category.as_str().cyan(),
            a.id,
            version.dimmed()
        );
    }
    if !resolution.conflicts.is_empty() {
        println!();
        print_conflicts(resolution);
    }
}

fn print_conflicts(resolution: &Resolution) {
    if resolution.conflicts.is_empty() {
        println!("{}", "No conflicts detected".green());
        return;
    }
    println!(
        "{}",
        output::plural(resolution.conflicts.len(), "conflict", "conflicts")
            .yellow()
            .bold()
    );
    for c in &resolution.conflicts {
        println!(
            "  {} {} (winner: {})",
            "!".yellow(),
            output::compact_line(&c.description, 100),
            c.first
        );
    }
}

fn show_registry(registry: &Registry, id: Option<&str>, format: Format) -> Result<(), ResolverError> {
    let entries: Vec<_> = registry
        .iter()
        .filter(|(k, _)| id.is_none_or(|want| k.as_str() == want))
        .collect();
    if let Some(want) = id
        && entries.is_empty()
    {
        return Err(ResolverError::NotFound(format!("registry entry '{}'", want)));
    }
    match format {
        Format::Json => {
            let mut map = serde_json::Map::new();
            for (k, e) in &entries {
                map.insert(k.to_string(), serde_json::to_value(e)?);
            }
            print_json(
                "registry.show",
                json!({ "schema_version": registry.schema_version, "artifacts": map }),
            )
        }
        Format::Text => {
            for (k, e) in &entries {
                println!(
                    "{:<40} {:<10} {}",
                    k,
                    e.version.as_str(),
                    e.path.display().to_string().dimmed()
                );
            }
            println!("{}", output::plural(entries.len(), "entry", "entries"));
            Ok(())
        }
    }
}

/// Library entry point for callers that already have a context.
pub fn resolve_in(root: &std::path::Path, context: &Context) -> Result<Resolution, ResolverError> {
    let ws = Workspace::open(root)?;
    let artifacts = ws.load_artifacts()?;
    let registry = ws.load_registry()?;
    let resolver = Resolver::new(&registry, conflicts::detector_for(ws.config.conflicts.detector));
    Ok(resolver.resolve(&artifacts, context))
}
