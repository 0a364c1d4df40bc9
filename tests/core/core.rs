use copilot_resolver::core::artifact::ArtifactCategory;
use copilot_resolver::core::config::{DetectorKind, ResolverConfig};
use copilot_resolver::core::context::{self, Context};
use copilot_resolver::core::docs;
use copilot_resolver::core::error::ResolverError;
use copilot_resolver::core::import::{ImportOptions, import_library};
use copilot_resolver::core::locator;
use copilot_resolver::core::registry::Registry;
use copilot_resolver::core::render;
use copilot_resolver::core::resolution::Resolver;
use copilot_resolver::core::scaffold::{ScaffoldOptions, scaffold_workspace};
use copilot_resolver::core::workspace::Workspace;
use copilot_resolver::plugins::conflicts::{ConflictLog, detector_for};
use copilot_resolver::resolve_in;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, content).expect("write");
}

/// A small library in the conventional layout.
fn library(root: &Path) {
    write(
        root,
        "copilot/instructions/languages/python/python.instructions.md",
        "---\nid: py-std\napplyTo: \"*.py\"\nversion: 2.0.0\n---\n# Python\n\n- Always use type hints.\n- Use 4 spaces.\n",
    );
    write(
        root,
        "copilot/instructions/languages/csharp/csharp.instructions.md",
        "---\nversion: 1.3.0\n---\n# C#\n\n## Naming\n\nPascalCase for public members.\n\n## Async\n\n- Never use async void.\n",
    );
    write(
        root,
        "copilot/instructions/scenarios/cicd/cicd-github.md",
        "---\napplyTo: \"cicd-github,.github/workflows/*.yml\"\nversion: 1.0.0\n---\n# GitHub Actions\n\n- Always pin action versions.\n",
    );
    write(
        root,
        "copilot/prompts/code-review.prompt.md",
        "---\napplyTo: \"**/*.py,**/*.cs\"\n---\n# Review\n\nReview the change.\n",
    );
    write(root, "copilot/prompts/README.md", "not an artifact");
}

fn imported_workspace() -> (tempfile::TempDir, tempfile::TempDir, Workspace, Registry) {
    let lib = tempdir().expect("lib");
    library(lib.path());
    let ws_dir = tempdir().expect("ws");
    scaffold_workspace(&ScaffoldOptions {
        target_dir: ws_dir.path().to_path_buf(),
        force: false,
        dry_run: false,
    })
    .expect("init");
    let ws = Workspace::open(ws_dir.path()).expect("open");
    let mut registry = ws.load_registry().expect("registry");
    import_library(
        &ws,
        &mut registry,
        &ImportOptions {
            source: lib.path().to_path_buf(),
            ..Default::default()
        },
    )
    .expect("import");
    registry.save(&ws.registry_path()).expect("save");
    (lib, ws_dir, ws, registry)
}

#[test]
fn init_import_resolve_pipeline() {
    let (_lib, ws_dir, ws, registry) = imported_workspace();
    write(
        ws_dir.path(),
        ".copilot/overrides/proj-py.md",
        "---\nid: proj-py\napplyTo: \"*.py\"\n---\n# Team Python\n\n- Never use type hints.\n",
    );

    let artifacts = ws.load_artifacts().expect("artifacts");
    assert_eq!(artifacts.len(), 5);
    assert_eq!(registry.len(), 4);

    let resolver = Resolver::new(&registry, detector_for(DetectorKind::Directive));
    let res = resolver.resolve(&artifacts, &Context::new().with_file("src/main.py"));
    assert_eq!(res.ids(), ["proj-py", "py-std", "prompts/code-review"]);
    assert_eq!(res.ordered[0].category, ArtifactCategory::Project);
    assert_eq!(res.ordered[1].version.as_ref().expect("version").as_str(), "2.0.0");

    assert_eq!(res.conflicts.len(), 1);
    assert_eq!(res.conflicts[0].first, "proj-py");
    assert_eq!(res.conflicts[0].second, "py-std");

    let log = ConflictLog::new(ws.conflict_log_path());
    log.append(&res.context, &res.conflicts).expect("log");
    assert_eq!(log.read_all().expect("read").len(), 1);
}

#[test]
fn scenario_and_extension_contexts() {
    let (_lib, _ws_dir, ws, registry) = imported_workspace();
    let artifacts = ws.load_artifacts().expect("artifacts");
    let resolver = Resolver::new(&registry, detector_for(DetectorKind::None));

    let ci = resolver.resolve(&artifacts, &Context::new().with_scenario("cicd-github"));
    assert_eq!(ci.ids(), ["scenarios/cicd/cicd-github"]);

    let cs = resolver.resolve(&artifacts, &Context::new().with_extension(".cs"));
    assert_eq!(
        cs.ids(),
        ["languages/csharp/csharp", "prompts/code-review"]
    );

    let workflow = resolver.resolve(
        &artifacts,
        &Context::new()
            .with_file(".github/workflows/build.yml")
            .with_file("Api/Program.cs"),
    );
    assert_eq!(
        workflow.ids(),
        [
            "languages/csharp/csharp",
            "scenarios/cicd/cicd-github",
            "prompts/code-review"
        ]
    );

    assert!(locator::locate(&artifacts, &Context::new()).is_empty());
    assert!(resolver.resolve(&artifacts, &Context::new().with_file("index.html")).is_empty());
}

#[test]
fn detected_context_and_batch_resolution() {
    let (_lib, ws_dir, ws, registry) = imported_workspace();
    write(ws_dir.path(), ".github/workflows/ci.yml", "on: push");
    let detected = context::detect(ws_dir.path());
    assert!(detected.scenarios.contains("cicd-github"));

    let artifacts = ws.load_artifacts().expect("artifacts");
    let resolver = Resolver::new(&registry, detector_for(DetectorKind::Directive));
    let contexts = vec![
        detected,
        Context::new().with_extension("py"),
        Context::new().with_extension("cs"),
    ];
    let batch = resolver.resolve_many(&artifacts, &contexts);
    let single: Vec<_> = contexts
        .iter()
        .map(|c| resolver.resolve(&artifacts, c))
        .collect();
    assert_eq!(batch, single);
}

#[test]
fn detected_language_selects_default_language_artifacts() {
    let ws_dir = tempdir().expect("ws");
    write(ws_dir.path(), "pyproject.toml", "[project]\nname = \"demo\"\n");
    write(
        ws_dir.path(),
        "copilot/instructions/languages/python/python.md",
        "# Python\n\n- Use type hints.\n",
    );
    write(
        ws_dir.path(),
        "copilot/instructions/languages/csharp/csharp.md",
        "# C#\n",
    );

    let detected = context::detect(ws_dir.path());
    assert!(detected.frameworks.contains("python"));
    let res = resolve_in(ws_dir.path(), &detected).expect("resolve");
    assert_eq!(res.ids(), ["languages/python/python"]);
}

#[test]
fn rendering_and_fragments() {
    let (_lib, _ws_dir, ws, registry) = imported_workspace();
    let artifacts = ws.load_artifacts().expect("artifacts");
    let resolver = Resolver::new(&registry, detector_for(DetectorKind::None));
    let res = resolver.resolve(&artifacts, &Context::new().with_extension(".cs"));

    let prompt = render::render(&res, &artifacts, None).expect("render");
    assert!(prompt.text.starts_with("# Copilot instructions"));
    assert!(prompt.text.contains("## languages/csharp/csharp (language)"));
    assert!(prompt.text.contains("Never use async void"));

    let section = docs::get_fragment(&artifacts, "languages/csharp/csharp#async").expect("fragment");
    assert_eq!(section.title, "Async");
    assert!(!section.content.contains("PascalCase"));
}

#[test]
fn config_selects_detector_and_layout() {
    let (_lib, ws_dir, _ws, _registry) = imported_workspace();
    write(
        ws_dir.path(),
        ".copilot/config.toml",
        "[conflicts]\ndetector = \"none\"\n",
    );
    write(
        ws_dir.path(),
        ".copilot/overrides/proj-py.md",
        "---\napplyTo: \"*.py\"\n---\n- Never use type hints.\n",
    );
    let res = resolve_in(ws_dir.path(), &Context::new().with_file("a.py")).expect("resolve");
    assert_eq!(res.ordered[0].id, "overrides/proj-py");
    assert!(res.conflicts.is_empty());

    let cfg = ResolverConfig::from_toml("[layout]\nprompts_dir = \"prompts\"\n").expect("cfg");
    assert_eq!(cfg.layout.prompts_dir, "prompts");
    assert!(ResolverConfig::from_toml("[layout]\nunknown = 1\n").is_err());
}

#[test]
fn duplicate_ids_and_bad_frontmatter_fail_loading() {
    let ws_dir = tempdir().expect("ws");
    write(ws_dir.path(), "copilot/prompts/a.md", "---\nid: same\n---\nA");
    write(ws_dir.path(), "copilot/prompts/b.md", "---\nid: same\n---\nB");
    let ws = Workspace::open(ws_dir.path()).expect("open");
    assert!(matches!(
        ws.load_artifacts(),
        Err(ResolverError::DuplicateArtifact { .. })
    ));

    fs::remove_file(ws_dir.path().join("copilot/prompts/b.md")).expect("rm");
    write(ws_dir.path(), "copilot/prompts/c.md", "---\napplyTo: \"{unclosed\"\n---\nC");
    let err = ws.load_artifacts().expect_err("bad pattern");
    assert!(err.to_string().contains("copilot/prompts/c.md"));
}
