use regex::Regex;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

fn exec(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_copilot-resolver"))
        .current_dir(root)
        .env_remove("COPILOT_RESOLVER_ROOT")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .args(args)
        .output()
        .expect("failed to execute copilot-resolver")
}

fn run_ok(root: &Path, args: &[&str]) -> String {
    let output = exec(root, args);
    assert!(
        output.status.success(),
        "copilot-resolver {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn run_json(root: &Path, args: &[&str]) -> Value {
    let out = run_ok(root, args);
    serde_json::from_str(&out).unwrap_or_else(|e| panic!("invalid JSON from {:?}: {}\n{}", args, e, out))
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, content).expect("write");
}

fn setup() -> (tempfile::TempDir, tempfile::TempDir) {
    let lib = tempdir().expect("lib");
    write(
        lib.path(),
        "copilot/instructions/languages/python/python.instructions.md",
        "---\nid: py-std\napplyTo: \"*.py\"\nversion: 1.0.0\n---\n# Python\n\n- Always use f-strings.\n",
    );
    write(
        lib.path(),
        "copilot/instructions/scenarios/cicd/cicd-github.md",
        "# GitHub Actions\n\n- Always pin actions to a SHA.\n",
    );
    let ws = tempdir().expect("ws");
    run_ok(ws.path(), &["init"]);
    (lib, ws)
}

#[test]
fn version_prints_package_version() {
    let tmp = tempdir().expect("tmp");
    let out = run_ok(tmp.path(), &["version"]);
    assert_eq!(out.trim(), format!("v{}", env!("CARGO_PKG_VERSION")));
}

#[test]
fn help_lists_every_command() {
    let tmp = tempdir().expect("tmp");
    let help = run_ok(tmp.path(), &["--help"]);
    for command in [
        "init",
        "import",
        "list",
        "locate",
        "resolve",
        "conflicts",
        "registry",
        "show",
        "validate",
        "version",
    ] {
        let re = Regex::new(&format!(r"(?m)^\s+{}\s+", regex::escape(command)))
            .expect("valid help regex");
        assert!(re.is_match(&help), "--help missing command: {}", command);
    }
}

#[test]
fn json_envelope_shape() {
    let (lib, ws) = setup();
    let lib_path = lib.path().to_string_lossy().to_string();
    let import = run_json(ws.path(), &["import", "--from", &lib_path, "--format", "json"]);
    assert_eq!(import["envelope_version"], "1.0.0");
    assert_eq!(import["cmd"], "import");
    assert_eq!(import["status"], "ok");
    assert!(import["event_id"].as_str().is_some_and(|s| s.len() == 26));
    assert!(import["ts"].as_str().is_some_and(|s| s.ends_with('Z')));
    assert_eq!(import["created"].as_array().map(Vec::len), Some(2));
}

#[test]
fn resolve_orders_override_first() {
    let (lib, ws) = setup();
    let lib_path = lib.path().to_string_lossy().to_string();
    run_ok(ws.path(), &["import", "--from", &lib_path]);
    write(
        ws.path(),
        ".copilot/overrides/proj-py.md",
        "---\nid: proj-py\napplyTo: \"*.py\"\n---\n- Never use f-strings.\n",
    );

    let res = run_json(ws.path(), &["resolve", "main.py", "--format", "json"]);
    let ids: Vec<&str> = res["ordered"]
        .as_array()
        .expect("ordered")
        .iter()
        .filter_map(|a| a["id"].as_str())
        .collect();
    assert_eq!(ids, ["proj-py", "py-std"]);
    assert_eq!(res["ordered"][1]["version"], "1.0.0");
    assert_eq!(res["conflicts"][0]["first"], "proj-py");

    let log = fs::read_to_string(ws.path().join(".copilot/conflicts.jsonl")).expect("log");
    assert_eq!(log.lines().count(), 1);

    let prompt = run_ok(ws.path(), &["resolve", "main.py", "--format", "prompt", "--no-log"]);
    let proj = prompt.find("## proj-py (project)").expect("project section");
    let lang = prompt.find("## py-std (language)").expect("language section");
    assert!(proj < lang);
    let log = fs::read_to_string(ws.path().join(".copilot/conflicts.jsonl")).expect("log");
    assert_eq!(log.lines().count(), 1);
}

#[test]
fn empty_context_is_not_an_error() {
    let (_lib, ws) = setup();
    let res = run_json(ws.path(), &["resolve", "--format", "json"]);
    assert_eq!(res["ordered"].as_array().map(Vec::len), Some(0));
    let located = run_json(ws.path(), &["locate", "--format", "json"]);
    assert_eq!(located["artifacts"].as_array().map(Vec::len), Some(0));
}

#[test]
fn scenario_flag_and_registry_set() {
    let (lib, ws) = setup();
    let lib_path = lib.path().to_string_lossy().to_string();
    run_ok(ws.path(), &["import", "--from", &lib_path, "--version", "0.5.0"]);

    let located = run_json(
        ws.path(),
        &["locate", "--scenario", "cicd-github", "--format", "json"],
    );
    assert_eq!(located["artifacts"][0], "scenarios/cicd/cicd-github");

    let shown = run_json(
        ws.path(),
        &["registry", "show", "scenarios/cicd/cicd-github", "--format", "json"],
    );
    assert_eq!(
        shown["artifacts"]["scenarios/cicd/cicd-github"]["version"],
        "0.5.0"
    );

    run_ok(ws.path(), &["registry", "set", "scenarios/cicd/cicd-github", "0.6.0"]);
    let shown = run_json(ws.path(), &["registry", "show", "--format", "json"]);
    assert_eq!(
        shown["artifacts"]["scenarios/cicd/cicd-github"]["version"],
        "0.6.0"
    );

    let missing = exec(ws.path(), &["registry", "set", "nope", "1.0"]);
    assert!(!missing.status.success());
    assert!(String::from_utf8_lossy(&missing.stderr).starts_with("error:"));
}

#[test]
fn validate_fails_on_missing_registered_file() {
    let (lib, ws) = setup();
    let lib_path = lib.path().to_string_lossy().to_string();
    run_ok(ws.path(), &["import", "--from", &lib_path]);
    let ok = run_json(ws.path(), &["validate", "--format", "json"]);
    assert_eq!(ok["failed"], 0);

    fs::remove_file(
        ws.path()
            .join("copilot/instructions/languages/python/python.instructions.md"),
    )
    .expect("rm");
    let failed = exec(ws.path(), &["validate"]);
    assert!(!failed.status.success());
    assert!(String::from_utf8_lossy(&failed.stdout).contains("[FAIL] Registry files"));
}

#[test]
fn show_prints_a_section_with_hash() {
    let (lib, ws) = setup();
    let lib_path = lib.path().to_string_lossy().to_string();
    run_ok(ws.path(), &["import", "--from", &lib_path]);
    let shown = run_json(ws.path(), &["show", "py-std", "--format", "json"]);
    assert_eq!(shown["title"], "Python");
    assert_eq!(shown["hash"].as_str().map(str::len), Some(64));

    let missing = exec(ws.path(), &["show", "py-std#nope"]);
    assert!(!missing.status.success());
}

#[test]
fn root_flag_finds_workspace_from_elsewhere() {
    let (lib, ws) = setup();
    let lib_path = lib.path().to_string_lossy().to_string();
    let ws_path = ws.path().to_string_lossy().to_string();
    let elsewhere = tempdir().expect("elsewhere");
    run_ok(
        elsewhere.path(),
        &["--root", &ws_path, "import", "--from", &lib_path],
    );
    let listed = run_json(
        elsewhere.path(),
        &["--root", &ws_path, "list", "--format", "json"],
    );
    assert_eq!(listed["count"], 2);

    let nested = ws.path().join("src/deep");
    fs::create_dir_all(&nested).expect("mkdir");
    let listed = run_json(&nested, &["list", "--format", "json"]);
    assert_eq!(listed["count"], 2);
}
