//! Integration tests for the command-line interface
//!
//! Every test runs the binary inside a temporary working directory, since the
//! default target path is relative to it.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const FRAGMENT: &str =
    ".preInstructions([ComputeBudgetProgram.setComputeUnitLimit({ units: 400_000 })])";

const SOURCE: &str = r#"await program.methods
          .submitSignature(nonce, Buffer.from(signature))
          .accounts({
            relayer: relayer.publicKey,
          })
          .signers([relayer])
          .rpc();
"#;

fn setup_workspace(contents: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("bridge1024.ts"), contents).unwrap();
    dir
}

fn splicer(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_callchain-splicer"))
        .current_dir(cwd)
        .env("NO_COLOR", "1")
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn test_help() {
    let dir = TempDir::new().unwrap();
    let output = splicer(dir.path(), &["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Insert a fixed fragment"));
}

#[test]
fn test_no_arguments_rewrites_default_target() {
    let workspace = setup_workspace(SOURCE);
    let output = splicer(workspace.path(), &[]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim_end(),
        "Added compute budget to all submitSignature calls"
    );

    let content = fs::read_to_string(workspace.path().join("bridge1024.ts")).unwrap();
    assert!(content.contains(&format!("          }})\n          {FRAGMENT}\n          .signers")));
}

#[test]
fn test_rerun_is_idempotent() {
    let workspace = setup_workspace(SOURCE);

    assert!(splicer(workspace.path(), &[]).status.success());
    let first = fs::read_to_string(workspace.path().join("bridge1024.ts")).unwrap();

    assert!(splicer(workspace.path(), &[]).status.success());
    let second = fs::read_to_string(workspace.path().join("bridge1024.ts")).unwrap();

    assert_eq!(first, second);
    assert_eq!(second.matches(FRAGMENT).count(), 1);
}

#[test]
fn test_allow_duplicates() {
    let workspace = setup_workspace(SOURCE);

    assert!(splicer(workspace.path(), &["--allow-duplicates"]).status.success());
    assert!(splicer(workspace.path(), &["--allow-duplicates"]).status.success());

    let content = fs::read_to_string(workspace.path().join("bridge1024.ts")).unwrap();
    assert_eq!(content.matches(FRAGMENT).count(), 2);
}

#[test]
fn test_zero_matches_still_succeeds() {
    let workspace = setup_workspace("const unrelated = 1;\n");
    let output = splicer(workspace.path(), &[]);

    assert!(output.status.success());
    let content = fs::read_to_string(workspace.path().join("bridge1024.ts")).unwrap();
    assert_eq!(content, "const unrelated = 1;\n");
}

#[test]
fn test_missing_target_fails() {
    let dir = TempDir::new().unwrap();
    let output = splicer(dir.path(), &[]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("bridge1024.ts"));
}

#[test]
fn test_dry_run_with_diff() {
    let workspace = setup_workspace(SOURCE);
    let output = splicer(workspace.path(), &["--dry-run", "--diff", "--verbose"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("DRY RUN"));
    assert!(stdout.contains(&format!("+          {FRAGMENT}")));
    assert!(stdout.contains("1 inserted"));

    let content = fs::read_to_string(workspace.path().join("bridge1024.ts")).unwrap();
    assert_eq!(content, SOURCE);
}

#[test]
fn test_rule_file_with_custom_target() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("chain.ts"),
        "foo.anchor(1).middle().landing({a: 1}).more()",
    )
    .unwrap();
    fs::write(
        dir.path().join("rules.toml"),
        r#"[meta]
name = "scenario"
target = "chain.ts"

[[rules]]
id = "fragment"
anchor = "anchor("
landing = "landing("
fragment = "FRAGMENT"
indent = "  "
"#,
    )
    .unwrap();

    let output = splicer(dir.path(), &["--rules", "rules.toml"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Applied 1 rule(s)"));

    let content = fs::read_to_string(dir.path().join("chain.ts")).unwrap();
    assert_eq!(content, "foo.anchor(1).middle().landing({a: 1})\n  FRAGMENT.more()");
}

#[test]
fn test_invalid_rule_file_fails() {
    let workspace = setup_workspace(SOURCE);
    fs::write(workspace.path().join("rules.toml"), "[meta]\nname = \"empty\"\n").unwrap();

    let output = splicer(workspace.path(), &["--rules", "rules.toml"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("contains no rules"));
}

#[test]
fn test_target_outside_workspace_is_rejected() {
    let outer = TempDir::new().unwrap();
    let inner = outer.path().join("inner");
    fs::create_dir(&inner).unwrap();
    fs::write(outer.path().join("bridge1024.ts"), SOURCE).unwrap();

    let output = splicer(&inner, &["--file", "../bridge1024.ts"]);

    assert!(!output.status.success());
    let content = fs::read_to_string(outer.path().join("bridge1024.ts")).unwrap();
    assert_eq!(content, SOURCE);
}

#[test]
fn test_diff_without_trailing_newline_keeps_confirmation_on_own_line() {
    let workspace = setup_workspace(SOURCE.trim_end());
    let output = splicer(workspace.path(), &["--diff"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(" .rpc();\nAdded compute budget to all submitSignature calls\n"));
}
