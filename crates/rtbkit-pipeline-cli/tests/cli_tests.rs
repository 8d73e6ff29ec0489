//! End-to-end tests for the rtbkit-pipeline binary

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

const CONTEXT_JSON: &str = r#"{
  "app": "python3 app.py",
  "context": {
    "@aws-cdk/core:enableStackNameDuplicates": "true",
    "shared": {
      "REPO_OWNER": "other",
      "ROOT_STACK_NAME": "My_Stack",
      "STACK_VARIANT": "FooVariant"
    },
    "dev": { "REPO_BRANCH": "develop" }
  }
}"#;

const OVERRIDE_KEYS: [&str; 8] = [
    "REPO_OWNER",
    "REPO_NAME",
    "ROOT_STACK_NAME",
    "STACK_VARIANT",
    "REPO_BRANCH",
    "CDK_DEFAULT_ACCOUNT",
    "CDK_DEFAULT_REGION",
    "RTBKIT_STAGE",
];

fn write_context(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// The binary with every override the tests care about cleared
fn cmd() -> Command {
    let mut cmd = cargo_bin_cmd!("rtbkit-pipeline");
    for key in OVERRIDE_KEYS {
        cmd.env_remove(key);
    }
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn resolve_prints_settings_with_tiers() {
    let dir = TempDir::new().unwrap();
    let path = write_context(&dir, "cdk.json", CONTEXT_JSON);

    cmd()
        .arg("resolve")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("stage: dev"))
        .stdout(predicate::str::contains("ROOT_STACK_NAME  my-stack  (scope)"))
        .stdout(predicate::str::contains("FooVariant  (scope)"))
        .stdout(predicate::str::contains("develop  (scope)"));
}

#[test]
fn resolve_environment_override_wins() {
    let dir = TempDir::new().unwrap();
    let path = write_context(&dir, "cdk.json", CONTEXT_JSON);

    let output = cmd()
        .env("REPO_OWNER", "acme")
        .args(["resolve", "--format", "json"])
        .arg(&path)
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["repo_owner"]["value"], "acme");
    assert_eq!(json["repo_owner"]["tier"], "override");
    assert_eq!(json["stack_variant"]["value"], "FooVariant");
}

#[test]
fn resolve_empty_override_is_ignored() {
    let dir = TempDir::new().unwrap();
    let path = write_context(&dir, "cdk.json", CONTEXT_JSON);

    cmd()
        .env("REPO_OWNER", "")
        .args(["get"])
        .arg(&path)
        .arg("REPO_OWNER")
        .assert()
        .success()
        .stdout("other\n");
}

#[test]
fn missing_root_stack_name_exits_with_help() {
    let dir = TempDir::new().unwrap();
    let path = write_context(&dir, "context.yaml", "shared:\n  REPO_OWNER: acme\n");

    cmd()
        .arg("resolve")
        .arg(&path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "Missing required configuration: ROOT_STACK_NAME",
        ))
        .stderr(predicate::str::contains("ROOT_STACK_NAME environment variable"));
}

#[test]
fn root_stack_name_from_environment_is_normalized() {
    let dir = TempDir::new().unwrap();
    let path = write_context(&dir, "context.yaml", "shared: {}\n");

    cmd()
        .env("ROOT_STACK_NAME", "Prod_RTB")
        .arg("get")
        .arg(&path)
        .arg("ROOT_STACK_NAME")
        .assert()
        .success()
        .stdout("prod-rtb\n");
}

#[test]
fn get_uses_stage_scope_for_branch() {
    let dir = TempDir::new().unwrap();
    let path = write_context(
        &dir,
        "context.yaml",
        "shared:\n  ROOT_STACK_NAME: rtb\nprod:\n  REPO_BRANCH: release\n",
    );

    cmd()
        .args(["get", "--stage", "prod"])
        .arg(&path)
        .arg("REPO_BRANCH")
        .assert()
        .success()
        .stdout("release\n");

    cmd()
        .env("RTBKIT_STAGE", "qa")
        .arg("get")
        .arg(&path)
        .arg("REPO_BRANCH")
        .assert()
        .success()
        .stdout("main\n");
}

#[test]
fn get_unknown_key_without_default_fails() {
    let dir = TempDir::new().unwrap();
    let path = write_context(&dir, "cdk.json", CONTEXT_JSON);

    cmd()
        .arg("get")
        .arg(&path)
        .arg("NOT_CONFIGURED")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Key 'NOT_CONFIGURED' is not set"));

    cmd()
        .arg("get")
        .arg(&path)
        .arg("NOT_CONFIGURED")
        .args(["--default", "fallback"])
        .assert()
        .success()
        .stdout("fallback\n");
}

#[test]
fn plan_renders_json() {
    let dir = TempDir::new().unwrap();
    let path = write_context(&dir, "cdk.json", CONTEXT_JSON);

    let output = cmd()
        .env("CDK_DEFAULT_ACCOUNT", "123456789012")
        .args(["plan", "--format", "json"])
        .arg(&path)
        .output()
        .unwrap();

    assert!(output.status.success());
    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plan["source"]["owner"], "other");
    assert_eq!(plan["source"]["branch_or_ref"], "develop");
    assert_eq!(
        plan["project"]["environment_variables"]["RTBKIT_ROOT_STACK_NAME"],
        "my-stack"
    );
    assert_eq!(
        plan["project"]["environment_variables"]["AWS_ACCOUNT_ID"],
        "123456789012"
    );
    assert_eq!(
        plan["role"]["managed_policies"].as_array().unwrap().len(),
        8
    );
}

#[test]
fn plan_writes_output_file() {
    let dir = TempDir::new().unwrap();
    let path = write_context(&dir, "cdk.json", CONTEXT_JSON);
    let out = dir.path().join("plan.yaml");

    cmd()
        .arg("plan")
        .arg(&path)
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stderr(predicate::str::contains("Wrote to"));

    let yaml = std::fs::read_to_string(&out).unwrap();
    assert!(yaml.contains("role_name: rtbkit_codebuild_role"));
    assert!(yaml.contains("RTBKIT_VARIANT: FooVariant"));
}

#[test]
fn later_context_files_override_earlier_ones() {
    let dir = TempDir::new().unwrap();
    let base = write_context(&dir, "cdk.json", CONTEXT_JSON);
    let local = write_context(
        &dir,
        "cdk.context.json",
        r#"{"context": {"shared": {"STACK_VARIANT": "Aerospike"}}}"#,
    );

    cmd()
        .arg("get")
        .arg(&base)
        .arg(&local)
        .arg("STACK_VARIANT")
        .assert()
        .success()
        .stdout("Aerospike\n");
}

#[test]
fn check_lists_scopes_and_flags_bad_files() {
    let dir = TempDir::new().unwrap();
    let good = write_context(&dir, "cdk.json", CONTEXT_JSON);
    let bad = write_context(&dir, "broken.yaml", "shared: [unclosed");

    cmd()
        .arg("check")
        .arg(&good)
        .assert()
        .success()
        .stdout(predicate::str::contains("scopes shared, dev"));

    cmd()
        .arg("check")
        .arg(&good)
        .arg(&bad)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Parse error"));
}

#[test]
fn missing_context_file_exits_2() {
    let dir = TempDir::new().unwrap();

    cmd()
        .arg("resolve")
        .arg(dir.path().join("missing.json"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Failed to load"));
}
