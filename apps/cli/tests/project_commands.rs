use std::error::Error;
use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::tempdir;

fn cli(workspace: &Path) -> Result<Command, Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("aethercode")?;
    cmd.arg("--workspace").arg(workspace);
    Ok(cmd)
}

#[test]
fn init_writes_demo_project_and_refuses_to_clobber() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;

    cli(workspace.path())?
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Demo Project"));
    assert!(workspace.path().join(".aethercode/project.json").exists());

    cli(workspace.path())?
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    cli(workspace.path())?.args(["init", "--force"]).assert().success();
    Ok(())
}

#[test]
fn tree_lists_nodes_in_pre_order_with_paths() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    cli(workspace.path())?.arg("init").assert().success();

    let output = cli(workspace.path())?.arg("tree").output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    let paths: Vec<&str> = stdout
        .lines()
        .skip(1)
        .filter_map(|line| line.split('\t').nth(2))
        .collect();
    assert_eq!(
        paths,
        [
            "/README.md",
            "/WebApp",
            "/WebApp/index.html",
            "/WebApp/style.css",
            "/WebApp/script.js",
            "/utils",
            "/utils/helpers.py",
        ]
    );

    cli(workspace.path())?
        .args(["tree", "--filter", "HELP"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/utils/helpers.py"))
        .stdout(predicate::str::contains("index.html").not());
    Ok(())
}

#[test]
fn new_file_is_saved_under_parent() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    cli(workspace.path())?.arg("init").assert().success();

    cli(workspace.path())?
        .args(["new-file", "--name", "math.py", "--parent", "6", "--language", "py"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/utils/math.py"));

    let project_file = workspace.path().join(".aethercode/project.json");
    let saved: Value = serde_json::from_str(&fs::read_to_string(project_file)?)?;
    let utils = &saved["files"][2];
    assert_eq!(utils["name"], "utils");
    assert_eq!(utils["children"][1]["name"], "math.py");
    assert_eq!(utils["children"][1]["content"], "# math.py");
    assert_eq!(saved["revision"], 1);

    cli(workspace.path())?
        .args(["new-file", "--name", "x.ts", "--parent", "1"])
        .assert()
        .failure();
    Ok(())
}

#[test]
fn replay_prints_the_resulting_session() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let script = workspace.path().join("script.json");
    fs::write(
        &script,
        r#"[
            { "action": "open", "file_id": "3", "initial_content": "<html></html>" },
            { "action": "open", "file_id": "4", "initial_content": "body {}" },
            { "action": "open", "file_id": "5", "initial_content": "let a;" },
            { "action": "edit", "file_id": "4", "content": "body { margin: 0 }" },
            { "action": "close", "file_id": "5" },
            { "action": "open", "file_id": "2", "initial_content": "" }
        ]"#,
    )?;

    let output = cli(workspace.path())?
        .arg("replay")
        .arg(&script)
        .output()?;
    assert!(output.status.success());
    let session: Value = serde_json::from_slice(&output.stdout)?;
    let open: Vec<&str> = session["open_order"]
        .as_array()
        .map(|ids| ids.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    assert_eq!(open, ["3", "4"]);
    assert_eq!(session["active"], "4");
    assert_eq!(session["drafts"]["4"], "body { margin: 0 }");
    Ok(())
}

#[test]
fn preferences_show_prints_defaults() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    cli(workspace.path())?
        .args(["preferences", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gemini-2.0-flash"))
        .stdout(predicate::str::contains("\"default_language\": \"typescript\""));
    Ok(())
}

#[test]
fn preferences_set_persists_and_reset_restores_defaults() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let prefs_file = workspace.path().join(".aethercode/preferences.json");

    cli(workspace.path())?
        .args(["preferences", "set", "assist.timeout_secs", "9000"])
        .assert()
        .success();
    cli(workspace.path())?
        .args(["preferences", "set", "editor.default_language", "py"])
        .assert()
        .success();
    let saved: Value = serde_json::from_str(&fs::read_to_string(&prefs_file)?)?;
    assert_eq!(saved["assist"]["timeout_secs"], 600);
    assert_eq!(saved["editor"]["default_language"], "python");

    cli(workspace.path())?
        .args(["new-file", "--name", "tool.py"])
        .assert()
        .success();
    let project_file = workspace.path().join(".aethercode/project.json");
    let project: Value = serde_json::from_str(&fs::read_to_string(project_file)?)?;
    assert_eq!(project["files"][3]["language"], "python");

    cli(workspace.path())?
        .args(["preferences", "set", "assist.timeout_secs", "soon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a number"));

    cli(workspace.path())?
        .args(["preferences", "reset"])
        .assert()
        .success();
    let saved: Value = serde_json::from_str(&fs::read_to_string(&prefs_file)?)?;
    assert_eq!(saved["assist"]["timeout_secs"], 30);
    assert_eq!(saved["editor"]["default_language"], "typescript");
    Ok(())
}
