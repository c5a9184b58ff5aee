//! CLI tests for `parse`, `syntax-check`, `dump`, and `catalog`.

use std::fs;
use std::process::Command;

use assert_cmd::cargo;

fn cmakedit_cmd() -> Command {
    Command::new(cargo::cargo_bin!("cmakedit"))
}

fn write_temp_cmake(content: &str) -> (tempfile::TempDir, String) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("CMakeLists.txt");
    fs::write(&path, content).expect("write temp cmake file");
    (dir, path.to_string_lossy().to_string())
}

#[test]
fn parse_json_lists_nodes_with_slots() {
    let (_dir, path) = write_temp_cmake("# header\nset(${CMAKE_PROJECT_NAME}_BOARD uno)\n");

    let output = cmakedit_cmd()
        .args(["parse", &path, "--output", "json"])
        .output()
        .expect("run parse json");

    assert!(
        output.status.success(),
        "expected parse to succeed, stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid parse json");
    let nodes = json["nodes"].as_array().expect("nodes array");
    assert!(nodes.iter().any(|n| n["kind"] == "comment"));
    assert!(
        nodes
            .iter()
            .any(|n| n["kind"] == "command" && n["slot"] == "SET_BOARD" && n["value"] == "uno"),
        "expected an annotated command node: {stdout}"
    );
}

#[test]
fn syntax_check_ok_file_exits_zero() {
    let (_dir, path) = write_temp_cmake("set(BOARD uno)\n");

    let output = cmakedit_cmd()
        .args(["syntax-check", &path, "--output", "json"])
        .output()
        .expect("run syntax-check json");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid json");
    assert_eq!(json["ok"], true);
}

#[test]
fn syntax_check_unbalanced_file_exits_one() {
    let (_dir, path) = write_temp_cmake("set(BOARD uno\n");

    let output = cmakedit_cmd()
        .args(["syntax-check", &path, "--output", "json"])
        .output()
        .expect("run syntax-check json");

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid json");
    assert_eq!(json["ok"], false);
    let diags = json["diagnostics"].as_array().expect("diagnostics array");
    assert!(diags.iter().any(|d| d["id"] == "CMK1101"));
}

#[test]
fn syntax_check_unterminated_quote_exits_one() {
    let (_dir, path) = write_temp_cmake("set(BOARD \"uno\n");

    let output = cmakedit_cmd()
        .args(["syntax-check", &path, "--output", "json"])
        .output()
        .expect("run syntax-check json");

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("CMK0101"),
        "expected the lexer code in output: {stdout}"
    );
}

#[test]
fn dump_variables_prints_slot_values() {
    let (_dir, path) =
        write_temp_cmake("set(${CMAKE_PROJECT_NAME}_BOARD uno)\nproject(blink)\n");

    let output = cmakedit_cmd()
        .args(["dump", &path, "--what", "variables", "--output", "json"])
        .output()
        .expect("run dump json");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid dump json");
    assert_eq!(json["SET_BOARD"], "uno");
    assert_eq!(json["PROJECT"], "blink");
}

#[test]
fn catalog_prints_builtin_slots() {
    let output = cmakedit_cmd()
        .args(["catalog"])
        .output()
        .expect("run catalog");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid catalog json");
    let slots = json["slots"].as_array().expect("slots array");
    assert!(slots.iter().any(|s| s["id"] == "SET_BOARD"));
    assert!(slots.iter().any(|s| s["id"] == "GENERATE_ARDUINO_FIRMWARE"));
}

#[test]
fn custom_catalog_file_is_honored() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cmake = dir.path().join("CMakeLists.txt");
    fs::write(&cmake, "set(MY_FLAG on)\n").expect("write cmake");
    let catalog = dir.path().join("catalog.json");
    fs::write(
        &catalog,
        r#"{
  "slots": [
    {
      "id": "MY_FLAG",
      "command": "set",
      "anchors": [{ "exact": "MY_FLAG" }],
      "template": "set(MY_FLAG {value})",
      "group": "build"
    }
  ]
}"#,
    )
    .expect("write catalog");

    let output = cmakedit_cmd()
        .args([
            "dump",
            &cmake.to_string_lossy(),
            "--catalog",
            &catalog.to_string_lossy(),
            "--what",
            "variables",
            "--output",
            "json",
        ])
        .output()
        .expect("run dump with custom catalog");

    assert!(
        output.status.success(),
        "stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid dump json");
    assert_eq!(json["MY_FLAG"], "on");
}
