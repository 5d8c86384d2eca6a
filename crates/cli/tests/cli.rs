use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::tempdir;

const MANIFEST: &str = r#"self.__BUILD_MANIFEST = { "/": ["static/chunks/b.js", "static/chunks/a.js"] };"#;
const WEBPACK: &str =
    r#"var u = function (e) { return "" + {1: "chunk1", 2: "chunk2"}[e] + ".js"; };"#;

#[allow(deprecated)]
fn chunkscout() -> Command {
    Command::cargo_bin("chunkscout").expect("binary")
}

#[test]
fn prints_sorted_chunks_for_file_input() {
    let temp = tempdir().unwrap();
    let entry = temp.path().join("main.js");
    fs::write(&entry, MANIFEST).unwrap();

    chunkscout()
        .arg(&entry)
        .assert()
        .success()
        .stdout("static/chunks/a.js\nstatic/chunks/b.js\n");
}

#[test]
fn json_output_keeps_input_order() {
    let temp = tempdir().unwrap();
    let manifest = temp.path().join("manifest.js");
    let webpack = temp.path().join("webpack.js");
    fs::write(&manifest, MANIFEST).unwrap();
    fs::write(&webpack, WEBPACK).unwrap();

    let output = chunkscout()
        .arg("--json")
        .arg("--bruteforce-limit")
        .arg("10")
        .arg(&webpack)
        .arg(&manifest)
        .output()
        .expect("command run");
    assert!(output.status.success());

    let lines: Vec<Value> = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).expect("valid json"))
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["input"], webpack.display().to_string());
    assert_eq!(lines[0]["chunks"], serde_json::json!(["chunk1.js", "chunk2.js"]));
    assert_eq!(
        lines[1]["chunks"],
        serde_json::json!(["static/chunks/a.js", "static/chunks/b.js"])
    );
}

#[test]
fn reads_stdin() {
    chunkscout()
        .arg("-")
        .write_stdin(MANIFEST)
        .assert()
        .success()
        .stdout(predicate::str::contains("static/chunks/a.js"));
}

#[test]
fn stdin_is_read_once() {
    let output = chunkscout()
        .arg("--json")
        .arg("-")
        .arg("-")
        .write_stdin(MANIFEST)
        .output()
        .expect("command run");
    assert!(output.status.success());

    let lines: Vec<Value> = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).expect("valid json"))
        .collect();
    assert_eq!(
        lines[0]["chunks"],
        serde_json::json!(["static/chunks/a.js", "static/chunks/b.js"])
    );
    assert_eq!(lines[1]["chunks"], serde_json::json!([]));
}

#[test]
fn unparseable_input_prints_nothing() {
    chunkscout()
        .arg("-")
        .write_stdin("self.__BUILD_MANIFEST = {")
        .assert()
        .success()
        .stdout("");
}

#[test]
fn missing_file_fails() {
    let temp = tempdir().unwrap();
    chunkscout()
        .arg(temp.path().join("absent.js"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn config_file_is_applied() {
    let temp = tempdir().unwrap();
    let config = temp.path().join("chunkscout.toml");
    fs::write(&config, "bruteforce_limit = 3\n\n[sandbox]\ntimeout_ms = 500\n").unwrap();
    let entry = temp.path().join("main.js");
    fs::write(
        &entry,
        r#"var u = function (e) { return "c/" + ({9: "nine"}[e] || e) + ".js"; };"#,
    )
    .unwrap();

    chunkscout()
        .arg("--config")
        .arg(&config)
        .arg(&entry)
        .assert()
        .success()
        .stdout("c/0.js\nc/1.js\nc/2.js\nc/nine.js\n");
}

#[test]
fn invalid_config_fails() {
    let temp = tempdir().unwrap();
    let config = temp.path().join("chunkscout.toml");
    fs::write(&config, "[sandbox]\ntimeout_ms = 500\n").unwrap();

    chunkscout()
        .arg("--config")
        .arg(&config)
        .arg("-")
        .write_stdin(MANIFEST)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}
