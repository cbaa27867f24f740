/// Integration test: runs the built CLI against schema and instance files
/// written to a temp directory.
use serde_json::{json, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

const BIN: &str = env!("CARGO_BIN_EXE_jsonschema-compiler");

fn write_json(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string(value).unwrap()).unwrap();
    path
}

fn user_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": {"type": "string"},
            "role": {"type": "string", "enum": ["admin", "user"], "default": "user"}
        },
        "required": ["name"]
    })
}

fn stdout_json(out: &Output) -> Value {
    serde_json::from_slice(&out.stdout).expect("stdout must be JSON")
}

#[test]
fn test_valid_instance_prints_parsed_value() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let schema = write_json(tmp.path(), "schema.json", &user_schema());
    let instance = write_json(tmp.path(), "instance.json", &json!({"name": "ada"}));

    let out = Command::new(BIN).arg(&schema).arg(&instance).output().unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(stdout_json(&out), json!({"name": "ada", "role": "user"}));
}

#[test]
fn test_invalid_instance_prints_violations() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let schema = write_json(tmp.path(), "schema.json", &user_schema());
    let instance = write_json(tmp.path(), "instance.json", &json!({"role": "root"}));

    let out = Command::new(BIN).arg(&schema).arg(&instance).output().unwrap();
    assert_eq!(out.status.code(), Some(1));
    let report = stdout_json(&out);
    let paths: Vec<&str> = report
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["instancePath"].as_str().unwrap())
        .collect();
    assert_eq!(paths, vec!["/name", "/role"]);
}

#[test]
fn test_instance_from_stdin() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let schema = write_json(tmp.path(), "schema.json", &json!({"type": "integer"}));

    let mut child = Command::new(BIN)
        .arg(&schema)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(b"12").unwrap();
    let out = child.wait_with_output().unwrap();
    assert!(out.status.success());
    assert_eq!(stdout_json(&out), json!(12));
}

#[test]
fn test_absent_uses_default() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let schema = write_json(tmp.path(), "schema.json", &json!({"type": "number", "default": 0}));
    let out = Command::new(BIN).arg("--absent").arg(&schema).output().unwrap();
    assert!(out.status.success());
    assert_eq!(stdout_json(&out), json!(0));

    let schema = write_json(tmp.path(), "plain.json", &json!({"type": "number"}));
    let out = Command::new(BIN).arg("--absent").arg(&schema).output().unwrap();
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn test_print_type() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let schema = write_json(tmp.path(), "schema.json", &user_schema());
    let out = Command::new(BIN).arg("--print-type").arg(&schema).output().unwrap();
    assert!(out.status.success());
    assert_eq!(
        String::from_utf8_lossy(&out.stdout).trim(),
        "{ name: string; role: \"admin\" | \"user\" }"
    );
}

#[test]
fn test_exclusive_one_of_flag() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let schema = write_json(
        tmp.path(),
        "schema.json",
        &json!({"oneOf": [{"type": "number"}, {"type": "integer"}]}),
    );
    let instance = write_json(tmp.path(), "instance.json", &json!(5));

    let loose = Command::new(BIN).arg(&schema).arg(&instance).output().unwrap();
    assert!(loose.status.success());
    let strict = Command::new(BIN)
        .arg("--exclusive-one-of")
        .arg(&schema)
        .arg(&instance)
        .output()
        .unwrap();
    assert_eq!(strict.status.code(), Some(1));
}

#[test]
fn test_compile_error_exit_code() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let schema = write_json(tmp.path(), "schema.json", &json!({"type": "unsupportedType"}));
    let out = Command::new(BIN).arg("--print-type").arg(&schema).output().unwrap();
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("unsupported schema type"));
}
