use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_idcardd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn idcardd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({ "id": id, "method": method, "params": params });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    serde_json::from_str(line.trim()).expect("parse response json")
}

fn error_code(value: &serde_json::Value) -> &str {
    assert_eq!(value["ok"].as_bool(), Some(false), "expected failure: {}", value);
    value["error"]["code"].as_str().expect("error code")
}

fn select_workspace(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>, path: &PathBuf) {
    let value = request(
        stdin,
        reader,
        "ws",
        "workspace.select",
        json!({ "path": path.to_string_lossy() }),
    );
    assert_eq!(value["ok"].as_bool(), Some(true), "{}", value);
}

#[test]
fn data_methods_require_a_workspace() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    for (i, method) in [
        "students.list",
        "students.register",
        "students.stats",
        "export.csv",
        "settings.get",
    ]
    .iter()
    .enumerate()
    {
        let value = request(&mut stdin, &mut reader, &format!("r{}", i), method, json!({}));
        assert_eq!(error_code(&value), "no_workspace", "method {}", method);
    }

    // health works without one.
    let value = request(&mut stdin, &mut reader, "h", "health", json!({}));
    assert_eq!(value["ok"].as_bool(), Some(true));
    assert!(value["result"]["workspacePath"].is_null());
}

#[test]
fn unknown_methods_get_not_implemented() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let value = request(&mut stdin, &mut reader, "1", "students.rename", json!({}));
    assert_eq!(error_code(&value), "not_implemented");
}

#[test]
fn registration_reports_every_invalid_field_at_once() {
    let workspace = temp_dir("idcardd-validation");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, &workspace);

    let value = request(
        &mut stdin,
        &mut reader,
        "1",
        "students.register",
        json!({
            "matricNo": "",
            "firstName": "Jane",
            "lastName": "",
            "department": "Astrology",
            "level": "900 Level",
            "dateOfBirth": "14-03-2004",
            "email": "not-an-email",
            "phone": "",
            "address": "12 College Rd",
            "emergencyContact": "Pat Doe",
            "emergencyPhone": "+1 555 0101",
            "bloodGroup": "Q+",
        }),
    );
    assert_eq!(error_code(&value), "validation_failed");
    let details = value["error"]["details"].as_object().expect("details map");
    assert_eq!(details["matric_no"].as_str(), Some("is required"));
    assert_eq!(details["last_name"].as_str(), Some("is required"));
    assert_eq!(details["department"].as_str(), Some("is not a known department"));
    assert_eq!(details["level"].as_str(), Some("is not a known level"));
    assert_eq!(details["date_of_birth"].as_str(), Some("must be a YYYY-MM-DD date"));
    assert_eq!(details["email"].as_str(), Some("is not a valid email address"));
    assert_eq!(details["phone"].as_str(), Some("is required"));
    assert_eq!(details["blood_group"].as_str(), Some("is not a known blood group"));
    assert!(!details.contains_key("first_name"));
}

#[test]
fn bad_order_and_filters_are_rejected_as_bad_params() {
    let workspace = temp_dir("idcardd-bad-params");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, &workspace);

    let value = request(
        &mut stdin,
        &mut reader,
        "1",
        "students.list",
        json!({ "order": "oldestFirst" }),
    );
    assert_eq!(error_code(&value), "bad_params");

    let value = request(
        &mut stdin,
        &mut reader,
        "2",
        "students.search",
        json!({ "filters": "not-an-object" }),
    );
    assert_eq!(error_code(&value), "bad_params");

    let value = request(
        &mut stdin,
        &mut reader,
        "3",
        "settings.save",
        json!({ "settings": [1, 2] }),
    );
    assert_eq!(error_code(&value), "bad_params");
}

#[test]
fn malformed_lines_do_not_kill_the_loop() {
    let workspace = temp_dir("idcardd-bad-json");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    writeln!(stdin, "this is not json").expect("write garbage");
    stdin.flush().expect("flush");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response");
    assert_eq!(value["ok"].as_bool(), Some(false));
    assert_eq!(value["error"]["code"].as_str(), Some("bad_json"));

    // Valid JSON of the wrong shape produces an error message that quotes
    // the offending value; the reply line must still parse.
    writeln!(stdin, "\"hello\"").expect("write wrong-shape json");
    stdin.flush().expect("flush");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response");
    assert_eq!(value["error"]["code"].as_str(), Some("bad_json"));

    // The daemon keeps serving after the bad line.
    select_workspace(&mut stdin, &mut reader, &workspace);
    let value = request(&mut stdin, &mut reader, "after", "students.list", json!({}));
    assert_eq!(value["ok"].as_bool(), Some(true));
}
