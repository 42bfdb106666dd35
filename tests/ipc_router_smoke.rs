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
    let exe = env!("CARGO_BIN_EXE_complaintd");
    let mut child = Command::new(exe)
        .env_remove("COMPLAINTD_WORKSPACE")
        .env_remove("COMPLAINTD_SEED")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn complaintd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn read_response(reader: &mut BufReader<ChildStdout>) -> serde_json::Value {
    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response line");
    serde_json::from_str(line.trim()).expect("parse response json")
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let value = read_response(reader);
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    if value.get("ok").and_then(|v| v.as_bool()) == Some(false) {
        let code = value
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        assert_ne!(
            code, "not_implemented",
            "unexpected unknown method for {}",
            method
        );
    }
    value
}

fn error_code(value: &serde_json::Value) -> Option<&str> {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
}

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("complaintd-router-smoke");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["ok"], json!(true));
    assert!(health["result"]["workspacePath"].is_null());
    assert!(health["result"]["schema"].is_null());

    // Store-backed methods refuse to run before a workspace is chosen.
    let early = request(&mut stdin, &mut reader, "2", "complaints.listAll", json!({}));
    assert_eq!(error_code(&early), Some("no_workspace"));

    let opened = request(
        &mut stdin,
        &mut reader,
        "3",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(opened["ok"], json!(true));
    assert_eq!(opened["result"]["schema"]["feedback"], json!(true));
    assert!(workspace.join("complaints.sqlite3").is_file());

    let calls = [
        ("session.current", json!({})),
        ("session.login", json!({ "email": "admin@portal.com", "password": "admin123" })),
        ("session.selectComplaint", json!({ "complaintId": 1 })),
        ("session.clearComplaint", json!({})),
        ("students.count", json!({})),
        ("students.update", json!({ "name": "x", "studentId": "x", "department": "x", "mobile": "1234567" })),
        ("complaints.listAll", json!({})),
        ("complaints.listByStatus", json!({ "status": "All" })),
        ("complaints.get", json!({ "complaintId": 1 })),
        ("complaints.setStatus", json!({ "complaintId": 1, "status": "Pending" })),
        ("complaints.setFeedback", json!({ "complaintId": 1, "feedback": null })),
        ("complaints.counts", json!({})),
        ("complaints.myCounts", json!({})),
        ("complaints.listMine", json!({})),
        ("complaints.submit", json!({ "title": "t", "description": "d", "category": "Other" })),
        ("complaints.update", json!({ "complaintId": 1, "title": "t", "description": "d", "category": "Other" })),
        ("complaints.delete", json!({ "complaintId": 999 })),
        ("schema.upgrade", json!({})),
        ("session.logout", json!({})),
    ];
    for (i, (method, params)) in calls.into_iter().enumerate() {
        let id = format!("call-{}", i);
        let resp = request(&mut stdin, &mut reader, &id, method, params);
        assert_eq!(resp["ok"], json!(true), "{} failed: {}", method, resp);
    }

    let unknown = request_raw(&mut stdin, &mut reader, json!({ "id": "u", "method": "nope.nothing" }));
    assert_eq!(error_code(&unknown), Some("not_implemented"));

    let _ = child.kill();
}

fn request_raw(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    payload: serde_json::Value,
) -> serde_json::Value {
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");
    read_response(reader)
}

#[test]
fn malformed_lines_and_params_are_envelope_errors() {
    let workspace = temp_dir("complaintd-router-errors");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    writeln!(stdin, "{{not json").expect("write garbage");
    stdin.flush().expect("flush");
    let garbage = read_response(&mut reader);
    assert_eq!(garbage["ok"], json!(false));
    assert_eq!(error_code(&garbage), Some("bad_json"));
    assert!(garbage.get("id").is_none());

    // Blank lines are skipped without a reply.
    writeln!(stdin).expect("write blank");
    let missing_path = request(&mut stdin, &mut reader, "1", "workspace.select", json!({}));
    assert_eq!(error_code(&missing_path), Some("bad_params"));

    let _ = request(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let no_id = request(&mut stdin, &mut reader, "3", "complaints.get", json!({}));
    assert_eq!(error_code(&no_id), Some("bad_params"));
    let bad_id = request(
        &mut stdin,
        &mut reader,
        "4",
        "complaints.delete",
        json!({ "complaintId": "abc" }),
    );
    assert_eq!(error_code(&bad_id), Some("bad_params"));
    let bad_feedback = request(
        &mut stdin,
        &mut reader,
        "5",
        "complaints.setFeedback",
        json!({ "complaintId": 1, "feedback": 7 }),
    );
    assert_eq!(error_code(&bad_feedback), Some("bad_params"));

    // A core rejection is still ok:true with a sentinel.
    let rejected = request(
        &mut stdin,
        &mut reader,
        "6",
        "session.login",
        json!({ "email": "", "password": "" }),
    );
    assert_eq!(rejected["ok"], json!(true));
    assert!(rejected["result"]["role"].is_null());

    let _ = child.kill();
}

#[test]
fn workspace_open_failure_reports_db_open_failed() {
    let dir = temp_dir("complaintd-router-openfail");
    let blocker = dir.join("not-a-dir");
    std::fs::write(&blocker, b"file").expect("write blocker");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let resp = request(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": blocker.join("ws").to_string_lossy() }),
    );
    assert_eq!(error_code(&resp), Some("db_open_failed"));

    let health = request(&mut stdin, &mut reader, "2", "health", json!({}));
    assert!(health["result"]["workspacePath"].is_null());

    let _ = child.kill();
}
