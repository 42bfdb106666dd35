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

fn request_ok(
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
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn titles(list: &serde_json::Value) -> Vec<String> {
    list["complaints"]
        .as_array()
        .expect("complaints array")
        .iter()
        .map(|c| c["title"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[test]
fn seeded_demo_student_sees_three_complaints() {
    let workspace = temp_dir("complaintd-lifecycle-seed");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let who = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "session.login",
        json!({ "email": "test@student.com", "password": "test123" }),
    );
    assert_eq!(who["role"], json!("student"));

    let mine = request_ok(&mut stdin, &mut reader, "3", "complaints.listMine", json!({}));
    let mut got = titles(&mine);
    got.sort();
    assert_eq!(
        got,
        vec![
            "Course Registration Issue",
            "Library Access Problem",
            "Sample Complaint"
        ]
    );
    let counts = request_ok(&mut stdin, &mut reader, "4", "complaints.myCounts", json!({}));
    assert_eq!(counts, json!({ "total": 3, "resolved": 1 }));

    let _ = child.kill();

    // Reopening the same store does not seed twice.
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "session.login",
        json!({ "email": "admin@portal.com", "password": "admin123" }),
    );
    let counts = request_ok(&mut stdin, &mut reader, "3", "complaints.counts", json!({}));
    assert_eq!(
        counts,
        json!({ "total": 3, "pending": 1, "inProgress": 1, "resolved": 1 })
    );
    let students = request_ok(&mut stdin, &mut reader, "4", "students.count", json!({}));
    assert_eq!(students["count"], json!(1));

    let _ = child.kill();
}

#[test]
fn submit_edit_review_and_delete() {
    let workspace = temp_dir("complaintd-lifecycle-flow");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "session.login",
        json!({ "email": "test@student.com", "password": "test123" }),
    );

    let rejected = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "complaints.submit",
        json!({ "title": "Noise", "description": "  ", "category": "Facility" }),
    );
    assert_eq!(rejected, json!({ "submitted": false, "complaintId": null }));

    let submitted = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "complaints.submit",
        json!({ "title": "Noise", "description": "Drilling at night", "category": "Facility" }),
    );
    let id = submitted["complaintId"].as_i64().expect("complaint id");

    let mine = request_ok(&mut stdin, &mut reader, "5", "complaints.listMine", json!({}));
    assert_eq!(titles(&mine)[0], "Noise");

    let selected = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "session.selectComplaint",
        json!({ "complaintId": id }),
    );
    assert_eq!(selected["complaint"]["status"], json!("Pending"));

    let edited = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "complaints.update",
        json!({ "title": "Noise at night", "description": "Drilling after 11pm", "category": "Other" }),
    );
    assert_eq!(edited["updated"], json!(true));
    let current = request_ok(&mut stdin, &mut reader, "8", "session.current", json!({}));
    assert_eq!(current["complaint"]["title"], json!("Noise at night"));
    assert_eq!(current["complaint"]["category"], json!("Other"));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "session.login",
        json!({ "email": "admin@portal.com", "password": "admin123" }),
    );
    let bad_status = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "complaints.setStatus",
        json!({ "complaintId": id, "status": "Closed" }),
    );
    assert_eq!(bad_status["updated"], json!(false));
    let status = request_ok(
        &mut stdin,
        &mut reader,
        "11",
        "complaints.setStatus",
        json!({ "complaintId": id, "status": " In Progress " }),
    );
    assert_eq!(status["updated"], json!(true));
    let feedback = request_ok(
        &mut stdin,
        &mut reader,
        "12",
        "complaints.setFeedback",
        json!({ "complaintId": id, "feedback": "  Contractor notified.  " }),
    );
    assert_eq!(feedback["updated"], json!(true));

    let got = request_ok(
        &mut stdin,
        &mut reader,
        "13",
        "complaints.get",
        json!({ "complaintId": id }),
    );
    assert_eq!(got["complaint"]["status"], json!("In Progress"));
    assert_eq!(got["complaint"]["feedback"], json!("Contractor notified."));
    assert!(got["complaint"]["feedbackUpdatedAt"].is_string());

    let in_progress = request_ok(
        &mut stdin,
        &mut reader,
        "14",
        "complaints.listByStatus",
        json!({ "status": "In Progress" }),
    );
    let mut got = titles(&in_progress);
    got.sort();
    assert_eq!(got, vec!["Course Registration Issue", "Noise at night"]);
    let everything = request_ok(
        &mut stdin,
        &mut reader,
        "15",
        "complaints.listByStatus",
        json!({ "status": "All" }),
    );
    assert_eq!(titles(&everything).len(), 4);

    let cleared = request_ok(
        &mut stdin,
        &mut reader,
        "16",
        "complaints.setFeedback",
        json!({ "complaintId": id, "feedback": "   " }),
    );
    assert_eq!(cleared["updated"], json!(true));
    let got = request_ok(
        &mut stdin,
        &mut reader,
        "17",
        "complaints.get",
        json!({ "complaintId": id }),
    );
    assert!(got["complaint"]["feedback"].is_null());

    let deleted = request_ok(
        &mut stdin,
        &mut reader,
        "18",
        "complaints.delete",
        json!({ "complaintId": id }),
    );
    assert_eq!(deleted["deleted"], json!(true));
    let counts = request_ok(&mut stdin, &mut reader, "19", "complaints.counts", json!({}));
    assert_eq!(counts["total"], json!(3));

    let _ = child.kill();
}

#[test]
fn status_filter_reaches_the_store_as_typed() {
    let workspace = temp_dir("complaintd-lifecycle-filter");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "session.login",
        json!({ "email": "admin@portal.com", "password": "admin123" }),
    );

    // Blank is an ordinary filter value that matches nothing.
    let blank = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "complaints.listByStatus",
        json!({ "status": "" }),
    );
    assert_eq!(blank["complaints"], json!([]));

    let padded = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "complaints.listByStatus",
        json!({ "status": " Resolved" }),
    );
    assert_eq!(padded["complaints"], json!([]));

    let exact = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "complaints.listByStatus",
        json!({ "status": "Resolved" }),
    );
    assert_eq!(titles(&exact), vec!["Library Access Problem"]);

    let _ = child.kill();
}
