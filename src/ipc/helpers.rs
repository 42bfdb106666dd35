use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};

use crate::db::Db;
use crate::ipc::error::err;
use crate::ipc::types::Request;
use crate::model::{Complaint, Student};
use crate::session::Principal;

pub fn db_conn<'a>(db: &'a Option<Db>, req: &Request) -> Result<&'a Db, Value> {
    db.as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

/// Trimmed, non-empty string parameter.
pub fn required_str(req: &Request, key: &str) -> Result<String, Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

/// Form field passed through as typed. Blank is a valid value here; the
/// session decides what blank means.
pub fn form_str(req: &Request, key: &str) -> Result<String, Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

/// Absent or null reads as `None`; any other non-string is rejected.
pub fn optional_str(req: &Request, key: &str) -> Result<Option<String>, Value> {
    match req.params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(err(
            &req.id,
            "bad_params",
            format!("{} must be a string or null", key),
            None,
        )),
    }
}

fn parse_id(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn required_id(req: &Request, key: &str) -> Result<i64, Value> {
    req.params
        .get(key)
        .and_then(parse_id)
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn optional_id(req: &Request, key: &str) -> Result<Option<i64>, Value> {
    match req.params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => parse_id(v).map(Some).ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                format!("{} must be an integer", key),
                None,
            )
        }),
    }
}

pub fn student_json(s: &Student) -> Value {
    json!({
        "name": s.name,
        "studentId": s.student_id,
        "department": s.department,
        "mobile": s.mobile,
        "email": s.email,
        "hasPicture": s.picture.is_some(),
        "pictureMime": s.picture.as_ref().and_then(|p| p.mime.clone()),
        "pictureBase64": s.picture.as_ref().map(|p| STANDARD.encode(&p.bytes)),
    })
}

pub fn complaint_json(c: &Complaint) -> Value {
    json!({
        "id": c.id,
        "title": c.title,
        "description": c.description,
        "category": c.category,
        "status": c.status,
        "studentEmail": c.student_email,
        "feedback": c.feedback,
        "feedbackUpdatedAt": c.feedback_updated_at,
        "createdAt": c.created_at,
    })
}

pub fn complaints_json(list: &[Complaint]) -> Value {
    Value::Array(list.iter().map(complaint_json).collect())
}

pub fn principal_json(p: Option<&Principal>) -> Value {
    match p {
        Some(Principal::Student(s)) => json!({ "role": "student", "student": student_json(s) }),
        Some(p) => json!({ "role": p.role(), "student": Value::Null }),
        None => json!({ "role": Value::Null, "student": Value::Null }),
    }
}
