use std::path::PathBuf;

use crate::ipc::error::ok;
use crate::ipc::helpers::{db_conn, form_str, optional_str};
use crate::ipc::types::{AppState, Request};
use crate::model::Registration;
use crate::session::ProfileEdit;
use serde_json::json;

fn picture_path(req: &Request) -> Result<Option<PathBuf>, serde_json::Value> {
    Ok(optional_str(req, "picturePath")?
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .map(PathBuf::from))
}

fn handle_register(state: &mut AppState, req: &Request) -> serde_json::Value {
    let db = match db_conn(&state.db, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let reg = match registration(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let picture = match picture_path(req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    match state.session.register_student(db, reg, picture.as_deref()) {
        Ok(()) => ok(&req.id, json!({ "registered": true, "issues": [] })),
        Err(issues) => ok(&req.id, json!({ "registered": false, "issues": issues })),
    }
}

fn registration(req: &Request) -> Result<Registration, serde_json::Value> {
    Ok(Registration {
        name: form_str(req, "name")?,
        student_id: form_str(req, "studentId")?,
        department: form_str(req, "department")?,
        mobile: form_str(req, "mobile")?,
        email: form_str(req, "email")?,
        password: form_str(req, "password")?,
        confirm_password: form_str(req, "confirmPassword")?,
    })
}

fn profile_edit(req: &Request) -> Result<ProfileEdit, serde_json::Value> {
    Ok(ProfileEdit {
        name: form_str(req, "name")?,
        student_id: form_str(req, "studentId")?,
        department: form_str(req, "department")?,
        mobile: form_str(req, "mobile")?,
    })
}

fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let db = match db_conn(&state.db, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let edit = match profile_edit(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let picture = match picture_path(req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    match state.session.update_student(db, edit, picture.as_deref()) {
        Ok(()) => ok(&req.id, json!({ "updated": true, "issues": [] })),
        Err(issues) => ok(&req.id, json!({ "updated": false, "issues": issues })),
    }
}

fn handle_count(state: &mut AppState, req: &Request) -> serde_json::Value {
    let db = match db_conn(&state.db, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    ok(&req.id, json!({ "count": state.session.student_count(db) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.register" => Some(handle_register(state, req)),
        "students.update" => Some(handle_update(state, req)),
        "students.count" => Some(handle_count(state, req)),
        _ => None,
    }
}
