use crate::ipc::error::ok;
use crate::ipc::helpers::{
    complaint_json, complaints_json, db_conn, form_str, optional_id, optional_str, required_id,
};
use crate::ipc::types::{AppState, Request};
use crate::session::ComplaintForm;
use serde_json::json;

fn complaint_form(req: &Request) -> Result<ComplaintForm, serde_json::Value> {
    Ok(ComplaintForm {
        title: form_str(req, "title")?,
        description: form_str(req, "description")?,
        category: form_str(req, "category")?,
    })
}

fn handle_submit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let db = match db_conn(&state.db, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let form = match complaint_form(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let id = state.session.submit_complaint(db, &form);
    ok(
        &req.id,
        json!({ "submitted": id.is_some(), "complaintId": id }),
    )
}

fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let db = match db_conn(&state.db, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let id = match optional_id(req, "complaintId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let form = match complaint_form(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let updated = state.session.update_complaint(db, id, &form);
    ok(&req.id, json!({ "updated": updated }))
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let db = match db_conn(&state.db, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let id = match required_id(req, "complaintId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let deleted = state.session.delete_complaint(db, id);
    ok(&req.id, json!({ "deleted": deleted }))
}

fn handle_list_mine(state: &mut AppState, req: &Request) -> serde_json::Value {
    let db = match db_conn(&state.db, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let list = state.session.list_my_complaints(db);
    ok(&req.id, json!({ "complaints": complaints_json(&list) }))
}

fn handle_list_all(state: &mut AppState, req: &Request) -> serde_json::Value {
    let db = match db_conn(&state.db, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let list = state.session.list_all_complaints(db);
    ok(&req.id, json!({ "complaints": complaints_json(&list) }))
}

fn handle_list_by_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    let db = match db_conn(&state.db, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    // Passed through untrimmed; only the session's "All" check looks at it.
    let status = match form_str(req, "status") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let list = state.session.list_complaints_by_status(db, &status);
    ok(&req.id, json!({ "complaints": complaints_json(&list) }))
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let db = match db_conn(&state.db, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let id = match required_id(req, "complaintId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let complaint = state.session.get_complaint(db, id);
    ok(
        &req.id,
        json!({ "complaint": complaint.as_ref().map(complaint_json) }),
    )
}

fn handle_set_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    let db = match db_conn(&state.db, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let id = match required_id(req, "complaintId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    // Blank or unknown values are a core rejection, not a protocol error.
    let status = match form_str(req, "status") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let updated = state.session.set_complaint_status(db, id, &status);
    ok(&req.id, json!({ "updated": updated }))
}

fn handle_set_feedback(state: &mut AppState, req: &Request) -> serde_json::Value {
    let db = match db_conn(&state.db, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let id = match required_id(req, "complaintId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let feedback = match optional_str(req, "feedback") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let updated = state
        .session
        .set_complaint_feedback(db, id, feedback.as_deref());
    ok(&req.id, json!({ "updated": updated }))
}

fn handle_counts(state: &mut AppState, req: &Request) -> serde_json::Value {
    let db = match db_conn(&state.db, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let c = state.session.complaint_counts(db);
    ok(
        &req.id,
        json!({
            "total": c.total,
            "pending": c.pending,
            "inProgress": c.in_progress,
            "resolved": c.resolved,
        }),
    )
}

fn handle_my_counts(state: &mut AppState, req: &Request) -> serde_json::Value {
    let db = match db_conn(&state.db, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let c = state.session.my_counts(db);
    ok(&req.id, json!({ "total": c.total, "resolved": c.resolved }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "complaints.submit" => Some(handle_submit(state, req)),
        "complaints.update" => Some(handle_update(state, req)),
        "complaints.delete" => Some(handle_delete(state, req)),
        "complaints.listMine" => Some(handle_list_mine(state, req)),
        "complaints.listAll" => Some(handle_list_all(state, req)),
        "complaints.listByStatus" => Some(handle_list_by_status(state, req)),
        "complaints.get" => Some(handle_get(state, req)),
        "complaints.setStatus" => Some(handle_set_status(state, req)),
        "complaints.setFeedback" => Some(handle_set_feedback(state, req)),
        "complaints.counts" => Some(handle_counts(state, req)),
        "complaints.myCounts" => Some(handle_my_counts(state, req)),
        _ => None,
    }
}
