use crate::ipc::error::ok;
use crate::ipc::helpers::{complaint_json, db_conn, form_str, principal_json, required_id};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let db = match db_conn(&state.db, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let email = match form_str(req, "email") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let password = match form_str(req, "password") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let principal = state.session.login(db, &email, &password);
    ok(&req.id, principal_json(principal))
}

fn handle_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.session.logout();
    ok(&req.id, json!({ "loggedOut": true }))
}

fn handle_current(state: &mut AppState, req: &Request) -> serde_json::Value {
    let mut result = principal_json(state.session.principal());
    result["complaint"] = state
        .session
        .current_complaint()
        .map(complaint_json)
        .unwrap_or(serde_json::Value::Null);
    ok(&req.id, result)
}

fn handle_select_complaint(state: &mut AppState, req: &Request) -> serde_json::Value {
    let db = match db_conn(&state.db, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let id = match required_id(req, "complaintId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let complaint = state.session.select_complaint(db, id).map(complaint_json);
    ok(&req.id, json!({ "complaint": complaint }))
}

fn handle_clear_complaint(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.session.clear_selected_complaint();
    ok(&req.id, json!({ "cleared": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "session.login" => Some(handle_login(state, req)),
        "session.logout" => Some(handle_logout(state, req)),
        "session.current" => Some(handle_current(state, req)),
        "session.selectComplaint" => Some(handle_select_complaint(state, req)),
        "session.clearComplaint" => Some(handle_clear_complaint(state, req)),
        _ => None,
    }
}
