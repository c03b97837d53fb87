use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use serde_json::json;

use crate::card;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::handlers::{db_conn, required_str, settings};
use crate::ipc::types::{AppState, Request};
use crate::model::Student;
use crate::pdf;
use crate::qr::{self, QrPayload, BATCH_QR_WIDTH, SINGLE_QR_WIDTH};

fn exports_dir(state: &AppState, req: &Request) -> Result<PathBuf, serde_json::Value> {
    let Some(workspace) = state.workspace.as_deref() else {
        return Err(err(&req.id, "no_workspace", "select a workspace first", None));
    };
    let dir = workspace.join("exports");
    fs::create_dir_all(&dir)
        .map_err(|e| err(&req.id, "export_failed", format!("{e:?}"), None))?;
    Ok(dir)
}

fn load_student(
    state: &AppState,
    req: &Request,
    id: &str,
) -> Result<Student, serde_json::Value> {
    let conn = db_conn(state, req)?;
    match db::select_student(conn, id) {
        Ok(Some(s)) => Ok(s),
        Ok(None) => Err(err(&req.id, "not_found", "student not found", None)),
        Err(e) => Err(err(&req.id, "db_query_failed", format!("{e:?}"), None)),
    }
}

/// Path-safe rendition of user-supplied text used in export filenames,
/// e.g. a display identifier like `CSC/25/0042` or a student name.
fn filename_component(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            other => other,
        })
        .collect()
}

fn handle_single(state: &mut AppState, req: &Request) -> serde_json::Value {
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let student = match load_student(state, req, &id) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let institution = match db_conn(state, req) {
        Ok(conn) => settings::institution_name(conn),
        Err(resp) => return resp,
    };
    let dir = match exports_dir(state, req) {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    let path = dir.join(format!(
        "{}_{}_ID_Card.pdf",
        filename_component(&student.first_name),
        filename_component(&student.last_name)
    ));
    match pdf::single_card_pdf(&student, &institution, &path) {
        Ok(()) => ok(
            &req.id,
            json!({ "path": path.to_string_lossy(), "pages": 1 }),
        ),
        Err(e) => err(&req.id, "export_failed", format!("{e:?}"), None),
    }
}

fn handle_batch(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ids: Vec<String> = match req.params.get("ids").and_then(|v| v.as_array()) {
        Some(raw) => raw
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.to_string())
            .collect(),
        None => return err(&req.id, "bad_params", "missing params.ids", None),
    };
    if ids.is_empty() {
        return err(&req.id, "bad_params", "select at least one student", None);
    }

    let mut students = Vec::with_capacity(ids.len());
    for id in &ids {
        match load_student(state, req, id) {
            Ok(s) => students.push(s),
            Err(resp) => return resp,
        }
    }
    let institution = match db_conn(state, req) {
        Ok(conn) => settings::institution_name(conn),
        Err(resp) => return resp,
    };
    let dir = match exports_dir(state, req) {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    let path = dir.join(format!(
        "student_id_cards_batch_{}.pdf",
        Utc::now().format("%Y-%m-%d")
    ));
    match pdf::batch_pdf(&students, &institution, &path) {
        Ok(summary) => ok(
            &req.id,
            json!({
                "path": path.to_string_lossy(),
                "cards": summary.cards,
                "pages": summary.pages,
            }),
        ),
        Err(e) => err(&req.id, "export_failed", format!("{e:?}"), None),
    }
}

/// Surface-independent card description for the on-screen view; the same
/// faces the PDF writer draws.
fn handle_describe(state: &mut AppState, req: &Request) -> serde_json::Value {
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let student = match load_student(state, req, &id) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let institution = match db_conn(state, req) {
        Ok(conn) => settings::institution_name(conn),
        Err(resp) => return resp,
    };

    let front = match card::front_face(&student, &institution) {
        Ok(f) => f,
        Err(e) => return err(&req.id, "export_failed", format!("{e:?}"), None),
    };
    let back = card::back_face(&student);
    ok(&req.id, json!({ "front": front, "back": back }))
}

/// Writes the student's QR image at the fixed width for the requested
/// surface: 100 px for the single-card view, 60 px for batch thumbnails.
fn handle_qr(state: &mut AppState, req: &Request) -> serde_json::Value {
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let width = match req.params.get("surface").and_then(|v| v.as_str()) {
        None | Some("single") => SINGLE_QR_WIDTH,
        Some("batch") => BATCH_QR_WIDTH,
        Some(other) => {
            return err(
                &req.id,
                "bad_params",
                "surface must be one of: single, batch",
                Some(json!({ "surface": other })),
            )
        }
    };
    let student = match load_student(state, req, &id) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let dir = match exports_dir(state, req) {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    let payload = match QrPayload::for_student(&student).to_json() {
        Ok(p) => p,
        Err(e) => return err(&req.id, "export_failed", format!("{e:?}"), None),
    };
    let image = match qr::render_image(&payload, width) {
        Ok(img) => img,
        Err(e) => return err(&req.id, "export_failed", format!("{e:?}"), None),
    };
    let path = dir.join(format!(
        "qr_{}_{}px.png",
        filename_component(&student.student_id),
        width
    ));
    match image.save(&path) {
        Ok(()) => ok(
            &req.id,
            json!({ "path": path.to_string_lossy(), "width": width }),
        ),
        Err(e) => err(&req.id, "export_failed", format!("{e:?}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "cards.single" => Some(handle_single(state, req)),
        "cards.batch" => Some(handle_batch(state, req)),
        "cards.describe" => Some(handle_describe(state, req)),
        "cards.qr" => Some(handle_qr(state, req)),
        _ => None,
    }
}
