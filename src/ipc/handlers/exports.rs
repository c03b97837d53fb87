use std::fs;

use serde_json::json;

use crate::db::{self, ListOrder};
use crate::export;
use crate::filter;
use crate::ipc::error::{err, ok};
use crate::ipc::handlers::{db_conn, students};
use crate::ipc::types::{AppState, Request};

fn handle_csv(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let filters = match students::parse_filters(req) {
        Ok(f) => f,
        Err(resp) => return resp,
    };

    let roster = match db::select_students(conn, ListOrder::CreatedDesc) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", format!("{e:?}"), None),
    };
    let filtered = filter::apply(&roster, &filters);
    let csv = export::students_csv(&filtered);

    let Some(workspace) = state.workspace.as_deref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let dir = workspace.join("exports");
    if let Err(e) = fs::create_dir_all(&dir) {
        return err(&req.id, "export_failed", format!("{e:?}"), None);
    }
    let path = dir.join("students_export.csv");
    if let Err(e) = fs::write(&path, &csv) {
        return err(&req.id, "export_failed", format!("{e:?}"), None);
    }

    ok(
        &req.id,
        json!({
            "path": path.to_string_lossy(),
            "csv": csv,
            "rows": filtered.len(),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "export.csv" => Some(handle_csv(state, req)),
        _ => None,
    }
}
