use chrono::Utc;
use rusqlite::Connection;
use serde_json::json;

use crate::card::DEFAULT_INSTITUTION;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::handlers::db_conn;
use crate::ipc::types::{AppState, Request};

/// Institution name printed on card headers: the saved configuration when one
/// exists, the built-in default otherwise.
pub(crate) fn institution_name(conn: &Connection) -> String {
    match db::settings_get(conn) {
        Ok(Some((payload, _))) => payload
            .pointer("/institution/name")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.to_string())
            .unwrap_or_else(|| DEFAULT_INSTITUTION.to_string()),
        Ok(None) => DEFAULT_INSTITUTION.to_string(),
        Err(e) => {
            log::warn!("settings read failed, using default institution: {e:?}");
            DEFAULT_INSTITUTION.to_string()
        }
    }
}

fn handle_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let Some(payload) = req.params.get("settings") else {
        return err(&req.id, "bad_params", "missing params.settings", None);
    };
    if !payload.is_object() {
        return err(&req.id, "bad_params", "params.settings must be an object", None);
    }

    let updated_at = Utc::now().to_rfc3339();
    match db::settings_upsert(conn, payload, &updated_at) {
        Ok(()) => ok(&req.id, json!({ "updatedAt": updated_at })),
        Err(e) => err(&req.id, "db_insert_failed", format!("{e:?}"), None),
    }
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match db::settings_get(conn) {
        Ok(Some((payload, updated_at))) => ok(
            &req.id,
            json!({ "settings": payload, "updatedAt": updated_at }),
        ),
        Ok(None) => ok(&req.id, json!({ "settings": null })),
        Err(e) => err(&req.id, "db_query_failed", format!("{e:?}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "settings.save" => Some(handle_save(state, req)),
        "settings.get" => Some(handle_get(state, req)),
        _ => None,
    }
}
