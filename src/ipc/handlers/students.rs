use chrono::{Datelike, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::db::{self, InsertOutcome, ListOrder};
use crate::filter::{self, StudentFilters};
use crate::idgen;
use crate::ipc::error::{err, ok};
use crate::ipc::handlers::{db_conn, required_str};
use crate::ipc::types::{AppState, Request};
use crate::model::{expiry_after_years, RegisterForm, Status, Student, CARD_VALIDITY_YEARS};
use crate::photos;

fn parse_order(req: &Request) -> Result<ListOrder, serde_json::Value> {
    match req.params.get("order").and_then(|v| v.as_str()) {
        None => Ok(ListOrder::CreatedDesc),
        Some(raw) => ListOrder::parse(raw).ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                "order must be one of: createdDesc, lastNameAsc",
                Some(json!({ "order": raw })),
            )
        }),
    }
}

pub(crate) fn parse_filters(req: &Request) -> Result<StudentFilters, serde_json::Value> {
    match req.params.get("filters") {
        None | Some(serde_json::Value::Null) => Ok(StudentFilters::default()),
        Some(raw) => serde_json::from_value(raw.clone())
            .map_err(|e| err(&req.id, "bad_params", format!("bad filters: {}", e), None)),
    }
}

fn handle_register(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    let form: RegisterForm = match serde_json::from_value(req.params.clone()) {
        Ok(f) => f,
        Err(e) => return err(&req.id, "bad_params", format!("bad form: {}", e), None),
    };

    let field_errors = form.validate();
    if !field_errors.is_empty() {
        let details: serde_json::Map<String, serde_json::Value> = field_errors
            .into_iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect();
        return err(
            &req.id,
            "validation_failed",
            "registration input is invalid",
            Some(serde_json::Value::Object(details)),
        );
    }

    // Synchronous pre-check for a friendly form-level error. The UNIQUE
    // constraint below is the backstop for the check-then-act window.
    match db::matric_exists(conn, &form.matric_no) {
        Ok(true) => {
            return err(
                &req.id,
                "duplicate_matric",
                "a student with this matric number already exists",
                None,
            )
        }
        Ok(false) => {}
        Err(e) => return err(&req.id, "db_query_failed", format!("{e:?}"), None),
    }

    let now = Utc::now();
    let now_str = now.to_rfc3339();
    let student_id = idgen::generate_student_id(&form.department, &now.year().to_string());
    let expiry = expiry_after_years(now, CARD_VALIDITY_YEARS);

    let mut student = Student {
        id: Uuid::new_v4().to_string(),
        student_id,
        matric_no: form.matric_no.clone(),
        first_name: form.first_name.clone(),
        last_name: form.last_name.clone(),
        middle_name: if form.middle_name.is_empty() {
            None
        } else {
            Some(form.middle_name.clone())
        },
        department: form.department.clone(),
        level: form.level.clone(),
        photo_url: None,
        date_of_birth: form.date_of_birth.clone(),
        email: form.email.clone(),
        phone: form.phone.clone(),
        address: form.address.clone(),
        emergency_contact: form.emergency_contact.clone(),
        emergency_phone: form.emergency_phone.clone(),
        blood_group: if form.blood_group.is_empty() {
            None
        } else {
            Some(form.blood_group.clone())
        },
        date_registered: now_str.clone(),
        expiry_date: expiry.to_rfc3339(),
        status: Status::Active,
        created_at: now_str.clone(),
        updated_at: now_str.clone(),
    };

    match db::insert_student(conn, &student) {
        Ok(InsertOutcome::Inserted) => {}
        Ok(InsertOutcome::DuplicateMatric) => {
            return err(
                &req.id,
                "duplicate_matric",
                "a student with this matric number already exists",
                None,
            )
        }
        Err(e) => return err(&req.id, "db_insert_failed", format!("{e:?}"), None),
    }

    // Photo storage runs after the insert so a failed copy can never orphan
    // a blob or sink the registration.
    let mut photo_attached = false;
    if let (false, Some(workspace)) = (form.photo_path.is_empty(), state.workspace.as_deref()) {
        match photos::attach_photo(workspace, &student.student_id, form.photo_path.as_ref()) {
            Ok(stored) => {
                let url = stored.to_string_lossy().to_string();
                let patched_at = Utc::now().to_rfc3339();
                match db::set_photo_url(conn, &student.id, &url, &patched_at) {
                    Ok(()) => {
                        student.photo_url = Some(url);
                        student.updated_at = patched_at;
                        photo_attached = true;
                    }
                    Err(e) => log::warn!("photo stored but url patch failed: {e:?}"),
                }
            }
            Err(e) => log::warn!("photo attach failed, registering without photo: {e:?}"),
        }
    }

    ok(
        &req.id,
        json!({ "student": student, "photoAttached": photo_attached }),
    )
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let order = match parse_order(req) {
        Ok(o) => o,
        Err(resp) => return resp,
    };
    match db::select_students(conn, order) {
        Ok(students) => {
            let total = students.len();
            ok(&req.id, json!({ "students": students, "total": total }))
        }
        Err(e) => err(&req.id, "db_query_failed", format!("{e:?}"), None),
    }
}

fn handle_search(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let order = match parse_order(req) {
        Ok(o) => o,
        Err(resp) => return resp,
    };
    let filters = match parse_filters(req) {
        Ok(f) => f,
        Err(resp) => return resp,
    };

    let students = match db::select_students(conn, order) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", format!("{e:?}"), None),
    };
    let total = students.len();
    let matched = filter::apply(&students, &filters);
    let matched_len = matched.len();
    ok(
        &req.id,
        json!({
            "students": matched,
            "matched": matched_len,
            "total": total,
        }),
    )
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let removed = match db::select_student(conn, &id) {
        Ok(Some(s)) => s,
        Ok(None) => return err(&req.id, "not_found", "student not found", None),
        Err(e) => return err(&req.id, "db_query_failed", format!("{e:?}"), None),
    };
    match db::delete_student(conn, &id) {
        Ok(true) => ok(&req.id, json!({ "deleted": removed })),
        Ok(false) => err(&req.id, "not_found", "student not found", None),
        Err(e) => err(&req.id, "db_query_failed", format!("{e:?}"), None),
    }
}

fn handle_stats(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let students = match db::select_students(conn, ListOrder::CreatedDesc) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", format!("{e:?}"), None),
    };

    let now = Utc::now();
    let mut active = 0usize;
    let mut inactive = 0usize;
    let mut expired = 0usize;
    let mut this_month = 0usize;
    for s in &students {
        match s.status {
            Status::Active => active += 1,
            Status::Inactive => inactive += 1,
            Status::Expired => expired += 1,
        }
        if let Some(registered) = s.registered_date() {
            if registered.year() == now.year() && registered.month() == now.month() {
                this_month += 1;
            }
        }
    }
    let recent: Vec<&Student> = students.iter().take(5).collect();

    ok(
        &req.id,
        json!({
            "total": students.len(),
            "active": active,
            "inactive": inactive,
            "expired": expired,
            "thisMonth": this_month,
            "recent": recent,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.register" => Some(handle_register(state, req)),
        "students.list" => Some(handle_list(state, req)),
        "students.search" => Some(handle_search(state, req)),
        "students.delete" => Some(handle_delete(state, req)),
        "students.stats" => Some(handle_stats(state, req)),
        _ => None,
    }
}
