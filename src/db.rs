use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

use crate::model::{Status, Student};

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("idcard.sqlite3");
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            matric_no TEXT NOT NULL UNIQUE,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            middle_name TEXT,
            department TEXT NOT NULL,
            level TEXT NOT NULL,
            photo_url TEXT,
            date_of_birth TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT NOT NULL,
            address TEXT NOT NULL,
            emergency_contact TEXT NOT NULL,
            emergency_phone TEXT NOT NULL,
            blood_group TEXT,
            date_registered TEXT NOT NULL,
            expiry_date TEXT NOT NULL,
            status TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_created ON students(created_at)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_last_name ON students(last_name)",
        [],
    )?;

    // One configuration row, updated in place on every save.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            id INTEGER PRIMARY KEY CHECK (id = 1),
            payload TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    Ok(conn)
}

/// Roster orderings available to callers; every listing call site names one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOrder {
    CreatedDesc,
    LastNameAsc,
}

impl ListOrder {
    pub fn parse(s: &str) -> Option<ListOrder> {
        match s {
            "createdDesc" => Some(ListOrder::CreatedDesc),
            "lastNameAsc" => Some(ListOrder::LastNameAsc),
            _ => None,
        }
    }

    fn order_clause(self) -> &'static str {
        match self {
            ListOrder::CreatedDesc => "created_at DESC, rowid DESC",
            ListOrder::LastNameAsc => "last_name ASC, first_name ASC, rowid ASC",
        }
    }
}

const STUDENT_COLUMNS: &str = "id, student_id, matric_no, first_name, last_name, middle_name,
    department, level, photo_url, date_of_birth, email, phone, address,
    emergency_contact, emergency_phone, blood_group, date_registered,
    expiry_date, status, created_at, updated_at";

fn student_from_row(row: &Row<'_>) -> rusqlite::Result<Student> {
    let status_raw: String = row.get(18)?;
    let status = Status::parse(&status_raw).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(
            18,
            format!("status {}", status_raw),
            rusqlite::types::Type::Text,
        )
    })?;
    Ok(Student {
        id: row.get(0)?,
        student_id: row.get(1)?,
        matric_no: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        middle_name: row.get(5)?,
        department: row.get(6)?,
        level: row.get(7)?,
        photo_url: row.get(8)?,
        date_of_birth: row.get(9)?,
        email: row.get(10)?,
        phone: row.get(11)?,
        address: row.get(12)?,
        emergency_contact: row.get(13)?,
        emergency_phone: row.get(14)?,
        blood_group: row.get(15)?,
        date_registered: row.get(16)?,
        expiry_date: row.get(17)?,
        status,
        created_at: row.get(19)?,
        updated_at: row.get(20)?,
    })
}

pub fn select_students(conn: &Connection, order: ListOrder) -> anyhow::Result<Vec<Student>> {
    let sql = format!(
        "SELECT {} FROM students ORDER BY {}",
        STUDENT_COLUMNS,
        order.order_clause()
    );
    let mut stmt = conn.prepare(&sql)?;
    let students = stmt
        .query_map([], student_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(students)
}

pub fn select_student(conn: &Connection, id: &str) -> anyhow::Result<Option<Student>> {
    let sql = format!("SELECT {} FROM students WHERE id = ?", STUDENT_COLUMNS);
    Ok(conn.query_row(&sql, [id], student_from_row).optional()?)
}

pub fn matric_exists(conn: &Connection, matric_no: &str) -> anyhow::Result<bool> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM students WHERE matric_no = ?",
            [matric_no],
            |r| r.get::<_, i64>(0),
        )
        .optional()?
        .is_some())
}

/// Outcome of an insert attempt; a UNIQUE violation on the matric number is
/// reported distinctly so the IPC layer can surface it as a form-level error.
pub enum InsertOutcome {
    Inserted,
    DuplicateMatric,
}

pub fn insert_student(conn: &Connection, s: &Student) -> anyhow::Result<InsertOutcome> {
    let result = conn.execute(
        "INSERT INTO students(
            id, student_id, matric_no, first_name, last_name, middle_name,
            department, level, photo_url, date_of_birth, email, phone, address,
            emergency_contact, emergency_phone, blood_group, date_registered,
            expiry_date, status, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                  ?15, ?16, ?17, ?18, ?19, ?20, ?21)",
        params![
            s.id,
            s.student_id,
            s.matric_no,
            s.first_name,
            s.last_name,
            s.middle_name,
            s.department,
            s.level,
            s.photo_url,
            s.date_of_birth,
            s.email,
            s.phone,
            s.address,
            s.emergency_contact,
            s.emergency_phone,
            s.blood_group,
            s.date_registered,
            s.expiry_date,
            s.status.as_str(),
            s.created_at,
            s.updated_at,
        ],
    );
    match result {
        Ok(_) => Ok(InsertOutcome::Inserted),
        Err(rusqlite::Error::SqliteFailure(e, msg))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            log::warn!(
                "matric uniqueness constraint rejected insert: {}",
                msg.as_deref().unwrap_or("unique violation")
            );
            Ok(InsertOutcome::DuplicateMatric)
        }
        Err(e) => Err(e.into()),
    }
}

pub fn set_photo_url(
    conn: &Connection,
    id: &str,
    photo_url: &str,
    updated_at: &str,
) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE students SET photo_url = ?1, updated_at = ?2 WHERE id = ?3",
        params![photo_url, updated_at, id],
    )?;
    Ok(())
}

pub fn delete_student(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let removed = conn.execute("DELETE FROM students WHERE id = ?", [id])?;
    Ok(removed > 0)
}

pub fn settings_upsert(
    conn: &Connection,
    payload: &serde_json::Value,
    updated_at: &str,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(id, payload, updated_at) VALUES (1, ?1, ?2)
         ON CONFLICT(id) DO UPDATE SET payload = excluded.payload,
                                       updated_at = excluded.updated_at",
        params![payload.to_string(), updated_at],
    )?;
    Ok(())
}

pub fn settings_get(conn: &Connection) -> anyhow::Result<Option<(serde_json::Value, String)>> {
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT payload, updated_at FROM settings WHERE id = 1",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;
    match row {
        Some((payload, updated_at)) => Ok(Some((serde_json::from_str(&payload)?, updated_at))),
        None => Ok(None),
    }
}
