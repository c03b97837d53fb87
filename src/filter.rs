use chrono::NaiveDate;
use serde::Deserialize;

use crate::model::Student;

/// One filter pass over the roster. Empty strings mean "no constraint";
/// all active predicates are AND-ed together.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StudentFilters {
    pub search_term: String,
    pub department: String,
    pub level: String,
    pub status: String,
    pub date_from: String,
    pub date_to: String,
}

/// Narrows `students` to those matching every active predicate, preserving
/// the input ordering. Never widens and never re-sorts.
pub fn apply(students: &[Student], filters: &StudentFilters) -> Vec<Student> {
    let term = filters.search_term.to_lowercase();
    let date_from = parse_bound(&filters.date_from);
    let date_to = parse_bound(&filters.date_to);

    students
        .iter()
        .filter(|s| {
            (term.is_empty() || matches_search(s, &term))
                && (filters.department.is_empty() || s.department == filters.department)
                && (filters.level.is_empty() || s.level == filters.level)
                && (filters.status.is_empty() || s.status.as_str() == filters.status)
                && within_registration_range(s, date_from, date_to)
        })
        .cloned()
        .collect()
}

fn matches_search(s: &Student, term_lower: &str) -> bool {
    [
        &s.first_name,
        &s.last_name,
        &s.matric_no,
        &s.student_id,
        &s.email,
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(term_lower))
}

fn within_registration_range(
    s: &Student,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
) -> bool {
    if date_from.is_none() && date_to.is_none() {
        return true;
    }
    // A record whose registration date does not parse cannot satisfy a
    // date-range constraint.
    let Some(registered) = s.registered_date() else {
        return false;
    };
    if let Some(from) = date_from {
        if registered < from {
            return false;
        }
    }
    if let Some(to) = date_to {
        if registered > to {
            return false;
        }
    }
    true
}

fn parse_bound(raw: &str) -> Option<NaiveDate> {
    if raw.is_empty() {
        return None;
    }
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(d) => Some(d),
        Err(_) => {
            log::warn!("ignoring unparseable date bound: {}", raw);
            None
        }
    }
}
