use rand::Rng;

use crate::model::DEPARTMENTS;

/// Builds a display identifier `<DEPTCODE>/<YY>/<NNNN>` from the department
/// name, the registration year and a random suffix. The suffix is not checked
/// for collisions; only the matric number carries a uniqueness guarantee.
pub fn generate_student_id(department: &str, year: &str) -> String {
    let suffix = rand::thread_rng().gen_range(0..10_000);
    student_id_with_suffix(department, year, suffix)
}

pub fn student_id_with_suffix(department: &str, year: &str, suffix: u32) -> String {
    // Unknown department names (possible in old rows) fall back to the first
    // three letters uppercased.
    let dept_code: String = match DEPARTMENTS.iter().find(|d| d.name == department) {
        Some(d) => d.code.to_string(),
        None => department.chars().take(3).flat_map(char::to_uppercase).collect(),
    };
    let year_chars: Vec<char> = year.chars().collect();
    let year_code: String = year_chars
        .iter()
        .skip(year_chars.len().saturating_sub(2))
        .collect();
    format!("{}/{}/{:04}", dept_code, year_code, suffix % 10_000)
}
