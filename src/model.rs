use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How long a freshly issued card stays valid.
pub const CARD_VALIDITY_YEARS: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Active,
    Inactive,
    Expired,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Active => "active",
            Status::Inactive => "inactive",
            Status::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Option<Status> {
        match s {
            "active" => Some(Status::Active),
            "inactive" => Some(Status::Inactive),
            "expired" => Some(Status::Expired),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Department {
    pub name: &'static str,
    pub code: &'static str,
}

/// Closed set of departments offered for registration.
pub const DEPARTMENTS: [Department; 10] = [
    Department { name: "Computer Science", code: "CSC" },
    Department { name: "Electrical Engineering", code: "EEE" },
    Department { name: "Mechanical Engineering", code: "MEE" },
    Department { name: "Civil Engineering", code: "CVE" },
    Department { name: "Business Administration", code: "BUA" },
    Department { name: "Economics", code: "ECO" },
    Department { name: "Mathematics", code: "MTH" },
    Department { name: "Physics", code: "PHY" },
    Department { name: "Chemistry", code: "CHM" },
    Department { name: "Biology", code: "BIO" },
];

pub const LEVELS: [&str; 6] = [
    "100 Level",
    "200 Level",
    "300 Level",
    "400 Level",
    "500 Level",
    "Postgraduate",
];

pub const BLOOD_GROUPS: [&str; 8] = ["A+", "A-", "B+", "B-", "AB+", "AB-", "O+", "O-"];

pub fn is_known_department(name: &str) -> bool {
    DEPARTMENTS.iter().any(|d| d.name == name)
}

pub fn is_known_level(level: &str) -> bool {
    LEVELS.contains(&level)
}

pub fn is_known_blood_group(group: &str) -> bool {
    BLOOD_GROUPS.contains(&group)
}

/// A persisted student record. Timestamps are RFC 3339 strings;
/// `date_of_birth` is a plain `YYYY-MM-DD` date.
#[derive(Debug, Clone, Serialize)]
pub struct Student {
    pub id: String,
    pub student_id: String,
    pub matric_no: String,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub department: String,
    pub level: String,
    pub photo_url: Option<String>,
    pub date_of_birth: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub emergency_contact: String,
    pub emergency_phone: String,
    pub blood_group: Option<String>,
    pub date_registered: String,
    pub expiry_date: String,
    pub status: Status,
    pub created_at: String,
    pub updated_at: String,
}

impl Student {
    /// "FIRST [MIDDLE] LAST", as printed on the card face.
    pub fn display_name_upper(&self) -> String {
        let mut name = self.first_name.to_uppercase();
        if let Some(middle) = self.middle_name.as_deref() {
            if !middle.is_empty() {
                name.push(' ');
                name.push_str(&middle.to_uppercase());
            }
        }
        name.push(' ');
        name.push_str(&self.last_name.to_uppercase());
        name
    }

    /// Fallback shown in the photo box when no photo is on file.
    pub fn initials(&self) -> String {
        let mut out = String::new();
        if let Some(c) = self.first_name.chars().next() {
            out.extend(c.to_uppercase());
        }
        if let Some(c) = self.last_name.chars().next() {
            out.extend(c.to_uppercase());
        }
        out
    }

    /// Calendar date of registration, if the stored timestamp parses.
    pub fn registered_date(&self) -> Option<NaiveDate> {
        DateTime::parse_from_rfc3339(&self.date_registered)
            .ok()
            .map(|dt| dt.date_naive())
    }
}

/// Formats an RFC 3339 timestamp as "Jan 5, 2025" for card faces and the
/// CSV roster. Unparseable input is passed through untouched.
pub fn format_card_date(rfc3339: &str) -> String {
    match DateTime::parse_from_rfc3339(rfc3339) {
        Ok(dt) => format!("{} {}, {}", dt.format("%b"), dt.day(), dt.year()),
        Err(_) => rfc3339.to_string(),
    }
}

/// Short locale date ("1/5/2025") used where a comma-free value is needed,
/// such as CSV roster rows. Unparseable input is passed through untouched.
pub fn format_short_date(rfc3339: &str) -> String {
    match DateTime::parse_from_rfc3339(rfc3339) {
        Ok(dt) => format!("{}/{}/{}", dt.month(), dt.day(), dt.year()),
        Err(_) => rfc3339.to_string(),
    }
}

/// Registration end date: start of validity plus `years` calendar years.
/// A Feb 29 start rolls over to Mar 1 when the target year is not a leap year.
pub fn expiry_after_years(from: DateTime<Utc>, years: i32) -> DateTime<Utc> {
    from.with_year(from.year() + years)
        .unwrap_or_else(|| {
            let shifted = from + Duration::days(1);
            shifted
                .with_year(from.year() + years)
                .unwrap_or(shifted)
        })
}

/// Raw registration input. Empty strings count as missing so that the
/// per-field validation below reports them all at once.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterForm {
    pub matric_no: String,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: String,
    pub department: String,
    pub level: String,
    pub date_of_birth: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub emergency_contact: String,
    pub emergency_phone: String,
    pub blood_group: String,
    pub photo_path: String,
}

impl RegisterForm {
    /// Field-by-field validation, collected before anything is written.
    /// Returns an empty map when the form is acceptable.
    pub fn validate(&self) -> BTreeMap<&'static str, String> {
        let mut errors = BTreeMap::new();

        let required: [(&'static str, &str); 9] = [
            ("matric_no", &self.matric_no),
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("department", &self.department),
            ("level", &self.level),
            ("phone", &self.phone),
            ("address", &self.address),
            ("emergency_contact", &self.emergency_contact),
            ("emergency_phone", &self.emergency_phone),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                errors.insert(field, "is required".to_string());
            }
        }

        if self.email.trim().is_empty() {
            errors.insert("email", "is required".to_string());
        } else if !is_plausible_email(&self.email) {
            errors.insert("email", "is not a valid email address".to_string());
        }

        if self.date_of_birth.trim().is_empty() {
            errors.insert("date_of_birth", "is required".to_string());
        } else if NaiveDate::parse_from_str(&self.date_of_birth, "%Y-%m-%d").is_err() {
            errors.insert("date_of_birth", "must be a YYYY-MM-DD date".to_string());
        }

        if !self.department.trim().is_empty() && !is_known_department(&self.department) {
            errors.insert("department", "is not a known department".to_string());
        }
        if !self.level.trim().is_empty() && !is_known_level(&self.level) {
            errors.insert("level", "is not a known level".to_string());
        }
        if !self.blood_group.is_empty() && !is_known_blood_group(&self.blood_group) {
            errors.insert("blood_group", "is not a known blood group".to_string());
        }

        errors
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_student() -> Student {
        Student {
            id: "u-1".to_string(),
            student_id: "CSC/25/0042".to_string(),
            matric_no: "20/1234".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            middle_name: None,
            department: "Computer Science".to_string(),
            level: "200 Level".to_string(),
            photo_url: None,
            date_of_birth: "2004-03-14".to_string(),
            email: "jane.doe@university.edu".to_string(),
            phone: "+1 555 0100".to_string(),
            address: "12 College Rd".to_string(),
            emergency_contact: "John Doe".to_string(),
            emergency_phone: "+1 555 0101".to_string(),
            blood_group: Some("O+".to_string()),
            date_registered: "2025-01-05T09:30:00+00:00".to_string(),
            expiry_date: "2029-01-05T09:30:00+00:00".to_string(),
            status: Status::Active,
            created_at: "2025-01-05T09:30:00+00:00".to_string(),
            updated_at: "2025-01-05T09:30:00+00:00".to_string(),
        }
    }

    #[test]
    fn display_name_includes_optional_middle_name() {
        let mut s = sample_student();
        assert_eq!(s.display_name_upper(), "JANE DOE");
        s.middle_name = Some("Amara".to_string());
        assert_eq!(s.display_name_upper(), "JANE AMARA DOE");
    }

    #[test]
    fn initials_take_first_chars_uppercased() {
        let mut s = sample_student();
        s.first_name = "jane".to_string();
        s.last_name = "doe".to_string();
        assert_eq!(s.initials(), "JD");
    }

    #[test]
    fn card_date_format_matches_locale_style() {
        assert_eq!(format_card_date("2025-01-05T09:30:00+00:00"), "Jan 5, 2025");
        assert_eq!(format_card_date("2024-11-30T23:59:59+00:00"), "Nov 30, 2024");
        // Unparseable input falls through unchanged.
        assert_eq!(format_card_date("not-a-date"), "not-a-date");
        assert_eq!(format_short_date("2025-01-05T09:30:00+00:00"), "1/5/2025");
    }

    #[test]
    fn expiry_is_four_years_out_with_leap_day_rollover() {
        let start = Utc.with_ymd_and_hms(2025, 1, 5, 9, 30, 0).unwrap();
        assert_eq!(
            expiry_after_years(start, CARD_VALIDITY_YEARS),
            Utc.with_ymd_and_hms(2029, 1, 5, 9, 30, 0).unwrap()
        );

        // Four years out of a leap day lands on another leap year.
        let leap = Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap();
        assert_eq!(
            expiry_after_years(leap, CARD_VALIDITY_YEARS),
            Utc.with_ymd_and_hms(2028, 2, 29, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn register_form_reports_all_missing_fields() {
        let form = RegisterForm::default();
        let errors = form.validate();
        for field in [
            "matric_no",
            "first_name",
            "last_name",
            "department",
            "level",
            "date_of_birth",
            "email",
            "phone",
            "address",
            "emergency_contact",
            "emergency_phone",
        ] {
            assert!(errors.contains_key(field), "missing error for {}", field);
        }
        assert!(!errors.contains_key("blood_group"));
    }

    #[test]
    fn register_form_checks_enumerations_and_formats() {
        let form = RegisterForm {
            matric_no: "20/1234".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            department: "Astrology".to_string(),
            level: "600 Level".to_string(),
            date_of_birth: "14-03-2004".to_string(),
            email: "not-an-email".to_string(),
            phone: "1".to_string(),
            address: "a".to_string(),
            emergency_contact: "b".to_string(),
            emergency_phone: "c".to_string(),
            blood_group: "Z+".to_string(),
            ..RegisterForm::default()
        };
        let errors = form.validate();
        assert!(errors.contains_key("department"));
        assert!(errors.contains_key("level"));
        assert!(errors.contains_key("date_of_birth"));
        assert!(errors.contains_key("email"));
        assert!(errors.contains_key("blood_group"));
    }

    #[test]
    fn leap_day_expiry_into_common_year_rolls_to_march() {
        let leap = Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap();
        assert_eq!(
            expiry_after_years(leap, 3).date_naive(),
            NaiveDate::from_ymd_opt(2027, 3, 1).unwrap()
        );
    }
}
