use crate::model::{format_short_date, Student};

/// Fixed roster columns, in documented order.
pub const CSV_HEADER: &str = "Student ID,Matric No,First Name,Last Name,Department,Level,Email,Phone,Status,Date Registered";

/// Serializes the (already filtered) roster as comma-separated text: the
/// header row plus one row per student. Values are emitted verbatim except
/// the registration date, which uses the short locale form. Embedded commas
/// in field values are not escaped; the upstream contract leaves that
/// unspecified.
pub fn students_csv(students: &[Student]) -> String {
    let mut csv = String::from(CSV_HEADER);
    csv.push('\n');
    for s in students {
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{}\n",
            s.student_id,
            s.matric_no,
            s.first_name,
            s.last_name,
            s.department,
            s.level,
            s.email,
            s.phone,
            s.status.as_str(),
            format_short_date(&s.date_registered),
        ));
    }
    csv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Status;

    fn student(n: u32) -> Student {
        Student {
            id: format!("u-{}", n),
            student_id: format!("CSC/25/{:04}", n),
            matric_no: format!("25/{:04}", n),
            first_name: format!("First{}", n),
            last_name: format!("Last{}", n),
            middle_name: None,
            department: "Computer Science".to_string(),
            level: "100 Level".to_string(),
            photo_url: None,
            date_of_birth: "2005-06-01".to_string(),
            email: format!("first{}@university.edu", n),
            phone: "+1 555 0100".to_string(),
            address: "12 College Rd".to_string(),
            emergency_contact: "Contact".to_string(),
            emergency_phone: "+1 555 0101".to_string(),
            blood_group: None,
            date_registered: "2025-01-05T09:30:00+00:00".to_string(),
            expiry_date: "2029-01-05T09:30:00+00:00".to_string(),
            status: Status::Active,
            created_at: "2025-01-05T09:30:00+00:00".to_string(),
            updated_at: "2025-01-05T09:30:00+00:00".to_string(),
        }
    }

    #[test]
    fn two_students_produce_header_plus_two_rows() {
        let csv = students_csv(&[student(1), student(2)]);
        let lines: Vec<&str> = csv.trim_end().lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].starts_with("CSC/25/0001,25/0001,First1,Last1,"));
        assert!(lines[2].starts_with("CSC/25/0002,25/0002,First2,Last2,"));
    }

    #[test]
    fn rows_keep_the_documented_column_order() {
        let csv = students_csv(&[student(7)]);
        let row = csv.trim_end().lines().nth(1).expect("data row");
        let cols: Vec<&str> = row.split(',').collect();
        assert_eq!(cols.len(), CSV_HEADER.split(',').count());
        assert_eq!(cols[0], "CSC/25/0007");
        assert_eq!(cols[8], "active");
        assert_eq!(cols[9], "1/5/2025");
    }

    #[test]
    fn empty_roster_is_just_the_header() {
        let csv = students_csv(&[]);
        assert_eq!(csv, format!("{}\n", CSV_HEADER));
    }
}
