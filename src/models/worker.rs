use serde::{Deserialize, Deserializer};

/// Order of the date components in a source system's birth date field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BirthDateFormat {
    /// `YYYY-MM-DD`, optionally followed by an ISO time suffix (ADP).
    #[default]
    YearMonthDay,
    /// `MM/DD/YYYY` (Dayforce exports).
    MonthDayYear,
}

/// Candidate surnames a certification lookup may be filed under.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Surnames {
    pub legal: Option<String>,
    pub maiden: Option<String>,
    pub preferred: Option<String>,
}

/// One employee as seen in the HR system of record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerRecord {
    pub worker_id: String,
    pub employee_number: Option<String>,
    pub ssn: Option<String>,
    pub birth_date: Option<String>,
    pub birth_date_format: BirthDateFormat,
    pub business_unit: Option<String>,
    pub surnames: Surnames,
    pub first_name: Option<String>,
}

/// Entry of the pre-selected staff list file.
///
/// Only the two identifiers are required; any other fields in the file are ignored.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct StaffEntry {
    pub associate_oid: String,
    #[serde(deserialize_with = "string_or_number")]
    pub employee_number: String,
}

/// Accept an identifier written either as a JSON string or a bare number.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Identifier {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Identifier::deserialize(deserializer)? {
        Identifier::Text(s) => s,
        Identifier::Number(n) => n.to_string(),
    })
}

impl WorkerRecord {
    /// Build the record for a pre-selected staff entry from the worker the HR
    /// system returned for it.
    ///
    /// Overlay rules:
    /// - `employee_number` always comes from the staff list
    /// - `worker_id` comes from the HR record, falling back to the `associate_oid`
    /// - identity, name and assignment fields come from the HR record
    pub fn enriched(entry: &StaffEntry, fetched: WorkerRecord) -> Self {
        let worker_id = if fetched.worker_id.trim().is_empty() {
            entry.associate_oid.clone()
        } else {
            fetched.worker_id
        };

        Self {
            worker_id,
            employee_number: Some(entry.employee_number.clone()),
            ..fetched
        }
    }

    /// Label used on operator output lines.
    pub fn display_id(&self) -> &str {
        &self.worker_id
    }

    /// Employee number, if present and non-blank.
    pub fn employee_number(&self) -> Option<&str> {
        non_blank(self.employee_number.as_deref())
    }

    /// Whether the record's business unit is one of `allowed`.
    ///
    /// Records without a business unit are never in scope.
    pub fn in_business_units(&self, allowed: &[String]) -> bool {
        match non_blank(self.business_unit.as_deref()) {
            Some(unit) => allowed.iter().any(|a| a.trim() == unit),
            None => false,
        }
    }
}

/// Trimmed value, or `None` when the field is missing or whitespace only.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetched() -> WorkerRecord {
        WorkerRecord {
            worker_id: "W42".to_string(),
            employee_number: Some("HR-ONLY".to_string()),
            ssn: Some("123-45-6789".to_string()),
            birth_date: Some("1990-07-04".to_string()),
            business_unit: Some("KIPP Newark".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_enriched_takes_employee_number_from_staff_list() {
        let entry = StaffEntry {
            associate_oid: "G3ABC".to_string(),
            employee_number: "E100".to_string(),
        };

        let record = WorkerRecord::enriched(&entry, fetched());

        assert_eq!(record.employee_number.as_deref(), Some("E100"));
        assert_eq!(record.worker_id, "W42");
        assert_eq!(record.ssn.as_deref(), Some("123-45-6789"));
        assert_eq!(record.birth_date.as_deref(), Some("1990-07-04"));
    }

    #[test]
    fn test_enriched_falls_back_to_associate_oid() {
        let entry = StaffEntry {
            associate_oid: "G3ABC".to_string(),
            employee_number: "E100".to_string(),
        };
        let mut hr = fetched();
        hr.worker_id = "  ".to_string();

        let record = WorkerRecord::enriched(&entry, hr);
        assert_eq!(record.worker_id, "G3ABC");
    }

    #[test]
    fn test_staff_entry_ignores_extra_fields() {
        let json = r#"[{"associate_oid": "G3ABC", "employee_number": "E100", "school": "TEAM"}]"#;
        let entries: Vec<StaffEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].associate_oid, "G3ABC");
    }

    #[test]
    fn test_staff_entry_accepts_numeric_employee_number() {
        let json = r#"[{"associate_oid": "G3A", "employee_number": 100234}]"#;
        let entries: Vec<StaffEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(entries[0].employee_number, "100234");

        let bad = r#"[{"associate_oid": "G3A", "employee_number": true}]"#;
        assert!(serde_json::from_str::<Vec<StaffEntry>>(bad).is_err());
    }

    #[test]
    fn test_employee_number_blank_is_absent() {
        let mut record = fetched();
        record.employee_number = Some("   ".to_string());
        assert_eq!(record.employee_number(), None);
    }

    #[test]
    fn test_in_business_units() {
        let record = fetched();
        let allowed = vec!["KIPP Newark".to_string(), "KIPP Camden".to_string()];
        assert!(record.in_business_units(&allowed));
        assert!(!record.in_business_units(&["KIPP Miami".to_string()]));
        assert!(!record.in_business_units(&[]));

        let mut no_unit = fetched();
        no_unit.business_unit = None;
        assert!(!no_unit.in_business_units(&allowed));
    }
}
