//! Registry query keys derived from HR worker records.
//!
//! The registry expects an SSN in its three positional segments and a birth
//! date as separate month, day and year fields. Source systems store both in
//! different shapes, so every reordering rule lives here as a named function.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

use super::failure::{MissingField, MissingInputError};
use super::worker::{non_blank, BirthDateFormat, WorkerRecord};

/// SSN split into the registry's three positional segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsnSegments {
    pub area: String,
    pub group: String,
    pub serial: String,
}

impl SsnSegments {
    pub fn as_tuple(&self) -> (&str, &str, &str) {
        (&self.area, &self.group, &self.serial)
    }
}

/// Birth date components in the registry's month-day-year order, zero padded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryDate {
    pub month: String,
    pub day: String,
    pub year: String,
}

impl RegistryDate {
    pub fn as_tuple(&self) -> (&str, &str, &str) {
        (&self.month, &self.day, &self.year)
    }
}

/// Normalized input to a registry lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationKey {
    pub employee_number: String,
    pub ssn: SsnSegments,
    pub birth_date: Option<RegistryDate>,
    pub surnames: Vec<String>,
}

fn ssn_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{3})-?(\d{2})-?(\d{4})$").expect("SSN pattern is valid")
    })
}

/// Split an SSN (`DDD-DD-DDDD` or `DDDDDDDDD`) into its three segments.
pub fn split_ssn(raw: Option<&str>) -> Result<SsnSegments, MissingInputError> {
    let raw = non_blank(raw).ok_or_else(|| MissingInputError::absent(MissingField::Ssn))?;
    let caps = ssn_pattern().captures(raw).ok_or_else(|| {
        MissingInputError::malformed(MissingField::Ssn, "expected DDD-DD-DDDD")
    })?;

    Ok(SsnSegments {
        area: caps[1].to_string(),
        group: caps[2].to_string(),
        serial: caps[3].to_string(),
    })
}

/// Reorder a source birth date into the registry's month-day-year components.
///
/// The input order is dictated by `format`; the output order never is.
pub fn registry_date(
    raw: Option<&str>,
    format: BirthDateFormat,
) -> Result<RegistryDate, MissingInputError> {
    let raw = non_blank(raw).ok_or_else(|| MissingInputError::absent(MissingField::BirthDate))?;

    let parsed = match format {
        BirthDateFormat::YearMonthDay => {
            let date_part = raw.split('T').next().unwrap_or(raw);
            NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        }
        BirthDateFormat::MonthDayYear => NaiveDate::parse_from_str(raw, "%m/%d/%Y"),
    }
    .map_err(|e| {
        MissingInputError::malformed(MissingField::BirthDate, format!("'{raw}': {e}"))
    })?;

    Ok(RegistryDate {
        month: parsed.format("%m").to_string(),
        day: parsed.format("%d").to_string(),
        year: parsed.format("%Y").to_string(),
    })
}

/// Distinct non-blank surname candidates in legal, maiden, preferred order.
pub fn candidate_surnames(record: &WorkerRecord) -> Vec<String> {
    let names = &record.surnames;
    let mut out: Vec<String> = Vec::new();
    for name in [&names.legal, &names.maiden, &names.preferred] {
        if let Some(name) = non_blank(name.as_deref()) {
            if !out.iter().any(|seen| seen.eq_ignore_ascii_case(name)) {
                out.push(name.to_string());
            }
        }
    }
    out
}

/// The employee number becomes part of the artifact file name, so it must be
/// a single path component.
fn employee_number(record: &WorkerRecord) -> Result<String, MissingInputError> {
    let number = record
        .employee_number()
        .ok_or_else(|| MissingInputError::absent(MissingField::EmployeeNumber))?;

    let unsafe_chars = number.contains(['/', '\\']) || number.chars().any(char::is_control);
    if unsafe_chars || number.contains("..") {
        return Err(MissingInputError::malformed(
            MissingField::EmployeeNumber,
            format!("not usable in a file name: {number:?}"),
        ));
    }
    Ok(number.to_string())
}

/// Key for a background-check lookup: employee number, SSN and birth date.
pub fn derive_background_key(record: &WorkerRecord) -> Result<VerificationKey, MissingInputError> {
    let employee_number = employee_number(record)?;
    let ssn = split_ssn(record.ssn.as_deref())?;
    let birth_date = registry_date(record.birth_date.as_deref(), record.birth_date_format)?;

    Ok(VerificationKey {
        employee_number,
        ssn,
        birth_date: Some(birth_date),
        surnames: Vec::new(),
    })
}

/// Key for a certification lookup: employee number, SSN and at least one surname.
pub fn derive_certification_key(
    record: &WorkerRecord,
) -> Result<VerificationKey, MissingInputError> {
    let employee_number = employee_number(record)?;
    let ssn = split_ssn(record.ssn.as_deref())?;
    let surnames = candidate_surnames(record);
    if surnames.is_empty() {
        return Err(MissingInputError::absent(MissingField::Surname));
    }

    Ok(VerificationKey {
        employee_number,
        ssn,
        birth_date: None,
        surnames,
    })
}
