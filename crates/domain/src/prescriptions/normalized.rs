use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::extraction::{Medication, Prescription};

static SHORT_YEAR_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{2})$").expect("valid date regex"));
static LONG_YEAR_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})[/-](\d{1,2})[/-](\d{4})$").expect("valid date regex"));
static ISO_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").expect("valid date regex"));

static INTERVAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^q(\d+)h$").expect("valid frequency regex"));

static WEEKS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*week").expect("valid duration regex"));
static DAYS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*day").expect("valid duration regex"));
static MONTHS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*month").expect("valid duration regex"));

static DOSE_PATTERNS: Lazy<Vec<(Regex, DoseUnit)>> = Lazy::new(|| {
    [
        (r"(\d+)\s*(tab|tablet)s?", DoseUnit::Tab),
        (r"(\d+)\s*(cap|capsule)s?", DoseUnit::Cap),
        (r"(\d+)\s*ml", DoseUnit::Ml),
        (r"(\d+)\s*drops?", DoseUnit::Drops),
        (r"(\d+)\s*puffs?", DoseUnit::Puff),
        (r"(\d+)\s*mg", DoseUnit::Mg),
        (r"(\d+)\s*mcg", DoseUnit::Mcg),
    ]
    .into_iter()
    .map(|(pattern, unit)| (Regex::new(pattern).expect("valid dose regex"), unit))
    .collect()
});

static STRENGTH_UNIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(mg|mcg|%|iu|ml|g)$").expect("valid strength regex"));

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum IssueCode {
    Missing,
    Ambiguous,
    Invalid,
}

/// Something a reviewer should look at, addressed by a path such as `medications[1].strength`.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct Issue {
    pub path: String,
    pub code: IssueCode,
    pub note: String,
}

impl Issue {
    fn new(path: impl Into<String>, code: IssueCode, note: &str) -> Self {
        Self {
            path: path.into(),
            code,
            note: note.to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum DoseUnit {
    Tab,
    Cap,
    Ml,
    Drops,
    Puff,
    Mg,
    Mcg,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct NormalizedMedication {
    pub name: String,
    pub strength: String,
    pub dose: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dose_amount: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dose_unit: Option<DoseUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dose_text: Option<String>,
    pub frequency: String,
    pub duration: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_raw: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_days: Option<u32>,
}

/// Cleaned-up prescription: ISO dates, frequency codes, parsed doses and durations.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct NormalizedPrescription {
    pub patient_name: String,
    pub doctor_name: String,
    pub date: String,
    pub instructions: String,
    pub medications: Vec<NormalizedMedication>,
    pub issues: Vec<Issue>,
}

impl NormalizedPrescription {
    /// Normalizes raw extracted data. Data that is not shaped like a prescription
    /// yields an empty record with a single `root` issue.
    pub fn from_value(value: &Value) -> Self {
        if !value.is_object() {
            return Self::invalid_root();
        }
        match serde_json::from_value::<Prescription>(value.clone()) {
            Ok(prescription) => normalize(&prescription),
            Err(_) => Self::invalid_root(),
        }
    }

    fn invalid_root() -> Self {
        Self {
            issues: vec![Issue::new("root", IssueCode::Invalid, "Invalid JSON structure")],
            ..Self::default()
        }
    }

    pub fn issues_for<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a Issue> + 'a {
        self.issues.iter().filter(move |issue| {
            issue.path == path
                || issue
                    .path
                    .strip_prefix(path)
                    .is_some_and(|rest| rest.starts_with('.') || rest.starts_with('['))
        })
    }
}

pub fn normalize(prescription: &Prescription) -> NormalizedPrescription {
    let mut issues = Vec::new();

    let patient_name = person_name(prescription.patient_name.as_deref());
    if patient_name.is_empty() {
        issues.push(Issue::new("patient_name", IssueCode::Missing, "Patient name is required"));
    }

    let doctor_name = person_name(prescription.doctor_name.as_deref());
    if doctor_name.is_empty() {
        issues.push(Issue::new("doctor_name", IssueCode::Missing, "Doctor name is required"));
    }

    let date = normalize_date(prescription.date.as_deref().unwrap_or_default(), &mut issues);

    let instructions = prescription
        .instructions
        .as_deref()
        .unwrap_or_default()
        .trim()
        .to_string();

    let medications = prescription
        .medications
        .iter()
        .enumerate()
        .filter(|(_, medication)| !is_blank_row(medication))
        .map(|(index, medication)| {
            normalize_medication(medication, &format!("medications[{index}]"), &mut issues)
        })
        .collect();

    NormalizedPrescription {
        patient_name,
        doctor_name,
        date,
        instructions,
        medications,
        issues,
    }
}

fn text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or_default()
}

fn is_blank_row(medication: &Medication) -> bool {
    [
        &medication.name,
        &medication.strength,
        &medication.dose,
        &medication.frequency,
        &medication.duration,
    ]
    .into_iter()
    .all(|field| text(field).is_empty())
}

fn person_name(name: Option<&str>) -> String {
    name.unwrap_or_default()
        .trim()
        .to_lowercase()
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn normalize_date(raw: &str, issues: &mut Vec<Issue>) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        issues.push(Issue::new("date", IssueCode::Missing, "Date is required"));
        return String::new();
    }

    let Some((year, month, day)) = date_parts(trimmed) else {
        issues.push(Issue::new("date", IssueCode::Invalid, "Date format not recognized"));
        return trimmed.to_string();
    };

    let iso = format!("{year:04}-{month:02}-{day:02}");
    if NaiveDate::from_ymd_opt(year, month, day).is_none() {
        issues.push(Issue::new("date", IssueCode::Invalid, "Invalid date"));
    }
    iso
}

/// Reads day-first dates (`DD/MM/YY`, `DD/MM/YYYY`, `DD-MM-YYYY`) and ISO dates as (year, month, day).
fn date_parts(date: &str) -> Option<(i32, u32, u32)> {
    if let Some(caps) = SHORT_YEAR_DATE_RE.captures(date) {
        let short = number(&caps, 3)? as i32;
        let year = if short < 50 { 2000 + short } else { 1900 + short };
        return Some((year, number(&caps, 2)?, number(&caps, 1)?));
    }
    if let Some(caps) = LONG_YEAR_DATE_RE.captures(date) {
        return Some((number(&caps, 3)? as i32, number(&caps, 2)?, number(&caps, 1)?));
    }
    let caps = ISO_DATE_RE.captures(date)?;
    Some((number(&caps, 1)? as i32, number(&caps, 2)?, number(&caps, 3)?))
}

fn number(caps: &Captures<'_>, group: usize) -> Option<u32> {
    caps.get(group)?.as_str().parse().ok()
}

fn normalize_medication(
    medication: &Medication,
    path: &str,
    issues: &mut Vec<Issue>,
) -> NormalizedMedication {
    let name = text(&medication.name).trim().to_string();
    if name.is_empty() {
        issues.push(Issue::new(
            format!("{path}.name"),
            IssueCode::Missing,
            "Medication name is required",
        ));
    }

    let strength = normalize_strength(text(&medication.strength), path, issues);
    let mut normalized = normalize_dose(text(&medication.dose), path, issues);
    let frequency = normalize_frequency(text(&medication.frequency), path, issues);
    let (duration, duration_raw, duration_days) =
        normalize_duration(text(&medication.duration), path, issues);

    normalized.name = name;
    normalized.strength = strength;
    normalized.frequency = frequency;
    normalized.duration = duration;
    normalized.duration_raw = duration_raw;
    normalized.duration_days = duration_days;
    normalized
}

fn normalize_strength(raw: &str, path: &str, issues: &mut Vec<Issue>) -> String {
    let strength = raw.trim();
    if strength.is_empty() {
        issues.push(Issue::new(
            format!("{path}.strength"),
            IssueCode::Missing,
            "Strength is required",
        ));
        return String::new();
    }

    let starts_with_digit = strength.starts_with(|c: char| c.is_ascii_digit());
    if starts_with_digit && !STRENGTH_UNIT_RE.is_match(strength) {
        issues.push(Issue::new(
            format!("{path}.strength"),
            IssueCode::Invalid,
            "Strength missing unit (mg, mcg, %, IU, etc.)",
        ));
    }
    strength.to_string()
}

/// Returns a medication with only the dose fields filled in.
fn normalize_dose(raw: &str, path: &str, issues: &mut Vec<Issue>) -> NormalizedMedication {
    let dose = raw.trim().to_lowercase();
    if dose.is_empty() {
        issues.push(Issue::new(format!("{path}.dose"), IssueCode::Missing, "Dose is required"));
        return NormalizedMedication::default();
    }

    let dose_text = Some(raw.trim().to_string());
    let parsed = DOSE_PATTERNS.iter().find_map(|(regex, unit)| {
        let caps = regex.captures(&dose)?;
        Some((caps[1].parse::<u32>().ok(), *unit))
    });

    let (dose_amount, dose_unit) = match parsed {
        Some((amount, unit)) => (amount, Some(unit)),
        None => {
            issues.push(Issue::new(
                format!("{path}.dose"),
                IssueCode::Ambiguous,
                "Dose format not recognized",
            ));
            (None, None)
        }
    };

    NormalizedMedication {
        dose,
        dose_amount,
        dose_unit,
        dose_text,
        ..NormalizedMedication::default()
    }
}

fn normalize_frequency(raw: &str, path: &str, issues: &mut Vec<Issue>) -> String {
    let frequency = raw.trim().to_lowercase();
    if frequency.is_empty() {
        issues.push(Issue::new(
            format!("{path}.frequency"),
            IssueCode::Missing,
            "Frequency is required",
        ));
        return String::new();
    }

    let code = match frequency.as_str() {
        "once daily" | "od" => Some("OD"),
        "twice daily" | "bid" => Some("BID"),
        "thrice daily" | "three times daily" | "tid" => Some("TID"),
        "four times daily" | "qid" => Some("QID"),
        "at night" | "at bedtime" | "hs" => Some("HS"),
        "as needed" | "prn" => Some("PRN"),
        "every 4 hours" => Some("q4h"),
        "every 6 hours" => Some("q6h"),
        "every 8 hours" => Some("q8h"),
        "every 12 hours" => Some("q12h"),
        _ => None,
    };

    if let Some(code) = code {
        return code.to_string();
    }
    if INTERVAL_RE.is_match(&frequency) {
        return frequency;
    }

    issues.push(Issue::new(
        format!("{path}.frequency"),
        IssueCode::Ambiguous,
        "Frequency not recognized",
    ));
    frequency
}

fn normalize_duration(
    raw: &str,
    path: &str,
    issues: &mut Vec<Issue>,
) -> (String, Option<String>, Option<u32>) {
    let duration = raw.trim().to_lowercase();
    if duration.is_empty() {
        issues.push(Issue::new(
            format!("{path}.duration"),
            IssueCode::Missing,
            "Duration is required",
        ));
        return (String::new(), None, None);
    }

    let count = |regex: &Regex| -> Option<u32> { regex.captures(&duration)?[1].parse().ok() };

    // Months win over days, days over weeks.
    let days = count(&MONTHS_RE)
        .map(|months| months.saturating_mul(30))
        .or_else(|| count(&DAYS_RE))
        .or_else(|| count(&WEEKS_RE).map(|weeks| weeks.saturating_mul(7)));

    if days.is_none() {
        issues.push(Issue::new(
            format!("{path}.duration"),
            IssueCode::Ambiguous,
            "Duration format not recognized",
        ));
    }

    (duration, Some(raw.trim().to_string()), days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn clinic_output() -> Value {
        json!({
            "patient_name": "Sachin Sansare",
            "doctor_name": "Amita",
            "medications": [
                { "name": "Augmentin", "strength": "625mg", "dose": "1 tablet", "frequency": "twice daily", "duration": "5 days" },
                { "name": "Enzoflam", "strength": "", "dose": "1 tablet", "frequency": "twice daily", "duration": "5 days" },
                { "name": "Pan D", "strength": "40mg", "dose": "1 tablet", "frequency": "once daily", "duration": "5 days" },
                { "name": "Hexigel gum paint", "strength": "", "dose": "", "frequency": "twice daily", "duration": "1 week" }
            ],
            "date": "12/10/22",
            "instructions": "Augmentin 625mg and Enzoflam: Take after meals. Pan D 40mg: Take before meals. Hexigel gum paint: Apply with massage."
        })
    }

    #[test]
    fn normalizes_clinic_output() {
        let normalized = NormalizedPrescription::from_value(&clinic_output());

        assert_eq!(normalized.patient_name, "Sachin Sansare");
        assert_eq!(normalized.doctor_name, "Amita");
        assert_eq!(normalized.date, "2022-10-12");
        assert!(normalized.instructions.starts_with("Augmentin 625mg"));
        assert_eq!(normalized.medications.len(), 4);

        let augmentin = &normalized.medications[0];
        assert_eq!(augmentin.strength, "625mg");
        assert_eq!(augmentin.dose_amount, Some(1));
        assert_eq!(augmentin.dose_unit, Some(DoseUnit::Tab));
        assert_eq!(augmentin.dose_text.as_deref(), Some("1 tablet"));
        assert_eq!(augmentin.frequency, "BID");
        assert_eq!(augmentin.duration_days, Some(5));

        let pan_d = &normalized.medications[2];
        assert_eq!(pan_d.strength, "40mg");
        assert_eq!(pan_d.frequency, "OD");

        let hexigel = &normalized.medications[3];
        assert_eq!(hexigel.dose_unit, None);
        assert_eq!(hexigel.frequency, "BID");
        assert_eq!(hexigel.duration, "1 week");
        assert_eq!(hexigel.duration_days, Some(7));

        let missing_strength: Vec<&str> = normalized
            .issues
            .iter()
            .filter(|issue| issue.code == IssueCode::Missing && issue.path.ends_with(".strength"))
            .map(|issue| issue.path.as_str())
            .collect();
        assert_eq!(
            missing_strength,
            ["medications[1].strength", "medications[3].strength"]
        );

        assert_eq!(normalized.issues.len(), 3);
        assert_eq!(normalized.issues_for("medications[3]").count(), 2);
        assert_eq!(normalized.issues_for("medications[0]").count(), 0);
    }

    #[test]
    fn date_formats() {
        let mut issues = Vec::new();
        assert_eq!(normalize_date("12/10/22", &mut issues), "2022-10-12");
        assert_eq!(normalize_date("3/4/75", &mut issues), "1975-04-03");
        assert_eq!(normalize_date("05-11-2023", &mut issues), "2023-11-05");
        assert_eq!(normalize_date("5/11/2023", &mut issues), "2023-11-05");
        assert_eq!(normalize_date("2024-03-01", &mut issues), "2024-03-01");
        assert!(issues.is_empty());

        assert_eq!(normalize_date("31/02/2024", &mut issues), "2024-02-31");
        assert_eq!(normalize_date("March 3rd", &mut issues), "March 3rd");
        assert_eq!(normalize_date("  ", &mut issues), "");

        let codes: Vec<(IssueCode, &str)> = issues
            .iter()
            .map(|issue| (issue.code, issue.note.as_str()))
            .collect();
        assert_eq!(
            codes,
            [
                (IssueCode::Invalid, "Invalid date"),
                (IssueCode::Invalid, "Date format not recognized"),
                (IssueCode::Missing, "Date is required"),
            ]
        );
    }

    #[test]
    fn frequency_codes() {
        let mut issues = Vec::new();
        for (raw, code) in [
            ("Twice Daily", "BID"),
            ("three times daily", "TID"),
            ("at bedtime", "HS"),
            ("as needed", "PRN"),
            ("every 8 hours", "q8h"),
            ("Q6H", "q6h"),
            ("tid", "TID"),
        ] {
            assert_eq!(normalize_frequency(raw, "m", &mut issues), code, "{raw}");
        }
        assert!(issues.is_empty());

        assert_eq!(normalize_frequency("after lunch", "m", &mut issues), "after lunch");
        assert_eq!(issues[0].code, IssueCode::Ambiguous);
        assert_eq!(issues[0].path, "m.frequency");
    }

    #[test]
    fn dose_units_and_amounts() {
        let mut issues = Vec::new();
        for (raw, amount, unit) in [
            ("2 Capsules", 2, DoseUnit::Cap),
            ("5ml", 5, DoseUnit::Ml),
            ("3 drops", 3, DoseUnit::Drops),
            ("2 puffs", 2, DoseUnit::Puff),
            ("500 mg", 500, DoseUnit::Mg),
            ("50mcg", 50, DoseUnit::Mcg),
        ] {
            let dose = normalize_dose(raw, "m", &mut issues);
            assert_eq!(dose.dose_amount, Some(amount), "{raw}");
            assert_eq!(dose.dose_unit, Some(unit), "{raw}");
            assert_eq!(dose.dose, raw.to_lowercase());
        }
        assert!(issues.is_empty());

        let dose = normalize_dose("half tablet", "m", &mut issues);
        assert_eq!(dose.dose_unit, None);
        assert_eq!(dose.dose_text.as_deref(), Some("half tablet"));
        assert_eq!(issues[0].code, IssueCode::Ambiguous);
    }

    #[test]
    fn durations_in_days() {
        let mut issues = Vec::new();
        let days = |raw: &str, issues: &mut Vec<Issue>| normalize_duration(raw, "m", issues).2;

        assert_eq!(days("1 week", &mut issues), Some(7));
        assert_eq!(days("10 Days", &mut issues), Some(10));
        assert_eq!(days("2 months", &mut issues), Some(60));
        assert!(issues.is_empty());

        let (duration, raw, parsed) = normalize_duration("Until Review", "m", &mut issues);
        assert_eq!(duration, "until review");
        assert_eq!(raw.as_deref(), Some("Until Review"));
        assert_eq!(parsed, None);
        assert_eq!(issues[0].code, IssueCode::Ambiguous);
    }

    #[test]
    fn strength_without_unit_is_invalid() {
        let mut issues = Vec::new();
        assert_eq!(normalize_strength(" 500 ", "m", &mut issues), "500");
        assert_eq!(normalize_strength("0.05%", "m", &mut issues), "0.05%");
        assert_eq!(normalize_strength("1000 IU", "m", &mut issues), "1000 IU");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, IssueCode::Invalid);
    }

    #[test]
    fn names_are_capitalized_and_blank_rows_skipped() {
        let normalized = NormalizedPrescription::from_value(&json!({
            "patient_name": "  jANE roe ",
            "medications": [
                { "name": "", "strength": "", "dose": "", "frequency": "", "duration": "" },
                { "name": "Paracetamol", "strength": "500mg", "dose": "1 tab", "frequency": "prn", "duration": "3 days" }
            ],
            "date": "2024-01-15"
        }));

        assert_eq!(normalized.patient_name, "Jane Roe");
        assert_eq!(normalized.medications.len(), 1);
        assert_eq!(normalized.medications[0].frequency, "PRN");

        let paths: Vec<&str> = normalized.issues.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, ["doctor_name"]);
    }

    #[test]
    fn wrong_shape_is_a_root_issue() {
        for value in [json!([1, 2]), json!({ "medications": "none" })] {
            let normalized = NormalizedPrescription::from_value(&value);
            assert!(normalized.medications.is_empty());
            assert_eq!(
                normalized.issues,
                [Issue::new("root", IssueCode::Invalid, "Invalid JSON structure")]
            );
        }
    }

    #[test]
    fn serializes_codes_in_lowercase() {
        let value = serde_json::to_value(Issue::new("date", IssueCode::Missing, "Date is required"))
            .unwrap();
        assert_eq!(value, json!({ "path": "date", "code": "missing", "note": "Date is required" }));
        assert_eq!(serde_json::to_value(DoseUnit::Drops).unwrap(), json!("drops"));
    }
}
