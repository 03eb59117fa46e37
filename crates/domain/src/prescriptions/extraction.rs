use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::normalized::NormalizedPrescription;

/// Response body of both extraction endpoints.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Extraction {
    pub success: bool,
    /// The parsed model reply, passed through untouched. `{}` when it did not parse.
    pub extracted_data: Value,
    pub confidence_scores: Map<String, Value>,
    pub overall_confidence: f64,
    pub needs_review: bool,
    pub raw_output: String,
}

impl Extraction {
    /// Interprets the model's text answer.
    ///
    /// A reply that is missing, not strict JSON, or an empty JSON value yields an
    /// empty object with `needs_review` set. Anything else is passed through.
    pub fn from_reply(text: Option<String>) -> Self {
        let raw_output = text.unwrap_or_default();

        let extracted_data = match serde_json::from_str::<Value>(&raw_output) {
            Ok(value) if !is_empty_value(&value) => Some(value),
            _ => None,
        };

        Self {
            success: true,
            needs_review: extracted_data.is_none(),
            extracted_data: extracted_data.unwrap_or_else(|| Value::Object(Map::new())),
            confidence_scores: Map::new(),
            overall_confidence: 0.0,
            raw_output,
        }
    }

    /// Typed view of the extracted data, when it is shaped like a prescription.
    pub fn prescription(&self) -> Option<Prescription> {
        if self.needs_review || !self.extracted_data.is_object() {
            return None;
        }
        serde_json::from_value(self.extracted_data.clone()).ok()
    }

    /// Cleaned-up copy of an object reply, for summaries. `extracted_data` is left as the model sent it.
    pub fn normalized(&self) -> Option<NormalizedPrescription> {
        if self.needs_review || !self.extracted_data.is_object() {
            return None;
        }
        Some(NormalizedPrescription::from_value(&self.extracted_data))
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
    }
}

/// Shape the model is asked to produce. Every field may be absent.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct Prescription {
    pub patient_name: Option<String>,
    pub doctor_name: Option<String>,
    pub medications: Vec<Medication>,
    pub date: Option<String>,
    pub instructions: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct Medication {
    pub name: Option<String>,
    pub strength: Option<String>,
    pub dose: Option<String>,
    pub frequency: Option<String>,
    pub duration: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_json_passes_through_unmodified() {
        let reply = r#"{"patient_name":"Jane Roe","medications":[{"name":"Amoxicillin","dose":"1 cap","extra":42}],"note":null}"#;
        let extraction = Extraction::from_reply(Some(reply.to_string()));

        assert!(extraction.success);
        assert!(!extraction.needs_review);
        assert_eq!(
            extraction.extracted_data,
            serde_json::from_str::<Value>(reply).unwrap()
        );
        assert_eq!(extraction.raw_output, reply);
        assert!(extraction.confidence_scores.is_empty());
        assert_eq!(extraction.overall_confidence, 0.0);
    }

    #[test]
    fn large_integers_pass_through_exactly() {
        let reply = r#"{"refills":0.10,"rx_number":123456789012345678901234567890}"#;
        let extraction = Extraction::from_reply(Some(reply.to_string()));

        assert!(!extraction.needs_review);
        assert_eq!(serde_json::to_string(&extraction.extracted_data).unwrap(), reply);
        assert!(serde_json::to_string(&extraction)
            .unwrap()
            .contains(r#""rx_number":123456789012345678901234567890"#));
    }

    #[test]
    fn fenced_json_is_not_accepted() {
        let reply = "```json\n{\"patient_name\": \"Jane\"}\n```";
        let extraction = Extraction::from_reply(Some(reply.to_string()));

        assert!(extraction.needs_review);
        assert_eq!(extraction.extracted_data, json!({}));
        assert_eq!(extraction.raw_output, reply);
    }

    #[test]
    fn missing_text_needs_review() {
        let extraction = Extraction::from_reply(None);

        assert!(extraction.success);
        assert!(extraction.needs_review);
        assert_eq!(extraction.extracted_data, json!({}));
        assert_eq!(extraction.raw_output, "");
    }

    #[test]
    fn empty_json_values_need_review() {
        for reply in ["{}", "[]", "null", "\"\"", "0", "false"] {
            let extraction = Extraction::from_reply(Some(reply.to_string()));
            assert!(extraction.needs_review, "{reply} should need review");
            assert_eq!(extraction.extracted_data, json!({}));
            assert_eq!(extraction.raw_output, reply);
        }
    }

    #[test]
    fn non_object_json_passes_through() {
        let extraction = Extraction::from_reply(Some("[1, 2]".to_string()));

        assert!(!extraction.needs_review);
        assert_eq!(extraction.extracted_data, json!([1, 2]));
        assert!(extraction.prescription().is_none());
        assert!(extraction.normalized().is_none());
    }

    #[test]
    fn typed_view_reads_partial_data() {
        let reply = json!({
            "patient_name": "Jane Roe",
            "medications": [
                { "name": "Amoxicillin", "strength": "500mg", "frequency": "TID" },
                { "name": "Paracetamol" }
            ]
        });
        let extraction = Extraction::from_reply(Some(reply.to_string()));
        let prescription = extraction.prescription().unwrap();

        assert_eq!(prescription.patient_name.as_deref(), Some("Jane Roe"));
        assert_eq!(prescription.doctor_name, None);
        assert_eq!(prescription.medications.len(), 2);
        assert_eq!(prescription.medications[0].strength.as_deref(), Some("500mg"));
        assert_eq!(prescription.medications[1].dose, None);

        let normalized = extraction.normalized().unwrap();
        assert_eq!(normalized.medications[0].frequency, "TID");
        assert_eq!(normalized.issues_for("medications[1]").count(), 4);
        assert_eq!(extraction.extracted_data, reply);
    }

    #[test]
    fn serializes_response_keys() {
        let value = serde_json::to_value(Extraction::from_reply(None)).unwrap();
        for key in [
            "success",
            "extracted_data",
            "confidence_scores",
            "overall_confidence",
            "needs_review",
            "raw_output",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }
}
