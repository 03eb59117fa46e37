pub const EXTRACTION_PROMPT: &str = concat!(
    "Extract prescription details and return as JSON:\n",
    r#"{ "patient_name": "", "doctor_name": "", "#,
    r#""medications": [ { "name": "", "strength": "", "dose": "", "frequency": "", "duration": "" } ], "#,
    r#""date": "", "instructions": "" }"#,
    "\n",
    "Respond with ONLY valid JSON.",
);
