use crate::errors::Error;

use super::{
    extraction::Extraction,
    model::ExtractionModel,
    normalize::{normalize_to_jpeg, JPEG_MIME_TYPE},
    prompt::EXTRACTION_PROMPT,
};

/// Normalizes the image, asks the model for the prescription fields and interprets the reply.
///
/// Undecodable images fail before the model is called.
pub async fn extract(model: &dyn ExtractionModel, image: &[u8]) -> Result<Extraction, Error> {
    let jpeg = normalize_to_jpeg(image)?;
    extract_jpeg(model, &jpeg).await
}

/// Same as [`extract`] for bytes that are already JPEG-normalized.
pub async fn extract_jpeg(model: &dyn ExtractionModel, jpeg: &[u8]) -> Result<Extraction, Error> {
    let response = model
        .generate(EXTRACTION_PROMPT, jpeg, JPEG_MIME_TYPE)
        .await?;

    let extraction = Extraction::from_reply(response.reply_text());

    if extraction.needs_review {
        tracing::warn!(
            "Model output needs review ({} chars of raw output, finish reason {})",
            extraction.raw_output.len(),
            response.finish_reason().unwrap_or("none")
        );
    } else if let Some(normalized) = extraction.normalized() {
        tracing::info!(
            "Extracted prescription with {} medication(s), {} issue(s) to check",
            normalized.medications.len(),
            normalized.issues.len()
        );
        for issue in &normalized.issues {
            tracing::debug!("{} is {:?}: {}", issue.path, issue.code, issue.note);
        }
    }

    Ok(extraction)
}
