use axum::{
    body::Bytes,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::BytesRejection,
        Multipart, State,
    },
    Json,
};
use domain::prescriptions::{
    normalize_to_jpeg, service::extract_jpeg, ExtractBase64Input, Extraction,
};
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use ulid::Ulid;

use crate::{error::ApiError, AppState};

pub const NO_IMAGE_FILE: &str = "No image file provided";
pub const NO_IMAGE_SELECTED: &str = "No image file selected";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    pub detail: String,
}

// Health check
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let (status, detail) = match state.provider.connect() {
        Ok(_) => ("healthy", "ok".to_string()),
        Err(e) => ("error", e.to_string()),
    };

    Json(HealthResponse {
        status: status.to_string(),
        model: state.provider.model_id().to_string(),
        detail,
    })
}

// Extract from multipart upload
pub async fn extract_prescription(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Extraction>, ApiError> {
    let request_id = Ulid::new().to_string();

    extract_upload(&state, multipart)
        .instrument(tracing::info_span!("extract_prescription", %request_id))
        .await
        .map_err(|err| log_failure("extract_prescription", err))
}

// Extract from base64 JSON body
pub async fn extract_prescription_base64(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Extraction>, ApiError> {
    let request_id = Ulid::new().to_string();

    extract_base64(&state, body)
        .instrument(tracing::info_span!("extract_prescription_base64", %request_id))
        .await
        .map_err(|err| log_failure("extract_prescription_base64", err))
}

async fn extract_upload(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Extraction>, ApiError> {
    let mut multipart =
        multipart.map_err(|rejection| ApiError::new(rejection.status(), rejection.body_text()))?;

    let image = read_image_field(&mut multipart).await?;
    tracing::info!("Received {} byte upload", image.len());

    run_extraction(state, &image).await
}

async fn extract_base64(
    state: &AppState,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Extraction>, ApiError> {
    let body = body.map_err(|rejection| ApiError::new(rejection.status(), rejection.body_text()))?;

    let image = ExtractBase64Input::from_body(&body).decode()?;
    tracing::info!("Received {} byte base64 image", image.len());

    run_extraction(state, &image).await
}

async fn run_extraction(state: &AppState, image: &[u8]) -> Result<Json<Extraction>, ApiError> {
    let jpeg = normalize_to_jpeg(image)?;
    let model = state.provider.connect()?;
    let extraction = extract_jpeg(model.as_ref(), &jpeg).await?;

    Ok(Json(extraction))
}

/// Finds the `image` file part. Parts without a filename are form values, not files.
async fn read_image_field(multipart: &mut Multipart) -> Result<Bytes, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("image") {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        match file_name.as_deref() {
            None => continue,
            Some("") => return Err(ApiError::bad_request(NO_IMAGE_SELECTED)),
            Some(_) => return field.bytes().await.map_err(multipart_error),
        }
    }

    Err(ApiError::bad_request(NO_IMAGE_FILE))
}

fn multipart_error(err: MultipartError) -> ApiError {
    ApiError::new(err.status(), err.body_text())
}

fn log_failure(handler: &str, err: ApiError) -> ApiError {
    if err.status.is_server_error() {
        tracing::error!("Error in {}: {}", handler, err.message);
    } else {
        tracing::warn!("Rejected {} request: {}", handler, err.message);
    }
    err
}
