use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::Error;

pub const NO_IMAGE_DATA: &str = "No image data provided";
pub const INVALID_IMAGE_DATA: &str = "Invalid image data";

/// JSON body of the base64 endpoint. `image` stays loosely typed so a wrong
/// type is reported as invalid data rather than a malformed body.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExtractBase64Input {
    #[serde(default)]
    pub image: Option<Value>,
}

impl ExtractBase64Input {
    /// Parses a request body. Anything that is not a JSON object counts as an empty input.
    pub fn from_body(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    pub fn decode(&self) -> Result<Vec<u8>, Error> {
        match &self.image {
            None | Some(Value::Null) => Err(Error::validation(NO_IMAGE_DATA)),
            Some(Value::String(s)) if s.is_empty() => Err(Error::validation(NO_IMAGE_DATA)),
            Some(Value::String(s)) => decode_image_data(s),
            Some(_) => Err(Error::validation(INVALID_IMAGE_DATA)),
        }
    }
}

/// Decodes standard base64, tolerating a `data:<mime>;base64,` prefix and whitespace.
pub fn decode_image_data(data: &str) -> Result<Vec<u8>, Error> {
    let payload = match data.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => data,
    };

    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    let bytes = STANDARD
        .decode(compact)
        .map_err(|_| Error::validation(INVALID_IMAGE_DATA))?;

    if bytes.is_empty() {
        return Err(Error::validation(NO_IMAGE_DATA));
    }
    Ok(bytes)
}
