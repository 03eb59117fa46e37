use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use derive_new::new;
use serde_json::json;

use crate::{config::GeminiConfig, errors::Error};

use super::model::{ExtractionModel, GenerateContentResponse, ModelProvider};

/// Builds [`GeminiModel`] clients from a [`GeminiConfig`].
#[derive(Clone, Debug)]
pub struct GeminiProvider {
    config: GeminiConfig,
    http: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }
}

impl ModelProvider for GeminiProvider {
    fn model_id(&self) -> &str {
        &self.config.model
    }

    fn connect(&self) -> Result<Arc<dyn ExtractionModel>, Error> {
        let api_key = self
            .config
            .api_key
            .clone()
            .ok_or_else(|| Error::Configuration {
                message: "GOOGLE_API_KEY not set".to_string(),
            })?;

        Ok(Arc::new(GeminiModel::new(
            self.http.clone(),
            self.config.generate_content_url(),
            api_key,
        )))
    }
}

/// Client for one model's `generateContent` endpoint.
#[derive(Clone, new)]
pub struct GeminiModel {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

impl std::fmt::Debug for GeminiModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiModel").field("url", &self.url).finish()
    }
}

#[async_trait]
impl ExtractionModel for GeminiModel {
    async fn generate(
        &self,
        prompt: &str,
        image: &[u8],
        mime_type: &str,
    ) -> Result<GenerateContentResponse, Error> {
        let body = json!({
            "contents": [{
                "parts": [
                    { "text": prompt },
                    { "inline_data": { "mime_type": mime_type, "data": STANDARD.encode(image) } }
                ]
            }]
        });

        tracing::info!("Calling {} with {} byte image", self.url, image.len());

        let response = self
            .http
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Model returned {}: {}", status, body);
            return Err(Error::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<GenerateContentResponse>().await?)
    }
}
