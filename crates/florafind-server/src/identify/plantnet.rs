//! PlantNet HTTP client

use super::{IdentifyError, ImageUpload, PlantIdentifier};
use crate::config::PlantNetConfig;
use crate::error::{ServerError, ServerResult};
use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, StatusCode, Url,
};
use serde_json::Value;
use std::time::Duration;

/// Identification backed by the PlantNet `identify` endpoint
pub struct PlantNetClient {
    client: Client,
    config: PlantNetConfig,
}

impl PlantNetClient {
    pub fn new(config: PlantNetConfig) -> ServerResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ServerError::HttpClient(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Endpoint with query parameters, including the API key
    fn endpoint(&self) -> Result<Url, IdentifyError> {
        let mut url = Url::parse(&self.config.api_url)
            .map_err(|e| IdentifyError::Upstream(format!("invalid PlantNet URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair(
                "include-related-images",
                if self.config.include_related { "true" } else { "false" },
            )
            .append_pair("no-reject", "false")
            .append_pair("nb-results", &self.config.nb_results.to_string())
            .append_pair("lang", &self.config.language)
            .append_pair("api-key", self.config.api_key.expose());
        Ok(url)
    }

    fn form(images: Vec<ImageUpload>) -> Result<Form, IdentifyError> {
        let mut form = Form::new();
        for image in images {
            let part = Part::bytes(image.data)
                .file_name(image.file_name)
                .mime_str(image.format.mime_type())
                .map_err(|e| IdentifyError::Upstream(e.to_string()))?;
            form = form.part("images", part).text("organs", "auto");
        }
        Ok(form)
    }
}

impl std::fmt::Debug for PlantNetClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlantNetClient")
            .field("api_url", &self.config.api_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PlantIdentifier for PlantNetClient {
    async fn identify(&self, images: Vec<ImageUpload>) -> Result<Value, IdentifyError> {
        let url = self.endpoint()?;
        let count = images.len();
        let form = Self::form(images)?;

        // Never log `url`: it carries the API key
        tracing::info!(
            api_url = %self.config.api_url,
            images = count,
            lang = %self.config.language,
            "Forwarding images to PlantNet"
        );

        let response = self
            .client
            .post(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                // reqwest errors embed the request URL
                let e = e.without_url();
                tracing::error!(error = %e, "PlantNet request failed");
                IdentifyError::Upstream(e.to_string())
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::info!("PlantNet found no matching species");
            return Err(IdentifyError::NotFound);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, body = %truncate(&body, 320), "PlantNet returned an error");
            return Err(IdentifyError::Upstream(format!("PlantNet returned {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| IdentifyError::Upstream(e.without_url().to_string()))?;
        serde_json::from_slice(&body).map_err(|e| {
            tracing::error!(error = %e, "PlantNet response is not JSON");
            IdentifyError::InvalidResponse(e.to_string())
        })
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        value.to_string()
    } else {
        let truncated: String = value.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}
