// libs/scheduling-cell/src/services/formatter.rs
use reqwest::{header, Client};
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;

use crate::models::{SchedulePattern, SchedulingError};

/// Client for the external formatting model. It consumes the pattern list
/// verbatim and renders prose; it never filters or re-ranks. An unavailable
/// formatter is an `UpstreamError` the caller downgrades, and the discovered
/// patterns stay valid either way.
pub struct PatternFormatterService {
    base_url: String,
    api_key: String,
    http_client: Client,
}

impl PatternFormatterService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            base_url: config.formatter_base_url.clone(),
            api_key: config.formatter_api_key.clone(),
            http_client: Client::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.base_url.is_empty() && !self.api_key.is_empty()
    }

    pub async fn format_patterns(
        &self,
        patterns: &[SchedulePattern],
    ) -> Result<String, SchedulingError> {
        if !self.is_configured() {
            return Err(SchedulingError::UpstreamError(
                "Formatter service is not configured".to_string()
            ));
        }

        debug!("Requesting prose summary for {} patterns", patterns.len());

        let payload = json!({ "patterns": patterns });

        let response = self.http_client
            .post(format!("{}/v1/schedule-summaries", self.base_url))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(header::CONTENT_TYPE, "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| SchedulingError::UpstreamError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SchedulingError::UpstreamError(format!(
                "Formatter returned status {}", status,
            )));
        }

        let body: Value = response.json().await
            .map_err(|e| SchedulingError::UpstreamError(e.to_string()))?;

        body["summary"].as_str()
            .map(str::to_string)
            .ok_or_else(|| SchedulingError::UpstreamError(
                "Formatter response missing summary".to_string()
            ))
    }
}
