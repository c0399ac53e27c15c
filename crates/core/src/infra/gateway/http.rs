use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{BackendMode, GatewayError, HealthStatus, RemoteGateway};
use crate::domain::job::{JobStatusUpdate, ProcessingResult};
use crate::domain::types::{VideoUpload, VoiceOptions};

/// 実バックエンド（HTTP API）ゲートウェイ
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    #[serde(rename = "jobId")]
    job_id: String,
}

fn map_request_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Request(e.to_string())
    }
}

impl HttpGateway {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_json<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GatewayError> {
        if !response.status().is_success() {
            return Err(GatewayError::Status(response.status().as_u16()));
        }
        response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(map_request_error)?;
        Self::read_json(response).await
    }
}

#[async_trait]
impl RemoteGateway for HttpGateway {
    async fn submit(
        &self,
        video: &VideoUpload,
        languages: &[String],
        voice_options: &VoiceOptions,
    ) -> Result<String, GatewayError> {
        let bytes = tokio::fs::read(&video.path)
            .await
            .map_err(|e| GatewayError::File(format!("{}: {e}", video.path.display())))?;

        let languages_json = serde_json::to_string(languages)
            .map_err(|e| GatewayError::Request(format!("languages encode: {e}")))?;
        let voice_json = serde_json::to_string(voice_options)
            .map_err(|e| GatewayError::Request(format!("voiceOptions encode: {e}")))?;

        let part = Part::bytes(bytes)
            .file_name(video.file_name())
            .mime_str(video.mime_type())
            .map_err(map_request_error)?;

        let form = Form::new()
            .part("video", part)
            .text("languages", languages_json)
            .text("voiceOptions", voice_json);

        let response = self
            .client
            .post(self.url("/api/upload"))
            .multipart(form)
            .send()
            .await
            .map_err(map_request_error)?;

        let upload: UploadResponse = Self::read_json(response).await?;
        log::info!("Upload accepted: job {}", upload.job_id);
        Ok(upload.job_id)
    }

    async fn get_status(&self, job_id: &str) -> Result<JobStatusUpdate, GatewayError> {
        self.get_json(&format!("/api/job-status/{job_id}")).await
    }

    async fn get_result(&self, job_id: &str) -> Result<ProcessingResult, GatewayError> {
        self.get_json(&format!("/api/result/{job_id}")).await
    }

    async fn health_check(&self) -> HealthStatus {
        match self.get_json::<HealthStatus>("/api/health").await {
            Ok(health) => health,
            Err(e) => {
                log::debug!("Health check failed ({}): {e}", self.base_url);
                HealthStatus::unavailable()
            }
        }
    }

    fn mode(&self) -> BackendMode {
        BackendMode::Real
    }
}
