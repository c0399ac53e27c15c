//! リモートゲートウェイ: 実 HTTP バックエンドとローカルシミュレータの切替点。
//!
//! どちらの実装を使うかは構築時に一度だけ決める。呼び出しごとにモード分岐はしない。

mod http;
mod simulated;

pub use http::HttpGateway;
pub use simulated::SimulatedGateway;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::error::AppError;
use crate::domain::job::{JobStatusUpdate, ProcessingResult};
use crate::domain::settings::ClientSettings;
use crate::domain::types::{VideoUpload, VoiceOptions};

/// ヘルスチェック失敗時のステータス文字列
pub const HEALTH_UNAVAILABLE: &str = "unavailable";

/// バックエンド種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendMode {
    Real,
    Simulated,
}

impl BackendMode {
    /// 保存済みモックモードフラグ（true = シミュレーション）から変換
    pub fn from_mock_flag(mock: bool) -> Self {
        if mock {
            Self::Simulated
        } else {
            Self::Real
        }
    }

    pub fn is_mock(&self) -> bool {
        matches!(self, Self::Simulated)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Real => "real",
            Self::Simulated => "simulated",
        }
    }
}

/// GET /api/health の応答
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn unavailable() -> Self {
        Self {
            status: HEALTH_UNAVAILABLE.to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// ゲートウェイエラー。クライアント構築失敗以外は通信エラーとして扱う。
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("HTTP client init failed: {0}")]
    Client(String),
    #[error("Request failed: {0}")]
    Request(String),
    #[error("Request timed out")]
    Timeout,
    #[error("Backend returned HTTP {0}")]
    Status(u16),
    #[error("Response parse error: {0}")]
    Decode(String),
    #[error("Failed to read video file: {0}")]
    File(String),
}

impl From<GatewayError> for AppError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Client(_) => AppError::internal(e.to_string()),
            _ => AppError::transport(e.to_string()),
        }
    }
}

/// バックエンド能力 trait
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// 動画と言語・音声オプションを送り、ジョブIDを受け取る。
    /// languages が空でないことは呼び出し側で検証済みとする。
    async fn submit(
        &self,
        video: &VideoUpload,
        languages: &[String],
        voice_options: &VoiceOptions,
    ) -> Result<String, GatewayError>;

    /// ステータス応答を部分更新として返す（キーなしと null を区別する）
    async fn get_status(&self, job_id: &str) -> Result<JobStatusUpdate, GatewayError>;

    /// complete 到達後にだけ呼ばれる
    async fn get_result(&self, job_id: &str) -> Result<ProcessingResult, GatewayError>;

    /// 失敗しない。到達不能・タイムアウト・非2xx は "unavailable"。
    async fn health_check(&self) -> HealthStatus;

    fn mode(&self) -> BackendMode;
}

/// モードに応じたゲートウェイを構築する
pub fn create_gateway(
    mode: BackendMode,
    settings: &ClientSettings,
) -> Result<Arc<dyn RemoteGateway>, GatewayError> {
    let gateway: Arc<dyn RemoteGateway> = match mode {
        BackendMode::Real => Arc::new(HttpGateway::new(
            &settings.api_base_url,
            settings.request_timeout,
        )?),
        BackendMode::Simulated => Arc::new(SimulatedGateway::new(settings.mock_upload_delay)),
    };
    log::info!("Remote gateway selected: {}", mode.as_str());
    Ok(gateway)
}
