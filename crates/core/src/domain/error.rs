use serde::Serialize;

/// アプリケーション共通エラーコード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    #[serde(rename = "E_VALIDATION")]
    Validation,
    #[serde(rename = "E_TRANSPORT")]
    Transport,
    #[serde(rename = "E_STORAGE")]
    Storage,
    #[serde(rename = "E_INTERNAL")]
    Internal,
}

/// 送信前の入力検証エラー（ネットワークには到達しない）
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please select a video file")]
    NoVideo,
    #[error("Select at least one language")]
    NoLanguages,
}

/// アプリケーションエラー（UI表示用ペイロード兼用）
#[derive(Debug, Clone, Serialize)]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    pub recoverable: bool,
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Validation,
            message: msg.into(),
            recoverable: true,
        }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Transport,
            message: msg.into(),
            recoverable: true,
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Internal,
            message: msg.into(),
            recoverable: false,
        }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Storage,
            message: msg.into(),
            recoverable: false,
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        Self::validation(e.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}
