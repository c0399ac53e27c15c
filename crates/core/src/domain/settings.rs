use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 実バックエンド URL の環境変数
pub const API_URL_ENV: &str = "VIDIOLINGUA_API_URL";
/// 設定DBパスの環境変数
pub const DB_PATH_ENV: &str = "VL_DB_PATH";

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// クライアント設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSettings {
    /// 実バックエンドのベースURL
    pub api_base_url: String,
    /// 実バックエンド呼び出しのタイムアウト（超過は通信エラー扱い）
    pub request_timeout: Duration,
    /// ステータスポーリング間隔
    pub poll_interval: Duration,
    /// シミュレーションモードのアップロード疑似遅延
    pub mock_upload_delay: Duration,
    /// モックモードフラグを保存する SQLite ファイル
    pub preferences_path: PathBuf,
}

impl ClientSettings {
    /// 環境変数から読み込む（未設定の項目はデフォルト）
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                settings.api_base_url = url.trim().trim_end_matches('/').to_string();
            }
        }
        if let Ok(path) = std::env::var(DB_PATH_ENV) {
            settings.preferences_path = PathBuf::from(path);
        }
        settings
    }
}

/// アプリデータディレクトリ配下のデフォルトDBパス
fn default_preferences_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vidiolingua")
        .join("vidiolingua.db")
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(1),
            mock_upload_delay: Duration::from_secs(1),
            preferences_path: default_preferences_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = ClientSettings::default();
        assert_eq!(s.api_base_url, "http://localhost:8000");
        assert_eq!(s.request_timeout, Duration::from_secs(30));
        assert_eq!(s.poll_interval, Duration::from_secs(1));
        assert!(s.preferences_path.ends_with("vidiolingua.db"));
    }
}
