use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::error::ValidationError;

/// 対応言語
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Language {
    pub code: &'static str,
    pub name: &'static str,
    pub flag: &'static str,
}

/// 選択可能な言語一覧
pub const SUPPORTED_LANGUAGES: [Language; 8] = [
    Language { code: "hi", name: "Hindi", flag: "🇮🇳" },
    Language { code: "es", name: "Spanish", flag: "🇪🇸" },
    Language { code: "fr", name: "French", flag: "🇫🇷" },
    Language { code: "de", name: "German", flag: "🇩🇪" },
    Language { code: "ja", name: "Japanese", flag: "🇯🇵" },
    Language { code: "zh", name: "Chinese", flag: "🇨🇳" },
    Language { code: "ar", name: "Arabic", flag: "🇸🇦" },
    Language { code: "pt", name: "Portuguese", flag: "🇵🇹" },
];

pub fn find_language(code: &str) -> Option<&'static Language> {
    SUPPORTED_LANGUAGES.iter().find(|l| l.code == code)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceGender {
    Male,
    Female,
    #[default]
    Neutral,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceEmotion {
    #[default]
    Neutral,
    Happy,
    Sad,
    Excited,
}

/// 音声合成オプション（multipart の voiceOptions に JSON で載る）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceOptions {
    pub gender: VoiceGender,
    pub emotion: VoiceEmotion,
    pub cloned: bool,
}

/// アップロード対象の動画
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoUpload {
    pub path: PathBuf,
}

impl VideoUpload {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video.mp4".to_string())
    }

    /// 拡張子から video/* の MIME を決める（バックエンドは video/* 以外を拒否する）
    pub fn mime_type(&self) -> &'static str {
        mime_for(&self.path)
    }
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        _ => "video/mp4",
    }
}

/// ジョブ送信リクエスト
#[derive(Debug, Clone, Default)]
pub struct SubmitRequest {
    pub video: Option<VideoUpload>,
    /// 言語コード（例: "hi", "es"）
    pub languages: Vec<String>,
    pub voice_options: VoiceOptions,
}

impl SubmitRequest {
    /// 送信前チェック。通ったら (動画, 言語) を返す。
    pub fn validate(&self) -> Result<(&VideoUpload, &[String]), ValidationError> {
        let video = self.video.as_ref().ok_or(ValidationError::NoVideo)?;
        if self.languages.is_empty() {
            return Err(ValidationError::NoLanguages);
        }
        Ok((video, &self.languages))
    }
}
