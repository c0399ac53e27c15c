use serde::{Deserialize, Deserializer, Serialize};

/// パイプラインステージ（宣言順 = 進行順）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Idle,
    Uploading,
    Asr,
    Translation,
    Tts,
    Lipsync,
    Complete,
    Error,
}

impl PipelineStage {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Idle => "idle",
            Self::Uploading => "uploading",
            Self::Asr => "asr",
            Self::Translation => "translation",
            Self::Tts => "tts",
            Self::Lipsync => "lipsync",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }

    /// complete / error はポーリング終了条件
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

/// ステージごとの品質メトリクス（ステージ完了に応じて段階的に埋まる）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageMetrics {
    /// Word Error Rate (ASR)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wer: Option<f64>,
    /// BLEU score (translation)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bleu: Option<f64>,
    /// Mean Opinion Score (TTS)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mos: Option<f64>,
    /// Lip-sync confidence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lse_c: Option<f64>,
}

/// ジョブの最新状態
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub job_id: String,
    pub stage: PipelineStage,
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub languages: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_language_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<StageMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobStatus {
    /// 送信直後の初期状態（uploading, 0%）
    pub fn submitted(job_id: String) -> Self {
        Self {
            job_id,
            stage: PipelineStage::Uploading,
            progress: 0,
            current_language: None,
            languages: None,
            source_language: None,
            source_language_confidence: None,
            metrics: None,
            error: None,
        }
    }

    /// 浅いマージ: update に存在するフィールドだけ置き換え、無いものは保持する。
    ///
    /// null で届いたフィールドは存在扱いで、既存値を消す。
    /// metrics はレコード単位で置き換わる（フィールド単位のマージはしない）。
    pub fn merge(&mut self, update: JobStatusUpdate) {
        if let Some(stage) = update.stage {
            self.stage = stage;
        }
        if let Some(progress) = update.progress {
            self.progress = progress.min(100);
        }
        if let Some(v) = update.current_language {
            self.current_language = v;
        }
        if let Some(v) = update.languages {
            self.languages = v;
        }
        if let Some(v) = update.source_language {
            self.source_language = v;
        }
        if let Some(v) = update.source_language_confidence {
            self.source_language_confidence = v;
        }
        if let Some(v) = update.metrics {
            self.metrics = v;
        }
        if let Some(v) = update.error {
            self.error = v;
        }
    }

    /// error が空でなければ失敗扱い
    pub fn has_error(&self) -> bool {
        self.error.as_deref().is_some_and(|e| !e.is_empty())
    }
}

/// 存在するキーは null でも `Some(None)` にする（キーなしは `default` で `None`）
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// 部分更新（ステータス応答そのもの）。
///
/// 外側の `None` は「キーなし」（既存値を保持）、`Some(None)` は「null」（既存値を消す）。
/// stage / progress は null を送られても消せないので単純な `Option`。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<PipelineStage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub current_language: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub languages: Option<Option<Vec<String>>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub source_language: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub source_language_confidence: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Option<StageMetrics>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub error: Option<Option<String>>,
}

impl JobStatusUpdate {
    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            error: Some(Some(msg.into())),
            ..Default::default()
        }
    }
}

/// 値のあるフィールドだけを更新として扱う（None はキーなし扱い）
impl From<JobStatus> for JobStatusUpdate {
    fn from(status: JobStatus) -> Self {
        Self {
            stage: Some(status.stage),
            progress: Some(status.progress),
            current_language: status.current_language.map(Some),
            languages: status.languages.map(Some),
            source_language: status.source_language.map(Some),
            source_language_confidence: status.source_language_confidence.map(Some),
            metrics: status.metrics.map(Some),
            error: status.error.map(Some),
        }
    }
}

/// 言語ごとのローカライズ済み動画
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizedVideo {
    pub language: String,
    /// 空文字 = 動画なし（モック結果など）
    pub url: String,
    pub confidence: f64,
}

impl LocalizedVideo {
    /// http(s) URL のときだけ再生可能とみなす
    pub fn is_playable(&self) -> bool {
        self.url.starts_with("http://") || self.url.starts_with("https://")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetrics {
    /// 秒
    pub total_time: f64,
    pub languages_processed: u32,
}

/// 完了ジョブの最終成果物（complete 到達時に一度だけ取得）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingResult {
    pub job_id: String,
    #[serde(default)]
    pub original_video: String,
    #[serde(default)]
    pub localized_videos: Vec<LocalizedVideo>,
    #[serde(default)]
    pub metrics: ResultMetrics,
    /// パイプライン失敗、または吹き替え動画が一本も無い場合に設定される
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProcessingResult {
    /// エラー付きだが一部の言語は処理できた
    pub fn is_partial(&self) -> bool {
        self.error.is_some() && self.metrics.languages_processed > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submitted_status() {
        let status = JobStatus::submitted("job_1".to_string());
        assert_eq!(status.stage, PipelineStage::Uploading);
        assert_eq!(status.progress, 0);
        assert!(status.metrics.is_none());
        assert!(!status.has_error());
    }

    #[test]
    fn test_merge_preserves_absent_fields() {
        let mut status = JobStatus::submitted("job_1".to_string());
        status.stage = PipelineStage::Asr;
        status.progress = 10;
        status.metrics = Some(StageMetrics {
            wer: Some(0.1),
            ..Default::default()
        });

        status.merge(JobStatusUpdate {
            progress: Some(50),
            ..Default::default()
        });

        assert_eq!(status.stage, PipelineStage::Asr);
        assert_eq!(status.progress, 50);
        assert_eq!(status.metrics.as_ref().and_then(|m| m.wer), Some(0.1));
    }

    #[test]
    fn test_merge_replaces_metrics_wholesale() {
        let mut status = JobStatus::submitted("job_1".to_string());
        status.metrics = Some(StageMetrics {
            wer: Some(0.1),
            ..Default::default()
        });

        status.merge(JobStatusUpdate {
            metrics: Some(Some(StageMetrics {
                bleu: Some(0.8),
                ..Default::default()
            })),
            ..Default::default()
        });

        let metrics = status.metrics.unwrap();
        assert_eq!(metrics.wer, None);
        assert_eq!(metrics.bleu, Some(0.8));
    }

    #[test]
    fn test_merge_error_does_not_change_stage() {
        let mut status = JobStatus::submitted("job_1".to_string());
        status.merge(JobStatusUpdate::error("Failed to fetch job status"));
        assert_eq!(status.stage, PipelineStage::Uploading);
        assert!(status.has_error());
    }

    #[test]
    fn test_merge_null_clears_field() {
        let mut status = JobStatus::submitted("job_1".to_string());
        status.current_language = Some("Hindi".to_string());
        status.merge(JobStatusUpdate::error("Failed to fetch job status"));

        status.merge(JobStatusUpdate {
            stage: Some(PipelineStage::Translation),
            current_language: Some(None),
            error: Some(None),
            ..Default::default()
        });

        assert_eq!(status.stage, PipelineStage::Translation);
        assert!(status.current_language.is_none());
        assert!(status.error.is_none());
        assert!(!status.has_error());
    }

    #[test]
    fn test_update_from_status_keeps_missing_fields() {
        let mut status = JobStatus::submitted("job_1".to_string());
        status.languages = Some(vec!["hi".to_string()]);

        let mut reply = JobStatus::submitted("job_1".to_string());
        reply.stage = PipelineStage::Asr;
        status.merge(reply.into());

        assert_eq!(status.stage, PipelineStage::Asr);
        assert_eq!(status.languages, Some(vec!["hi".to_string()]));
    }

    #[test]
    fn test_merge_clamps_progress() {
        let mut status = JobStatus::submitted("job_1".to_string());
        status.merge(JobStatusUpdate {
            progress: Some(250),
            ..Default::default()
        });
        assert_eq!(status.progress, 100);
    }

    #[test]
    fn test_stage_ordering_and_terminal() {
        assert!(PipelineStage::Uploading < PipelineStage::Asr);
        assert!(PipelineStage::Lipsync < PipelineStage::Complete);
        assert!(PipelineStage::Complete.is_terminal());
        assert!(PipelineStage::Error.is_terminal());
        assert!(!PipelineStage::Tts.is_terminal());
        assert!(!PipelineStage::Idle.is_terminal());
    }

    #[test]
    fn test_playable_url() {
        let mut video = LocalizedVideo {
            language: "Hindi".to_string(),
            url: String::new(),
            confidence: 0.9,
        };
        assert!(!video.is_playable());
        video.url = "/api/result/x/file/hi.mp4".to_string();
        assert!(!video.is_playable());
        video.url = "https://cdn.example.com/hi.mp4".to_string();
        assert!(video.is_playable());
    }

    #[test]
    fn test_partial_result() {
        let result = ProcessingResult {
            job_id: "j".to_string(),
            original_video: String::new(),
            localized_videos: vec![],
            metrics: ResultMetrics {
                total_time: 10.0,
                languages_processed: 1,
            },
            error: Some("tts failed for fr".to_string()),
        };
        assert!(result.is_partial());
    }
}
