use vl_core::domain::job::{JobStatus, PipelineStage, ProcessingResult, StageMetrics};
use vl_core::domain::types::find_language;
use vl_core::usecase::job_state::JobSnapshot;

/// ステージの表示名
pub fn stage_label(stage: PipelineStage) -> &'static str {
    match stage {
        PipelineStage::Idle => "Idle",
        PipelineStage::Uploading => "Uploading",
        PipelineStage::Asr => "Speech recognition",
        PipelineStage::Translation => "Translation",
        PipelineStage::Tts => "Voice synthesis",
        PipelineStage::Lipsync => "Lip sync",
        PipelineStage::Complete => "Complete",
        PipelineStage::Error => "Error",
    }
}

fn language_label(code: &str) -> String {
    match find_language(code) {
        Some(lang) => format!("{} {}", lang.flag, lang.name),
        None => code.to_string(),
    }
}

/// `[ 56%] Translation (Spanish)` 形式の進捗行
pub fn progress_line(job: &JobStatus) -> String {
    let mut line = format!("[{:>3}%] {}", job.progress, stage_label(job.stage));
    if let Some(lang) = &job.current_language {
        line.push_str(&format!(" ({lang})"));
    }
    line
}

/// 品質指標の1行表示。指標が1つも無ければ None。
pub fn metrics_line(metrics: &StageMetrics) -> Option<String> {
    let parts: Vec<String> = [
        ("WER", metrics.wer),
        ("BLEU", metrics.bleu),
        ("MOS", metrics.mos),
        ("LSE-C", metrics.lse_c),
    ]
    .into_iter()
    .filter_map(|(name, value)| value.map(|v| format!("{name} {v:.2}")))
    .collect();

    (!parts.is_empty()).then(|| format!("        {}", parts.join(" | ")))
}

pub fn result_lines(result: &ProcessingResult) -> Vec<String> {
    let mut lines = Vec::new();
    match (&result.error, result.is_partial()) {
        (Some(err), true) => lines.push(format!("Partial result: {err}")),
        (Some(err), false) => lines.push(format!("Processing failed: {err}")),
        (None, _) => lines.push(format!(
            "Done: {} language(s) in {:.1}s",
            result.metrics.languages_processed, result.metrics.total_time
        )),
    }

    for video in &result.localized_videos {
        let target = if video.is_playable() {
            video.url.clone()
        } else {
            "(demo output, no video)".to_string()
        };
        lines.push(format!(
            "  {:<16} {:>3.0}%  {target}",
            language_label(&video.language),
            video.confidence * 100.0
        ));
    }
    lines
}

/// 状態変化を端末向けの行に変換する。前回と同じ内容は出さない。
#[derive(Default)]
pub struct Renderer {
    last_progress: Option<String>,
    last_metrics: Option<String>,
    last_error: Option<String>,
    result_shown: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, snap: &JobSnapshot) -> Vec<String> {
        let mut out = Vec::new();

        if let Some(job) = &snap.current_job {
            let progress = progress_line(job);
            if self.last_progress.as_ref() != Some(&progress) {
                out.push(progress.clone());
                self.last_progress = Some(progress);
            }

            if let Some(metrics) = job.metrics.as_ref().and_then(metrics_line) {
                if self.last_metrics.as_ref() != Some(&metrics) {
                    out.push(metrics.clone());
                    self.last_metrics = Some(metrics);
                }
            }

            if job.error != self.last_error {
                if let Some(err) = &job.error {
                    out.push(format!("        error: {err}"));
                }
                self.last_error = job.error.clone();
            }
        }

        if let Some(result) = &snap.result {
            if !self.result_shown {
                out.extend(result_lines(result));
                self.result_shown = true;
            }
        }
        out
    }
}
