//! シミュレーションモード用の進捗生成。
//!
//! ジョブID に埋め込まれた作成時刻からの経過時間だけでステージと進捗を決める。
//! メトリクスの値だけは注入された乱数から引くため、同じ経過時間でも
//! ステージ/進捗は一致し、メトリクス値は一致するとは限らない。

use rand::Rng;

use super::job::{
    JobStatus, LocalizedVideo, PipelineStage, ProcessingResult, ResultMetrics, StageMetrics,
};

/// 1ステージあたりの時間幅（ミリ秒）
pub const STAGE_WINDOW_MS: i64 = 3000;

/// ステージ内で進捗が伸びる幅
const STAGE_RAMP: f64 = 20.0;

/// シミュレーションのジョブIDプレフィックス
pub const MOCK_JOB_PREFIX: &str = "job_";

/// (ステージ, 下限進捗) の進行表
const STAGE_TABLE: [(PipelineStage, u8); 6] = [
    (PipelineStage::Uploading, 10),
    (PipelineStage::Asr, 30),
    (PipelineStage::Translation, 50),
    (PipelineStage::Tts, 75),
    (PipelineStage::Lipsync, 90),
    (PipelineStage::Complete, 100),
];

const MOCK_LANGUAGES: [&str; 3] = ["Hindi", "Spanish", "French"];

/// シミュレーション用ジョブIDを作る（`job_<unix millis>`）
pub fn mock_job_id(now_ms: i64) -> String {
    format!("{MOCK_JOB_PREFIX}{now_ms}")
}

/// ジョブIDから作成時刻を取り出す。解釈できなければ None。
pub fn created_at_ms(job_id: &str) -> Option<i64> {
    job_id.split('_').nth(1)?.parse().ok()
}

/// 経過時間からステージ表のインデックスを求める（最終ステージで頭打ち）
pub fn stage_index(elapsed_ms: i64) -> usize {
    let idx = elapsed_ms.max(0) / STAGE_WINDOW_MS;
    (idx as usize).min(STAGE_TABLE.len() - 1)
}

/// 経過時間 → (ステージ, 進捗)
pub fn stage_at(elapsed_ms: i64) -> (PipelineStage, u8) {
    let elapsed_ms = elapsed_ms.max(0);
    let (stage, floor) = STAGE_TABLE[stage_index(elapsed_ms)];
    let within = (elapsed_ms % STAGE_WINDOW_MS) as f64 / STAGE_WINDOW_MS as f64;
    let progress = (floor as f64 + within * STAGE_RAMP).floor().min(100.0);
    (stage, progress as u8)
}

/// ステージ到達済みのメトリクスだけを埋める
fn metrics_for<R: Rng + ?Sized>(index: usize, rng: &mut R) -> StageMetrics {
    StageMetrics {
        wer: (index >= 1).then(|| rng.gen_range(0.05..0.15)),
        bleu: (index >= 2).then(|| rng.gen_range(0.75..0.95)),
        mos: (index >= 3).then(|| rng.gen_range(4.0..4.8)),
        lse_c: (index >= 4).then(|| rng.gen_range(0.85..0.95)),
    }
}

/// `now_ms` 時点の合成ステータスを生成する。失敗しない。
///
/// 作成時刻を読めない ID は「いま作成された」ものとして扱う。
pub fn generate_status<R: Rng + ?Sized>(job_id: &str, now_ms: i64, rng: &mut R) -> JobStatus {
    let created = created_at_ms(job_id).unwrap_or(now_ms);
    let elapsed = now_ms - created;
    let index = stage_index(elapsed);
    let (stage, progress) = stage_at(elapsed);

    JobStatus {
        job_id: job_id.to_string(),
        stage,
        progress,
        current_language: Some(MOCK_LANGUAGES[index % MOCK_LANGUAGES.len()].to_string()),
        languages: Some(MOCK_LANGUAGES.iter().map(|l| l.to_string()).collect()),
        source_language: None,
        source_language_confidence: None,
        metrics: Some(metrics_for(index, rng)),
        error: None,
    }
}

/// 固定の合成結果。URL は常に空（再生できない URL を作らない）。
pub fn generate_result(job_id: &str) -> ProcessingResult {
    let videos = [("Hindi", 0.87), ("Spanish", 0.92), ("French", 0.89)]
        .into_iter()
        .map(|(language, confidence)| LocalizedVideo {
            language: language.to_string(),
            url: String::new(),
            confidence,
        })
        .collect::<Vec<_>>();

    ProcessingResult {
        job_id: job_id.to_string(),
        original_video: String::new(),
        metrics: ResultMetrics {
            total_time: 45.0,
            languages_processed: videos.len() as u32,
        },
        localized_videos: videos,
        error: None,
    }
}
