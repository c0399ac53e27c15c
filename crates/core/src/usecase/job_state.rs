//! 単一ジョブの状態コンテナ。
//!
//! 書き込み側（送信処理とポーラー）は `JobStateWriter`、表示側は `JobStateReader` を持つ。
//! 同時に追跡するジョブは高々1つで、新しいジョブの開始は前のステータスと結果を破棄する。

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use crate::domain::job::{JobStatus, JobStatusUpdate, ProcessingResult};

/// ポーラーの状態
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollerPhase {
    /// 追跡中のジョブなし
    #[default]
    Idle,
    /// 非終端ステージのジョブをポーリング中
    Polling,
    /// complete / error に到達して停止済み
    Stopped,
}

/// 読み取り側に配られるスナップショット
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub current_job: Option<JobStatus>,
    pub result: Option<ProcessingResult>,
    pub phase: PollerPhase,
}

impl JobSnapshot {
    fn is_tracking(&self, job_id: &str) -> bool {
        self.current_job
            .as_ref()
            .is_some_and(|job| job.job_id == job_id)
    }
}

/// 空の状態コンテナを作る
pub fn job_state() -> (JobStateWriter, JobStateReader) {
    let (tx, rx) = watch::channel(JobSnapshot::default());
    (JobStateWriter { tx: Arc::new(tx) }, JobStateReader { rx })
}

/// 書き込みハンドル
#[derive(Clone)]
pub struct JobStateWriter {
    tx: Arc<watch::Sender<JobSnapshot>>,
}

impl JobStateWriter {
    /// 新しいジョブを追跡開始（前のステータスと結果は破棄）
    pub fn start_job(&self, job_id: &str) {
        self.tx.send_replace(JobSnapshot {
            current_job: Some(JobStatus::submitted(job_id.to_string())),
            result: None,
            phase: PollerPhase::Idle,
        });
    }

    /// 追跡中のジョブに浅いマージを適用し、マージ後の状態を返す。
    ///
    /// 追跡中のジョブが無い、または別ジョブに差し替わっている場合は何もしない。
    pub fn apply_update(&self, job_id: &str, update: JobStatusUpdate) -> Option<JobStatus> {
        let mut merged = None;
        self.tx.send_if_modified(|snap| {
            let Some(job) = snap.current_job.as_mut().filter(|job| job.job_id == job_id) else {
                return false;
            };
            job.merge(update);
            merged = Some(job.clone());
            true
        });
        merged
    }

    /// 最終結果を記録する（追跡中のジョブに対してのみ）
    pub fn set_result(&self, job_id: &str, result: ProcessingResult) -> bool {
        self.tx.send_if_modified(|snap| {
            if !snap.is_tracking(job_id) {
                return false;
            }
            snap.result = Some(result);
            true
        })
    }

    /// ポーラー状態を更新する（追跡中のジョブに対してのみ）
    pub fn set_phase(&self, job_id: &str, phase: PollerPhase) -> bool {
        self.tx.send_if_modified(|snap| {
            if !snap.is_tracking(job_id) || snap.phase == phase {
                return false;
            }
            snap.phase = phase;
            true
        })
    }

    /// ジョブと結果を破棄
    pub fn reset(&self) {
        self.tx.send_replace(JobSnapshot::default());
    }

    pub fn snapshot(&self) -> JobSnapshot {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> JobStateReader {
        JobStateReader {
            rx: self.tx.subscribe(),
        }
    }
}

/// 読み取りハンドル（表示側）
#[derive(Clone)]
pub struct JobStateReader {
    rx: watch::Receiver<JobSnapshot>,
}

impl JobStateReader {
    pub fn snapshot(&self) -> JobSnapshot {
        self.rx.borrow().clone()
    }

    /// 次の変更まで待ち、最新スナップショットを返す。書き込み側が全て破棄されたら None。
    pub async fn changed(&mut self) -> Option<JobSnapshot> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// ポーラーが停止する（終端ステージ到達）まで待つ
    pub async fn wait_until_stopped(&mut self) -> JobSnapshot {
        loop {
            {
                let snap = self.rx.borrow_and_update();
                if snap.phase == PollerPhase::Stopped {
                    return snap.clone();
                }
            }
            if self.rx.changed().await.is_err() {
                return self.rx.borrow().clone();
            }
        }
    }
}
