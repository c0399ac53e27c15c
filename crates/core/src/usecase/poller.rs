use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, Instant};

use super::job_state::{JobStateWriter, PollerPhase};
use crate::domain::job::{JobStatusUpdate, PipelineStage};
use crate::infra::gateway::{GatewayError, RemoteGateway};
use crate::infra::metrics::PollMetrics;

/// ステータス取得失敗時にジョブ状態へ書き込むメッセージ
pub const STATUS_FETCH_FAILED: &str = "Failed to fetch job status";
/// 結果取得失敗時にジョブ状態へ書き込むメッセージ
pub const RESULT_FETCH_FAILED: &str = "Failed to fetch processing result";

struct ActivePoll {
    job_id: String,
    handle: JoinHandle<()>,
}

/// ステータスポーラー: 追跡中の1ジョブを一定間隔でポーリングする。
///
/// タイマーは常に高々1つ。`start` は既存タイマーを同期的に破棄してから新しいものを張る。
/// 各 tick のリクエストは独立したタスクで走るため、応答が間隔より遅くても
/// タイマーは止まらず、リクエストが重なることがある。応答は到着順に適用する。
pub struct StatusPoller {
    state: JobStateWriter,
    interval: Duration,
    metrics: Arc<PollMetrics>,
    active: Mutex<Option<ActivePoll>>,
}

impl StatusPoller {
    pub fn new(state: JobStateWriter, interval: Duration, metrics: Arc<PollMetrics>) -> Self {
        Self {
            state,
            interval,
            metrics,
            active: Mutex::new(None),
        }
    }

    /// ポーリングを開始する。tokio ランタイム上で呼ぶこと。
    pub fn start(&self, gateway: Arc<dyn RemoteGateway>, job_id: &str) {
        let mut active = self.active.lock();
        if let Some(prev) = active.take() {
            prev.handle.abort();
            log::debug!("Poll timer for {} replaced by {job_id}", prev.job_id);
        }

        self.state.set_phase(job_id, PollerPhase::Polling);
        let handle = tokio::spawn(poll_loop(
            gateway,
            self.state.clone(),
            self.metrics.clone(),
            job_id.to_string(),
            self.interval,
        ));

        *active = Some(ActivePoll {
            job_id: job_id.to_string(),
            handle,
        });
    }

    /// タイマーを破棄する。何度呼んでもよい。破棄したタイマーがあれば true。
    ///
    /// 応答待ちのリクエストも一緒に破棄されるので、停止後に状態へ適用されることはない。
    pub fn stop(&self) -> bool {
        let Some(prev) = self.active.lock().take() else {
            return false;
        };
        if !prev.handle.is_finished() {
            self.state.set_phase(&prev.job_id, PollerPhase::Idle);
        }
        prev.handle.abort();
        log::debug!("Poll timer for {} torn down", prev.job_id);
        true
    }

    /// タイマーが動作中か
    pub fn is_active(&self) -> bool {
        self.active
            .lock()
            .as_ref()
            .is_some_and(|a| !a.handle.is_finished())
    }

    /// タイマーを持っているジョブ
    pub fn active_job(&self) -> Option<String> {
        self.active.lock().as_ref().map(|a| a.job_id.clone())
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        if let Some(active) = self.active.get_mut().take() {
            active.handle.abort();
        }
    }
}

type StatusReply = (Result<JobStatusUpdate, GatewayError>, u64);

async fn poll_loop(
    gateway: Arc<dyn RemoteGateway>,
    state: JobStateWriter,
    metrics: Arc<PollMetrics>,
    job_id: String,
    interval: Duration,
) {
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    let mut in_flight: JoinSet<StatusReply> = JoinSet::new();

    let terminal = loop {
        tokio::select! {
            _ = ticker.tick() => {
                metrics.inc_status_polls();
                let gateway = gateway.clone();
                let job_id = job_id.clone();
                in_flight.spawn(async move {
                    let started = Instant::now();
                    let reply = gateway.get_status(&job_id).await;
                    (reply, started.elapsed().as_millis() as u64)
                });
            }
            Some(joined) = in_flight.join_next() => {
                let Ok((reply, elapsed_ms)) = joined else {
                    continue;
                };
                metrics.record_latency("status", elapsed_ms);

                let update = match reply {
                    Ok(update) => {
                        metrics.record_status(true);
                        update
                    }
                    Err(e) => {
                        metrics.record_status(false);
                        log::warn!("Status poll for {job_id} failed: {e}");
                        JobStatusUpdate::error(STATUS_FETCH_FAILED)
                    }
                };

                // 別ジョブに差し替わっていたら終了
                let Some(merged) = state.apply_update(&job_id, update) else {
                    return;
                };
                if merged.stage.is_terminal() {
                    break merged.stage;
                }
            }
        }
    };

    // 残りの応答待ちは破棄
    drop(in_flight);
    log::info!("Job {job_id} reached terminal stage: {}", terminal.as_str());

    if terminal == PipelineStage::Complete {
        let started = Instant::now();
        let fetched = gateway.get_result(&job_id).await;
        metrics.record_latency("result", started.elapsed().as_millis() as u64);
        match fetched {
            Ok(result) => {
                metrics.record_result(true);
                log::info!(
                    "Result for {job_id}: {} localized video(s)",
                    result.localized_videos.len()
                );
                state.set_result(&job_id, result);
            }
            Err(e) => {
                metrics.record_result(false);
                log::warn!("Result fetch for {job_id} failed: {e}");
                state.apply_update(&job_id, JobStatusUpdate::error(RESULT_FETCH_FAILED));
            }
        }
    }

    state.set_phase(&job_id, PollerPhase::Stopped);
}
