use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};

use super::job_state::{job_state, JobSnapshot, JobStateReader, JobStateWriter};
use super::poller::StatusPoller;
use crate::domain::error::AppError;
use crate::domain::settings::ClientSettings;
use crate::domain::types::SubmitRequest;
use crate::infra::gateway::{self, BackendMode, HttpGateway, RemoteGateway};
use crate::infra::metrics::{PollMetrics, PollMetricsSummary};
use crate::infra::storage::PreferenceStore;

/// 起動時のモード決定。
///
/// 保存済みの設定があればそれを使う。無ければ実バックエンドへヘルスチェックし、
/// "ok" なら実バックエンドを選んで "false" を保存する。それ以外はシミュレーション（保存しない）。
pub async fn resolve_backend_mode(
    preferences: &PreferenceStore,
    checker: &dyn RemoteGateway,
) -> Result<BackendMode, AppError> {
    if let Some(mock) = preferences.mock_mode()? {
        log::info!("Using stored backend preference (mock = {mock})");
        return Ok(BackendMode::from_mock_flag(mock));
    }

    let health = checker.health_check().await;
    if health.is_ok() {
        log::info!("Backend reachable, defaulting to real API");
        preferences.set_mock_mode(false)?;
        Ok(BackendMode::Real)
    } else {
        log::info!("Backend {}, staying in simulated mode", health.status);
        Ok(BackendMode::Simulated)
    }
}

/// ローカライズジョブのアプリケーションサービス。
///
/// ジョブ状態の書き込みはこのサービス（送信）とポーラーだけが行う。表示側は `subscribe` で読む。
pub struct LocalizationService {
    settings: ClientSettings,
    preferences: Mutex<PreferenceStore>,
    gateway: RwLock<Arc<dyn RemoteGateway>>,
    state: JobStateWriter,
    poller: StatusPoller,
    metrics: Arc<PollMetrics>,
}

impl LocalizationService {
    pub fn new(
        settings: ClientSettings,
        preferences: PreferenceStore,
        gateway: Arc<dyn RemoteGateway>,
    ) -> Self {
        let (state, _reader) = job_state();
        let metrics = Arc::new(PollMetrics::new());
        let poller = StatusPoller::new(state.clone(), settings.poll_interval, metrics.clone());

        Self {
            settings,
            preferences: Mutex::new(preferences),
            gateway: RwLock::new(gateway),
            state,
            poller,
            metrics,
        }
    }

    /// 起動処理: モードを決めてゲートウェイを一度だけ構築する
    pub async fn bootstrap(
        settings: ClientSettings,
        preferences: PreferenceStore,
    ) -> Result<Self, AppError> {
        let checker = HttpGateway::new(&settings.api_base_url, settings.request_timeout)?;
        let mode = resolve_backend_mode(&preferences, &checker).await?;
        let gateway = gateway::create_gateway(mode, &settings)?;
        Ok(Self::new(settings, preferences, gateway))
    }

    // ==================== Job ====================

    /// ジョブを送信してポーリングを開始する。
    ///
    /// 入力検証に失敗した場合はネットワークに触れずに返る。
    /// 検証を通れば、前のジョブのタイマー・状態・結果は破棄される。
    pub async fn submit(&self, request: &SubmitRequest) -> Result<String, AppError> {
        let (video, languages) = request.validate()?;

        self.poller.stop();
        self.state.reset();

        let gateway = self.gateway();
        let started = Instant::now();
        let job_id = gateway
            .submit(video, languages, &request.voice_options)
            .await?;
        self.metrics
            .record_latency("submit", started.elapsed().as_millis() as u64);
        self.metrics.inc_jobs_submitted();

        log::info!(
            "Job {job_id} submitted ({} mode, languages: {})",
            gateway.mode().as_str(),
            languages.join(",")
        );

        self.state.start_job(&job_id);
        self.poller.start(gateway, &job_id);
        Ok(job_id)
    }

    /// 現在のジョブと結果を破棄してタイマーを止める（モック設定は維持）
    pub fn reset(&self) {
        self.poller.stop();
        self.state.reset();
    }

    pub fn snapshot(&self) -> JobSnapshot {
        self.state.snapshot()
    }

    pub fn subscribe(&self) -> JobStateReader {
        self.state.subscribe()
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_active()
    }

    // ==================== Backend mode ====================

    pub fn mode(&self) -> BackendMode {
        self.gateway.read().mode()
    }

    /// モックモードを切り替えて保存する。
    ///
    /// 新しいゲートウェイは次の送信から使われる。動作中のポーリングは元のゲートウェイのまま続く。
    pub fn set_mock_mode(&self, mock: bool) -> Result<BackendMode, AppError> {
        let mode = BackendMode::from_mock_flag(mock);
        self.preferences.lock().set_mock_mode(mock)?;

        if self.mode() != mode {
            let gateway = gateway::create_gateway(mode, &self.settings)?;
            *self.gateway.write() = gateway;
        }
        Ok(mode)
    }

    // ==================== Metrics ====================

    pub fn get_metrics(&self) -> PollMetricsSummary {
        self.metrics.summary()
    }

    fn gateway(&self) -> Arc<dyn RemoteGateway> {
        self.gateway.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::domain::error::ErrorCode;
    use crate::domain::job::{JobStatusUpdate, PipelineStage, ProcessingResult};
    use crate::domain::progression::generate_result;
    use crate::domain::types::{VideoUpload, VoiceOptions};
    use crate::infra::gateway::{GatewayError, HealthStatus};
    use crate::usecase::job_state::PollerPhase;

    /// 呼び出し回数だけ数えるゲートウェイ
    struct CountingGateway {
        health: &'static str,
        submits: AtomicUsize,
        health_checks: AtomicUsize,
        fail_submit: bool,
    }

    impl CountingGateway {
        fn new(health: &'static str) -> Arc<Self> {
            Arc::new(Self {
                health,
                submits: AtomicUsize::new(0),
                health_checks: AtomicUsize::new(0),
                fail_submit: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                health: "ok",
                submits: AtomicUsize::new(0),
                health_checks: AtomicUsize::new(0),
                fail_submit: true,
            })
        }
    }

    #[async_trait]
    impl RemoteGateway for CountingGateway {
        async fn submit(
            &self,
            _video: &VideoUpload,
            _languages: &[String],
            _voice_options: &VoiceOptions,
        ) -> Result<String, GatewayError> {
            let n = self.submits.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_submit {
                return Err(GatewayError::Request("connection refused".to_string()));
            }
            Ok(format!("job-{n}"))
        }

        async fn get_status(&self, _job_id: &str) -> Result<JobStatusUpdate, GatewayError> {
            Ok(JobStatusUpdate {
                stage: Some(PipelineStage::Complete),
                progress: Some(100),
                ..Default::default()
            })
        }

        async fn get_result(&self, job_id: &str) -> Result<ProcessingResult, GatewayError> {
            Ok(generate_result(job_id))
        }

        async fn health_check(&self) -> HealthStatus {
            self.health_checks.fetch_add(1, Ordering::SeqCst);
            HealthStatus {
                status: self.health.to_string(),
            }
        }

        fn mode(&self) -> BackendMode {
            BackendMode::Real
        }
    }

    fn request(languages: &[&str]) -> SubmitRequest {
        SubmitRequest {
            video: Some(VideoUpload::new("clip.mp4")),
            languages: languages.iter().map(|l| l.to_string()).collect(),
            voice_options: VoiceOptions::default(),
        }
    }

    fn service(gateway: Arc<dyn RemoteGateway>) -> LocalizationService {
        LocalizationService::new(
            ClientSettings::default(),
            PreferenceStore::open_in_memory().unwrap(),
            gateway,
        )
    }

    #[tokio::test]
    async fn test_resolve_uses_stored_preference() {
        let prefs = PreferenceStore::open_in_memory().unwrap();
        prefs.set_mock_mode(true).unwrap();
        let checker = CountingGateway::new("ok");

        let mode = resolve_backend_mode(&prefs, checker.as_ref()).await.unwrap();
        assert_eq!(mode, BackendMode::Simulated);
        assert_eq!(checker.health_checks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_resolve_health_ok_persists_real() {
        let prefs = PreferenceStore::open_in_memory().unwrap();
        let checker = CountingGateway::new("ok");

        let mode = resolve_backend_mode(&prefs, checker.as_ref()).await.unwrap();
        assert_eq!(mode, BackendMode::Real);
        assert_eq!(prefs.mock_mode().unwrap(), Some(false));
    }

    #[tokio::test]
    async fn test_resolve_health_unavailable_stays_simulated() {
        let prefs = PreferenceStore::open_in_memory().unwrap();
        let checker = CountingGateway::new("unavailable");

        let mode = resolve_backend_mode(&prefs, checker.as_ref()).await.unwrap();
        assert_eq!(mode, BackendMode::Simulated);
        assert_eq!(prefs.mock_mode().unwrap(), None);
    }

    #[tokio::test]
    async fn test_submit_rejects_empty_languages_without_network() {
        let gw = CountingGateway::new("ok");
        let svc = service(gw.clone());

        let err = svc.submit(&request(&[])).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Validation);
        assert_eq!(gw.submits.load(Ordering::SeqCst), 0);
        assert!(svc.snapshot().current_job.is_none());
        assert!(!svc.is_polling());
    }

    #[tokio::test]
    async fn test_submit_rejects_missing_video() {
        let gw = CountingGateway::new("ok");
        let svc = service(gw.clone());

        let mut req = request(&["hi"]);
        req.video = None;
        let err = svc.submit(&req).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Validation);
        assert_eq!(gw.submits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_submit_transport_failure() {
        let svc = service(CountingGateway::failing());
        let err = svc.submit(&request(&["hi"])).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Transport);
        assert!(svc.snapshot().current_job.is_none());
        assert!(!svc.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_starts_polling_and_completes() {
        let svc = service(CountingGateway::new("ok"));
        let mut reader = svc.subscribe();

        let job_id = svc.submit(&request(&["hi", "es"])).await.unwrap();
        assert_eq!(job_id, "job-1");
        assert!(svc.is_polling());

        let snap = reader.wait_until_stopped().await;
        assert_eq!(snap.phase, PollerPhase::Stopped);
        assert_eq!(snap.current_job.unwrap().stage, PipelineStage::Complete);
        assert_eq!(snap.result.unwrap().job_id, "job-1");

        let metrics = svc.get_metrics();
        assert_eq!(metrics.jobs_submitted, 1);
        assert_eq!(metrics.results_fetched, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_job_discards_previous() {
        let svc = service(CountingGateway::new("ok"));
        let mut reader = svc.subscribe();

        svc.submit(&request(&["hi"])).await.unwrap();
        reader.wait_until_stopped().await;
        assert!(svc.snapshot().result.is_some());

        let second = svc.submit(&request(&["fr"])).await.unwrap();
        let snap = svc.snapshot();
        assert_eq!(snap.current_job.unwrap().job_id, second);
        assert!(snap.result.is_none());
        assert_eq!(snap.phase, PollerPhase::Polling);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_clears_job_and_stops_timer() {
        let svc = service(CountingGateway::new("ok"));
        svc.submit(&request(&["hi"])).await.unwrap();
        assert!(svc.is_polling());

        svc.reset();
        assert!(!svc.is_polling());
        assert_eq!(svc.snapshot(), JobSnapshot::default());

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(svc.snapshot().current_job.is_none());
    }

    #[tokio::test]
    async fn test_set_mock_mode_persists_and_swaps_gateway() {
        let svc = service(CountingGateway::new("ok"));
        assert_eq!(svc.mode(), BackendMode::Real);

        let mode = svc.set_mock_mode(true).unwrap();
        assert_eq!(mode, BackendMode::Simulated);
        assert_eq!(svc.mode(), BackendMode::Simulated);
        assert_eq!(svc.preferences.lock().mock_mode().unwrap(), Some(true));

        svc.set_mock_mode(false).unwrap();
        assert_eq!(svc.mode(), BackendMode::Real);
        assert_eq!(svc.preferences.lock().mock_mode().unwrap(), Some(false));
    }
}
