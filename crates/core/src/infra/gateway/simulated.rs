use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{BackendMode, GatewayError, HealthStatus, RemoteGateway};
use crate::domain::job::{JobStatusUpdate, ProcessingResult};
use crate::domain::progression;
use crate::domain::types::{VideoUpload, VoiceOptions};
use crate::infra::clock::{Clock, SystemClock};

/// SimulatedGateway: ネットワークを使わずに進捗を合成するモック実装。
/// バックエンドに到達できないデモ環境用。
pub struct SimulatedGateway {
    clock: Arc<dyn Clock>,
    upload_delay: Duration,
}

impl SimulatedGateway {
    pub fn new(upload_delay: Duration) -> Self {
        Self::with_clock(Arc::new(SystemClock), upload_delay)
    }

    pub fn with_clock(clock: Arc<dyn Clock>, upload_delay: Duration) -> Self {
        Self {
            clock,
            upload_delay,
        }
    }
}

#[async_trait]
impl RemoteGateway for SimulatedGateway {
    async fn submit(
        &self,
        video: &VideoUpload,
        languages: &[String],
        _voice_options: &VoiceOptions,
    ) -> Result<String, GatewayError> {
        // アップロード遅延の再現
        tokio::time::sleep(self.upload_delay).await;
        let job_id = progression::mock_job_id(self.clock.now_ms());
        log::info!(
            "Simulated upload of {} for {} language(s): {job_id}",
            video.file_name(),
            languages.len()
        );
        Ok(job_id)
    }

    async fn get_status(&self, job_id: &str) -> Result<JobStatusUpdate, GatewayError> {
        let now = self.clock.now_ms();
        let status = progression::generate_status(job_id, now, &mut rand::thread_rng());
        Ok(status.into())
    }

    async fn get_result(&self, job_id: &str) -> Result<ProcessingResult, GatewayError> {
        Ok(progression::generate_result(job_id))
    }

    async fn health_check(&self) -> HealthStatus {
        HealthStatus {
            status: self.mode().as_str().to_string(),
        }
    }

    fn mode(&self) -> BackendMode {
        BackendMode::Simulated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::job::PipelineStage;
    use crate::infra::clock::ManualClock;

    const T0: i64 = 1_700_000_000_000;

    fn gateway(clock: Arc<ManualClock>) -> SimulatedGateway {
        SimulatedGateway::with_clock(clock, Duration::from_secs(1))
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_fabricates_timestamp_id() {
        let clock = Arc::new(ManualClock::new(T0));
        let gw = gateway(clock);

        let started = tokio::time::Instant::now();
        let job_id = gw
            .submit(
                &VideoUpload::new("/does/not/matter.mp4"),
                &["hi".to_string()],
                &VoiceOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(job_id, format!("job_{T0}"));
        assert!(started.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_status_follows_clock() {
        let clock = Arc::new(ManualClock::new(T0));
        let gw = gateway(clock.clone());
        let job_id = progression::mock_job_id(T0);

        assert_eq!(
            gw.get_status(&job_id).await.unwrap().stage,
            Some(PipelineStage::Uploading)
        );

        clock.advance(7_000);
        let status = gw.get_status(&job_id).await.unwrap();
        assert_eq!(status.stage, Some(PipelineStage::Translation));
        assert_eq!(status.progress, Some(56));

        clock.advance(60_000);
        let status = gw.get_status(&job_id).await.unwrap();
        assert_eq!(
            (status.stage, status.progress),
            (Some(PipelineStage::Complete), Some(100))
        );
    }

    #[tokio::test]
    async fn test_result_has_empty_urls() {
        let gw = SimulatedGateway::new(Duration::ZERO);
        let result = gw.get_result("job_1").await.unwrap();
        assert_eq!(result.job_id, "job_1");
        assert!(result.localized_videos.iter().all(|v| v.url.is_empty()));
    }

    #[tokio::test]
    async fn test_health_reports_simulated() {
        let gw = SimulatedGateway::new(Duration::ZERO);
        assert_eq!(gw.health_check().await.status, "simulated");
        assert_eq!(gw.mode(), BackendMode::Simulated);
    }
}
