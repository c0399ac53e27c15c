use std::path::PathBuf;

use vl_core::domain::error::AppError;
use vl_core::domain::job::PipelineStage;
use vl_core::domain::settings::ClientSettings;
use vl_core::domain::types::{SubmitRequest, VideoUpload, VoiceOptions, SUPPORTED_LANGUAGES};
use vl_core::infra::gateway::{self, BackendMode, HttpGateway, RemoteGateway};
use vl_core::infra::storage::PreferenceStore;
use vl_core::usecase::job_state::{JobSnapshot, PollerPhase};
use vl_core::usecase::localization_service::LocalizationService;

use crate::render::Renderer;

/// コマンドエラー型
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("{0}")]
    App(#[from] AppError),
    #[error("output encode failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("job {job_id} failed: {message}")]
    JobFailed { job_id: String, message: String },
    #[error("job {0} completed but no result was received")]
    ResultUnavailable(String),
    #[error("interrupted")]
    Interrupted,
}

pub type CmdResult<T> = Result<T, CommandError>;

pub struct RunArgs {
    pub video: PathBuf,
    pub languages: Vec<String>,
    pub voice_options: VoiceOptions,
    /// Some なら実行前にモックモードを切り替えて保存する
    pub mock: Option<bool>,
}

/// `mode` コマンドの指定
pub enum ModeChange {
    Set(BackendMode),
    Unset,
}

fn open_preferences(settings: &ClientSettings) -> CmdResult<PreferenceStore> {
    Ok(PreferenceStore::open(&settings.preferences_path)?)
}

/// サービスを組み立てる。モード指定があれば保存してそのまま使い、ヘルスチェックはしない。
async fn open_service(
    settings: ClientSettings,
    forced_mock: Option<bool>,
) -> CmdResult<LocalizationService> {
    let prefs = open_preferences(&settings)?;
    let Some(mock) = forced_mock else {
        return Ok(LocalizationService::bootstrap(settings, prefs).await?);
    };

    prefs.set_mock_mode(mock)?;
    let gateway = gateway::create_gateway(BackendMode::from_mock_flag(mock), &settings)
        .map_err(AppError::from)?;
    Ok(LocalizationService::new(settings, prefs, gateway))
}

/// 停止時のスナップショットから終了結果を決める
fn job_outcome(snap: &JobSnapshot) -> CmdResult<()> {
    let Some(job) = &snap.current_job else {
        return Ok(());
    };
    match job.stage {
        PipelineStage::Error => Err(CommandError::JobFailed {
            job_id: job.job_id.clone(),
            message: job
                .error
                .clone()
                .unwrap_or_else(|| "pipeline error".to_string()),
        }),
        PipelineStage::Complete if snap.result.is_none() => {
            Err(CommandError::ResultUnavailable(job.job_id.clone()))
        }
        _ => Ok(()),
    }
}

// --- Commands ---

pub async fn run(settings: ClientSettings, args: RunArgs) -> CmdResult<()> {
    let service = open_service(settings, args.mock).await?;
    println!("Backend: {}", service.mode().as_str());

    let request = SubmitRequest {
        video: Some(VideoUpload::new(args.video)),
        languages: args.languages,
        voice_options: args.voice_options,
    };

    let mut reader = service.subscribe();
    let job_id = service.submit(&request).await?;
    println!("Job {job_id} submitted");

    let mut renderer = Renderer::new();
    for line in renderer.render(&reader.snapshot()) {
        println!("{line}");
    }

    let last = loop {
        tokio::select! {
            changed = reader.changed() => {
                let Some(snap) = changed else { break reader.snapshot() };
                for line in renderer.render(&snap) {
                    println!("{line}");
                }
                if snap.phase == PollerPhase::Stopped {
                    break snap;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted, discarding job {job_id}");
                service.reset();
                return Err(CommandError::Interrupted);
            }
        }
    };

    let metrics = service.get_metrics();
    log::debug!(
        "Polls: {} sent, {} ok, {} failed",
        metrics.status_polls,
        metrics.status_ok,
        metrics.status_failed
    );
    job_outcome(&last)
}

pub async fn health(settings: ClientSettings) -> CmdResult<()> {
    let checker = HttpGateway::new(&settings.api_base_url, settings.request_timeout)
        .map_err(AppError::from)?;
    let health = checker.health_check().await;
    println!("{}", serde_json::to_string(&health)?);
    Ok(())
}

/// 引数なしなら現在の設定を表示、指定ありなら保存または削除
pub fn mode(settings: ClientSettings, change: Option<ModeChange>) -> CmdResult<()> {
    let prefs = open_preferences(&settings)?;
    match change {
        Some(ModeChange::Set(mode)) => {
            prefs.set_mock_mode(mode.is_mock())?;
            println!("Mode set to {}", mode.as_str());
        }
        Some(ModeChange::Unset) => {
            prefs.clear_mock_mode()?;
            println!("Mode preference cleared");
        }
        None => match prefs.mock_mode()? {
            Some(mock) => println!("{}", BackendMode::from_mock_flag(mock).as_str()),
            None => println!("unset (resolved by health check at startup)"),
        },
    }
    Ok(())
}

pub fn languages(json: bool) -> CmdResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&SUPPORTED_LANGUAGES)?);
        return Ok(());
    }
    for lang in SUPPORTED_LANGUAGES.iter() {
        println!("{}  {} {}", lang.code, lang.flag, lang.name);
    }
    Ok(())
}
