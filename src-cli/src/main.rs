//! VidioLingua CLI
//!
//! 動画をアップロードして多言語ローカライズの進捗を追跡する。

mod commands;
mod render;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use vl_core::domain::settings::ClientSettings;
use vl_core::domain::types::{VoiceEmotion, VoiceGender, VoiceOptions};
use vl_core::infra::gateway::BackendMode;

use commands::{ModeChange, RunArgs};

#[derive(Parser)]
#[command(name = "vidiolingua")]
#[command(about = "Video localization pipeline client", version)]
struct Cli {
    /// Backend base URL (default: $VIDIOLINGUA_API_URL or http://localhost:8000)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Preference database path (default: $VL_DB_PATH or the app data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a video and follow the job until it finishes
    Run {
        /// Video file to localize
        video: PathBuf,

        /// Target language codes (comma-separated or repeated, e.g. "hi,es")
        #[arg(long = "lang", short = 'l', value_delimiter = ',')]
        languages: Vec<String>,

        #[arg(long, value_enum, default_value = "neutral")]
        gender: GenderArg,

        #[arg(long, value_enum, default_value = "neutral")]
        emotion: EmotionArg,

        /// Use a cloned voice
        #[arg(long)]
        cloned: bool,

        /// Force simulated mode (saved as the new default)
        #[arg(long, conflicts_with = "real")]
        mock: bool,

        /// Force the real backend (saved as the new default)
        #[arg(long)]
        real: bool,
    },

    /// Check whether the real backend is reachable
    Health,

    /// Show, set or clear the saved backend mode
    Mode {
        #[arg(value_enum)]
        mode: Option<ModeArg>,
    },

    /// List supported languages
    Languages {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum GenderArg {
    Male,
    Female,
    Neutral,
}

impl From<GenderArg> for VoiceGender {
    fn from(arg: GenderArg) -> Self {
        match arg {
            GenderArg::Male => VoiceGender::Male,
            GenderArg::Female => VoiceGender::Female,
            GenderArg::Neutral => VoiceGender::Neutral,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum EmotionArg {
    Neutral,
    Happy,
    Sad,
    Excited,
}

impl From<EmotionArg> for VoiceEmotion {
    fn from(arg: EmotionArg) -> Self {
        match arg {
            EmotionArg::Neutral => VoiceEmotion::Neutral,
            EmotionArg::Happy => VoiceEmotion::Happy,
            EmotionArg::Sad => VoiceEmotion::Sad,
            EmotionArg::Excited => VoiceEmotion::Excited,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Simulated,
    Real,
    /// Forget the saved mode (the next run checks the backend again)
    Unset,
}

impl From<ModeArg> for ModeChange {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Simulated => ModeChange::Set(BackendMode::Simulated),
            ModeArg::Real => ModeChange::Set(BackendMode::Real),
            ModeArg::Unset => ModeChange::Unset,
        }
    }
}

/// 環境変数 → CLI 引数の順で設定を組み立てる
fn load_settings(cli: &Cli) -> ClientSettings {
    let mut settings = ClientSettings::from_env();
    if let Some(url) = &cli.api_url {
        settings.api_base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(db) = &cli.db {
        settings.preferences_path = db.clone();
    }
    settings
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let settings = load_settings(&cli);
    log::debug!("Backend URL: {}", settings.api_base_url);

    let result = match cli.command {
        Commands::Run {
            video,
            languages,
            gender,
            emotion,
            cloned,
            mock,
            real,
        } => {
            let args = RunArgs {
                video,
                languages,
                voice_options: VoiceOptions {
                    gender: gender.into(),
                    emotion: emotion.into(),
                    cloned,
                },
                mock: match (mock, real) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                },
            };
            commands::run(settings, args).await
        }
        Commands::Health => commands::health(settings).await,
        Commands::Mode { mode } => commands::mode(settings, mode.map(Into::into)),
        Commands::Languages { json } => commands::languages(json),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
