use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lets_talk::{
    api::ScenarioProvider, create_router, AppState, CaptureDevice, Config, FileCapture,
    HttpPracticeApi, PracticeSessionController, RecordingArtifact, RecordingSession,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lets-talk", version, about = "Spoken-language practice sessions")]
struct Cli {
    /// Config file (without extension); missing files fall back to defaults
    #[arg(long, global = true, default_value = lets_talk::config::DEFAULT_CONFIG_PATH)]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a practice session behind the local control API
    Serve {
        /// Replay a WAV file instead of capturing from the microphone
        #[arg(long)]
        input_file: Option<PathBuf>,
    },
    /// Fetch and print one scenario
    Scenario,
    /// Transcribe a WAV file without scoring it
    Transcribe {
        /// WAV file to upload
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("Let's Talk v{}", env!("CARGO_PKG_VERSION"));

    let api = Arc::new(HttpPracticeApi::new(
        cfg.api.base_url.clone(),
        cfg.api_timeout(),
    )?);

    match cli.command {
        Command::Serve { input_file } => serve(cfg, api, input_file.as_deref()).await,
        Command::Scenario => {
            let scenario = api.fetch_random_scenario().await?;
            println!("{}", serde_json::to_string_pretty(&scenario)?);
            Ok(())
        }
        Command::Transcribe { file } => {
            let artifact = RecordingArtifact::from_wav_file(&file)?;
            let text = api.transcribe(&artifact).await?;
            println!("{}", text);
            Ok(())
        }
    }
}

async fn serve(cfg: Config, api: Arc<HttpPracticeApi>, input_file: Option<&Path>) -> Result<()> {
    let device = capture_device(&cfg, input_file)?;
    let recorder = RecordingSession::new(device, cfg.recorder_config());
    let controller = PracticeSessionController::new(recorder, api.clone(), api);

    if let Err(rejection) = controller.begin().await {
        warn!("Could not start the session: {}", rejection);
    }

    let app = create_router(AppState::new(controller.clone()));

    let addr = cfg.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Control API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
        .context("Control API server failed")?;

    controller.shutdown().await;
    info!("Stopped");
    Ok(())
}

fn capture_device(cfg: &Config, input_file: Option<&Path>) -> Result<Arc<dyn CaptureDevice>> {
    if let Some(path) = input_file {
        let device = FileCapture::open(path, &cfg.capture_config())
            .with_context(|| format!("Failed to prepare input file {}", path.display()))?;
        return Ok(Arc::new(device));
    }

    #[cfg(feature = "microphone")]
    {
        Ok(Arc::new(lets_talk::audio::MicrophoneCapture::new(
            cfg.capture_config(),
        )))
    }

    #[cfg(not(feature = "microphone"))]
    {
        anyhow::bail!("Built without the `microphone` feature; pass --input-file <WAV>")
    }
}
