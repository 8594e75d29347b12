//! coohom-uploader - Coohom 3D model upload tool
//!
//! Runs the upload workflow (STS → object store → parse → poll → submit)
//! from the command line, or serves it over HTTP with `serve`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coohom_common::config::load_toml_config;
use coohom_uploader::client::{CoohomApi, CoohomClient};
use coohom_uploader::config::{Settings, SettingsOverrides};
use coohom_uploader::models::{SubmitParams, UploadHistory};
use coohom_uploader::services::{
    get_sts_with_retry, interval_from_minutes, poll_until_complete, safe_submit, FilePackager,
    PollConfig, SafeSubmitOptions, UploadWorkflow, WorkflowOptions,
};
use coohom_uploader::AppState;

/// Command-line arguments for coohom-uploader
#[derive(Parser, Debug)]
#[command(name = "coohom-uploader")]
#[command(about = "Upload 3D models to the Coohom commodity library")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ", built ", env!("BUILD_TIMESTAMP"), ")"))]
struct Cli {
    /// TOML config file (default: $COOHOM_CONFIG or the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Credentials file with appKey=... and appSecret=... lines
    #[arg(long, global = true)]
    credentials: Option<PathBuf>,

    /// Coohom API base URL
    #[arg(long, global = true, env = "COOHOM_API_BASE_URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

/// Polling behaviour before submitting
#[derive(Args, Debug, Clone)]
struct PollArgs {
    /// Fail instead of polling when the archive is not parsed yet
    #[arg(long)]
    no_auto_poll: bool,

    #[arg(long)]
    max_poll_attempts: Option<u32>,

    #[arg(long)]
    poll_interval_minutes: Option<u64>,
}

impl PollArgs {
    fn options(&self, defaults: PollConfig, cancel: &CancellationToken) -> SafeSubmitOptions {
        SafeSubmitOptions {
            auto_poll: !self.no_auto_poll,
            poll: poll_config(defaults, self.max_poll_attempts, self.poll_interval_minutes),
            cancel: Some(cancel.child_token()),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Request STS upload credentials for a file name
    Sts {
        file_name: String,
        /// Retries when the remote times out (code 100004)
        #[arg(long, default_value_t = 0)]
        retries: u32,
    },
    /// Package, upload, parse and submit a local file
    Upload {
        file: PathBuf,
        #[arg(long)]
        model_name: Option<String>,
        /// Stop after requesting the parse
        #[arg(long)]
        no_submit: bool,
        #[command(flatten)]
        poll: PollArgs,
        #[arg(long, default_value_t = 0)]
        sts_retries: u32,
        /// Keep the generated zip archive
        #[arg(long)]
        keep_archive: bool,
    },
    /// Ask the remote to parse an uploaded archive
    Parse { task_id: String },
    /// Show the status of an upload task
    Status { task_id: String },
    /// Poll an upload task until it reaches a terminal status
    Poll {
        task_id: String,
        #[arg(long)]
        max_attempts: Option<u32>,
        #[arg(long)]
        interval_minutes: Option<u64>,
    },
    /// Submit a parsed model, polling first if needed
    Submit {
        task_id: String,
        #[arg(long)]
        model_name: Option<String>,
        #[command(flatten)]
        poll: PollArgs,
    },
    /// Serve the upload workflow over HTTP
    Serve {
        /// Listen address (default from config, 127.0.0.1:5790)
        #[arg(long)]
        bind: Option<String>,
    },
}

fn poll_config(defaults: PollConfig, attempts: Option<u32>, minutes: Option<u64>) -> PollConfig {
    PollConfig {
        max_attempts: attempts.unwrap_or(defaults.max_attempts),
        interval: minutes
            .map(interval_from_minutes)
            .unwrap_or(defaults.interval),
    }
}

fn submit_params(model_name: Option<String>) -> SubmitParams {
    model_name.map(SubmitParams::named).unwrap_or_default()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config is read before tracing starts so its log level can apply
    let toml = load_toml_config(cli.config.as_deref()).context("Failed to load configuration")?;

    let level = toml.logging.level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "coohom_uploader={level},coohom_common={level},tower_http={level}"
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("coohom-uploader {} ({})", env!("CARGO_PKG_VERSION"), env!("GIT_HASH"));

    let overrides = SettingsOverrides {
        config_path: cli.config.clone(),
        credentials_file: cli.credentials.clone(),
        base_url: cli.base_url.clone(),
    };
    let settings = Settings::resolve(toml, &overrides).context("Failed to resolve credentials")?;
    let client = settings
        .build_client()
        .context("Failed to build Coohom client")?;

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_token.cancel();
    });

    run(cli.command, settings, client, cancel).await
}

async fn run(
    command: Command,
    settings: Settings,
    client: CoohomClient,
    cancel: CancellationToken,
) -> Result<()> {
    let poll_defaults = settings.poll_config();

    match command {
        Command::Sts { file_name, retries } => {
            let grant = get_sts_with_retry(&client, &file_name, retries).await?;
            print_json(&grant.summary())
        }
        Command::Upload {
            file,
            model_name,
            no_submit,
            poll,
            sts_retries,
            keep_archive,
        } => {
            let api: Arc<dyn CoohomApi> = Arc::new(client);
            let workflow = UploadWorkflow::new(
                api,
                FilePackager::new(settings.work_dir()),
                UploadHistory::new(),
            );
            let options = WorkflowOptions {
                params: submit_params(model_name),
                submit: !no_submit,
                submit_options: poll.options(poll_defaults, &cancel),
                sts_retries,
                cleanup: !keep_archive,
            };

            let report = workflow.run(&file, &options).await;
            print_json(&report)?;
            if !report.success {
                anyhow::bail!(report.error.unwrap_or_else(|| "Upload failed".to_string()));
            }
            Ok(())
        }
        Command::Parse { task_id } => {
            client.request_parse(&task_id).await?;
            print_json(&serde_json::json!({ "task_id": task_id, "parse_requested": true }))
        }
        Command::Status { task_id } => {
            let record = client.check_status(&task_id).await?;
            print_json(&record)
        }
        Command::Poll {
            task_id,
            max_attempts,
            interval_minutes,
        } => {
            let config = poll_config(poll_defaults, max_attempts, interval_minutes);
            let outcome = poll_until_complete(&client, &task_id, &config, Some(&cancel)).await;
            print_json(&outcome)
        }
        Command::Submit {
            task_id,
            model_name,
            poll,
        } => {
            let options = poll.options(poll_defaults, &cancel);
            let result = safe_submit(&client, &task_id, &submit_params(model_name), &options).await;
            print_json(&result)?;
            if !result.success {
                anyhow::bail!(result.error.unwrap_or_else(|| "Submission failed".to_string()));
            }
            Ok(())
        }
        Command::Serve { bind } => serve(settings, client, cancel, bind).await,
    }
}

async fn serve(
    settings: Settings,
    client: CoohomClient,
    cancel: CancellationToken,
    bind: Option<String>,
) -> Result<()> {
    let bind = bind.unwrap_or_else(|| settings.toml.bind_address.clone());

    let mut state = AppState::new(Arc::new(client), settings.work_dir(), settings.poll_config());
    state.shutdown = cancel.clone();
    let app = coohom_uploader::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind to {}", bind))?;
    info!("Listening on http://{}", bind);
    info!("Health check: http://{}/health", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
