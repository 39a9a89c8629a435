//! Label automation binary.
//!
//! Serves the Omnivore webhook endpoint, or runs the pipeline once for an
//! article from the command line.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use completion::{CompletionGateway, OpenAIProvider};
use labeler::{config::Config, server, Labeler};
use omnivore::OmnivoreClient;

/// Turns `do:*` labels on Omnivore articles into generated tags and notes
#[derive(Parser)]
#[command(name = "labeler")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "text", global = true)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the webhook endpoint
    Serve {
        /// Port to listen on (overrides `LABELER_PORT`)
        #[arg(long)]
        port: Option<u16>,

        /// Trigger label prefix (overrides `OMNIVORE_LABEL`)
        #[arg(long)]
        trigger: Option<String>,
    },

    /// Run the label pipeline once for an article
    Run {
        /// Article ID
        #[arg(long)]
        page_id: String,

        /// Trigger label to act on (repeatable)
        #[arg(long = "label", required = true)]
        labels: Vec<String>,
    },
}

fn init_tracing(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("labeler=info".parse()?)
        .add_directive("omnivore=info".parse()?)
        .add_directive("completion=info".parse()?);

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(fmt::layer()).init(),
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
    }
    Ok(())
}

fn build_labeler(config: &Config) -> Result<Labeler> {
    if config.omnivore_api_key.is_none() {
        error!("OMNIVORE_API_KEY is not set. Omnivore requests will be rejected.");
    }
    let omnivore = OmnivoreClient::with_url(
        config.omnivore_api_key.as_deref().unwrap_or_default(),
        &config.omnivore_api_url,
    )
    .context("Failed to create Omnivore client")?;

    let completion = OpenAIProvider::from_env(config.completion.clone());
    if completion.is_configured() {
        info!(model = %config.completion.model, "Completion provider configured");
    } else {
        warn!("OPENAI_API_KEY is not set. Completion requests will fail.");
    }

    Ok(Labeler::new(
        Arc::new(omnivore),
        Arc::new(completion),
        config,
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    // Load configuration
    let mut config = Config::from_env().context("Failed to load configuration")?;

    match cli.command {
        Commands::Serve { port, trigger } => {
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(trigger) = trigger {
                config.trigger = trigger;
            }

            info!(trigger = %config.trigger, "Starting label automation service...");
            let labeler = build_labeler(&config)?;

            // Build application state
            let state = server::AppState {
                config: config.clone(),
                labeler: Arc::new(labeler),
            };
            let app = server::build_router(state);

            let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
            info!(addr = %addr, "Label automation service listening");

            let listener = TcpListener::bind(addr)
                .await
                .context("Failed to bind to address")?;
            axum::serve(listener, app).await.context("Server error")?;
        }
        Commands::Run { page_id, labels } => {
            let labeler = build_labeler(&config)?;
            match labeler.handle_trigger(&page_id, &labels).await {
                Ok(outcome) => println!("{outcome}"),
                Err(e) => {
                    error!(error = %e, "Label pipeline failed");
                    return Err(e.into());
                }
            }
        }
    }

    Ok(())
}
