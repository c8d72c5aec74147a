use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_stream::StreamExt;

use battle_core::participant::Participant;
use battle_core::provider::CompletionOptions;
use battle_engine::runner::{DebateRunner, RunnerConfig};
use battle_engine::sessions::SessionRegistry;
use battle_llm::factory::{Endpoints, ProviderFactory};
use battle_server::orchestrator::{DebateLimits, DebateOrchestrator, EngineOrchestrator, StartDebate};
use battle_server::server::ServerConfig;
use battle_settings::BattleSettings;
use battle_telemetry::TelemetryConfig;

#[derive(Parser)]
#[command(name = "battle", version, about = "Run multi-round debates between LLMs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP/SSE API until Ctrl-C
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the models usable with the configured API keys
    Models,
    /// Run one debate and print its events as JSON lines
    Debate {
        question: String,
        /// Number of rounds (default from settings)
        #[arg(long)]
        rounds: Option<i64>,
        /// Participant as provider:model, repeatable
        #[arg(long = "model", value_name = "PROVIDER:MODEL")]
        models: Vec<Participant>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = battle_settings::load_settings().context("failed to load settings")?;
    battle_telemetry::init_telemetry(&TelemetryConfig::from_level_name(
        &settings.logging.level,
        settings.logging.json,
    ))
    .context("failed to install tracing subscriber")?;

    let orchestrator = build_orchestrator(&settings)?;

    match cli.command {
        Command::Serve { host, port } => {
            let config = ServerConfig {
                host: host.unwrap_or_else(|| settings.server.host.clone()),
                port: port.unwrap_or(settings.server.port),
                cors_origins: settings.server.cors_origins.clone(),
            };
            let handle = battle_server::start(config, Arc::new(orchestrator))
                .await
                .context("failed to start server")?;
            tracing::info!(addr = %handle.addr, "agent battle ready");

            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for ctrl+c")?;
            tracing::info!("shutting down");
            handle.shutdown();
        }
        Command::Models => {
            println!("{}", serde_json::to_string_pretty(&orchestrator.models())?);
        }
        Command::Debate {
            question,
            rounds,
            models,
        } => {
            let started = orchestrator
                .start(StartDebate {
                    question,
                    session_id: None,
                    max_rounds: rounds,
                    models: (!models.is_empty()).then_some(models),
                })
                .await?;
            tracing::info!(session_id = %started.session_id, max_rounds = started.max_rounds, "debate started");

            let mut events = orchestrator.stream(&started.session_id)?;
            while let Some(event) = events.next().await {
                println!("{}", serde_json::to_string(&event)?);
            }
        }
    }

    Ok(())
}

fn build_orchestrator(settings: &BattleSettings) -> anyhow::Result<EngineOrchestrator> {
    let keys = battle_settings::load_api_keys();
    let endpoints = Endpoints {
        openai: settings.providers.openai_base_url.clone(),
        gemini: settings.providers.gemini_base_url.clone(),
        anthropic: settings.providers.anthropic_base_url.clone(),
    };
    let factory = ProviderFactory::from_keys(keys.clone(), endpoints).context("failed to build HTTP client")?;

    let debate = &settings.debate;
    let runner = DebateRunner::new(
        Arc::new(factory),
        RunnerConfig {
            round_delay: Duration::from_millis(debate.round_delay_ms),
            options: CompletionOptions {
                temperature: debate.temperature,
                max_tokens: debate.max_tokens,
            },
            event_buffer: debate.event_buffer,
        },
    );
    let limits = DebateLimits {
        default_max_rounds: debate.default_max_rounds,
        max_rounds_limit: debate.max_rounds_limit,
    };

    Ok(EngineOrchestrator::new(
        Arc::new(SessionRegistry::new()),
        runner,
        keys,
        limits,
    ))
}
