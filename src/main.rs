mod application;
mod config;
mod domain;
mod infrastructure;

pub use application::{agent, repl, tooling};
pub use domain::types;
pub use infrastructure::model;

use agent::Agent;
use config::AppConfig;
use model::GeminiClient;
use std::error::Error;
use tooling::ToolRegistry;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() {
    let dotenv_loaded = dotenvy::dotenv().is_ok();
    init_tracing();
    if dotenv_loaded {
        debug!("Loaded environment from .env file");
    }

    if let Err(err) = run().await {
        eprintln!("✗ {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load(None)?;
    let api_key = config::api_key_from_env()?;
    info!(model = config.model.as_str(), "Starting cobble");

    let registry = ToolRegistry::builtin();
    let mut system_prompt = registry.protocol_instruction();
    if let Some(instruction) = &config.instruction {
        system_prompt.push_str("\n\n");
        system_prompt.push_str(instruction);
    }

    let provider = GeminiClient::new(config.base_url.clone(), config.model.clone(), api_key);
    let mut agent = Agent::new(provider, registry, system_prompt);
    repl::run(&mut agent).await?;

    info!("Session finished");
    Ok(())
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_level(true)
            .init();
    });
}
