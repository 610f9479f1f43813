//! autollm HTTP server
//!
//! Starts an Axum web server that classifies chat prompts and forwards them to
//! the matching OpenRouter model.

use autollm::cli::{Cli, Command, generate_config_template};
use autollm::{config::Config, handlers, router::ModelTable, telemetry};
use clap::Parser;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Config { output }) => write_template(output.as_deref()),
        Some(Command::Classify { prompt }) => classify(&cli.config, &prompt),
        None => serve(&cli.config).await,
    }
}

fn write_template(output: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let template = generate_config_template();
    match output {
        Some(path) => {
            std::fs::write(path, template)?;
            eprintln!("Configuration template written to {}", path);
        }
        None => print!("{}", template),
    }
    Ok(())
}

fn classify(config_path: &str, prompt: &str) -> Result<(), Box<dyn std::error::Error>> {
    // The built-in table applies when no config file exists
    let config = if Path::new(config_path).exists() {
        Config::from_file(config_path)?
    } else {
        Config::default()
    };

    let decision = ModelTable::from_config(&config.models).route(prompt);
    println!("classification: {}", decision.classification);
    println!("model: {}", decision.model);
    Ok(())
}

async fn serve(config_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = Arc::new(Config::from_file(config_path)?);

    telemetry::init(&config.observability.log_level);

    tracing::info!(
        "Starting autollm server on {}:{}",
        config.server.host,
        config.server.port
    );

    let addr = SocketAddr::from((
        config
            .server
            .host
            .parse::<std::net::IpAddr>()
            .unwrap_or_else(|_| std::net::IpAddr::from([0, 0, 0, 0])),
        config.server.port,
    ));

    let state = handlers::AppState::new(config)?;
    let app = handlers::app(state);

    tracing::info!("Listening on {}", addr);
    tracing::info!("Health check available at http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
