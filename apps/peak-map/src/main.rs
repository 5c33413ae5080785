mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::cli::{Cli, Commands, PeakArgs};
use peak_map::client::PeakClient;
use peak_map::config::Config;
use peak_map::map::{HeadlessMap, MapShell, ShellInput};
use peak_map::mock_api::{self, MockApiState};
use peak_map::peak::{Altitude, BoundingBox, Peak, PeakInput};
use peak_map::repository::PeakRepository;
use peak_map::store::MarkerStore;

fn init_tracing() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,peak_map=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to encode output")?;
    println!("{text}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing()?;

    if let Err(err) = run(cli).await {
        tracing::error!(error = %format!("{err:#}"), "peak-map failed");
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::List(args) => {
            let (_, client) = connect()?;
            let bounds = BoundingBox {
                north: args.north,
                south: args.south,
                east: args.east,
                west: args.west,
            };
            let peaks = client.list_in_bounds(bounds).await?;
            print_json(&peaks)
        }
        Commands::Create(args) => {
            let (_, client) = connect()?;
            let created = client.create(peak_input(args)).await?;
            print_json(&created)
        }
        Commands::Update(args) => {
            let (_, client) = connect()?;
            let input = peak_input(args.peak);
            let peak = Peak {
                id: args.id,
                name: input.name,
                altitude: input.altitude,
                lat: input.lat,
                lon: input.lon,
            };
            let updated = client.update(peak).await?;
            print_json(&updated)
        }
        Commands::Delete(args) => {
            let (_, client) = connect()?;
            client.delete(args.id).await?;
            print_json(&json!({ "deleted": args.id }))
        }
        Commands::Watch => {
            let (config, client) = connect()?;
            watch(&config, client).await
        }
        Commands::MockApi(args) => serve_mock_api(&args.bind).await,
    }
}

fn connect() -> Result<(Config, PeakClient)> {
    let config = Config::from_env()?;
    let client = PeakClient::from_config(&config)?;
    tracing::debug!(base_url = %client.base_url(), "peak API client ready");
    Ok((config, client))
}

async fn serve_mock_api(bind: &str) -> Result<()> {
    let listener = mock_api::bind(bind).await?;
    tokio::select! {
        result = mock_api::serve(listener, MockApiState::default()) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
            Ok(())
        }
    }
}

fn peak_input(args: PeakArgs) -> PeakInput {
    PeakInput {
        name: args.name,
        altitude: Altitude::new(args.altitude),
        lat: args.lat,
        lon: args.lon,
    }
}

async fn watch(config: &Config, client: PeakClient) -> Result<()> {
    let map = HeadlessMap::new(config.map_center(), config.map_zoom);
    let mut shell = MapShell::new(
        map,
        Arc::new(client),
        MarkerStore::shared(),
        &config.tile_layer(),
    );
    shell.start().await;

    let (input_tx, input_rx) = mpsc::channel::<ShellInput>(64);
    let reader = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = tokio::select! {
                line = lines.next_line() => line,
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("shutdown signal received");
                    break;
                }
            };
            let line = match line {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(err) => {
                    tracing::error!(error = %err, "failed to read stdin");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ShellInput>(&line) {
                Ok(input) => {
                    if input_tx.send(input).await.is_err() {
                        break;
                    }
                }
                Err(err) => tracing::warn!(error = %err, %line, "ignoring malformed input"),
            }
        }
    });

    let shell = shell.run(input_rx).await;
    reader.await.context("stdin reader task failed")?;

    let map = shell.widget();
    print_json(&json!({
        "markers": map.markers(),
        "errors": map.errors(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_api_command_binds_without_client_config() {
        let held = mock_api::bind("127.0.0.1:0").await.unwrap();
        let addr = held.local_addr().unwrap().to_string();
        let cli = Cli::try_parse_from(["peak-map", "mock-api", "--bind", &addr]).unwrap();

        let err = run(cli).await.unwrap_err();

        assert!(err.to_string().contains("already in use"));
    }
}
