// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Story-Session command-line driver
//!
//! Reads one JSON intent per line from stdin, dispatches it and prints the
//! resulting render snapshot (or error) as one JSON line on stdout.
//!
//! ```text
//! {"intent":"login","username":"bob","password":"secret"}
//! {"intent":"toggle_favorite","story_id":"..."}
//! {"intent":"navigate","view":"favorites"}
//! ```

use anyhow::Context;
use std::sync::Arc;
use story_session::{
    config::{Config, LogFormat},
    db::FileStore,
    services::HttpStoryApi,
    AppError, Intent, RenderSnapshot, ViewCoordinator,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment
    let config = Config::from_env().context("Failed to load configuration")?;
    init_logging(config.log_format)?;
    tracing::info!(api = %config.api_base_url, "Starting story session");

    let api = HttpStoryApi::new(config.api_base_url.clone(), config.http_timeout)
        .context("Failed to build story API client")?;
    let store = FileStore::new(&config.store_path);
    tracing::info!(path = %store.path().display(), "Using durable session store");

    let coordinator = ViewCoordinator::new(&config, Arc::new(api), Arc::new(store));
    print_outcome(coordinator.start().await);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let intent: Intent = match serde_json::from_str(line) {
            Ok(intent) => intent,
            Err(e) => {
                print_outcome(Err(AppError::Validation(format!("Unreadable intent: {}", e))));
                continue;
            }
        };
        print_outcome(coordinator.dispatch(intent).await);
    }

    tracing::info!("Input closed, exiting");
    Ok(())
}

fn print_outcome(outcome: Result<RenderSnapshot, AppError>) {
    let json = match outcome {
        Ok(snapshot) => serde_json::json!({ "ok": snapshot }),
        Err(e) => serde_json::json!({
            "error": { "kind": e.kind(), "message": e.to_string() }
        }),
    };
    println!("{}", json);
}

/// Initialize structured logging on stderr.
fn init_logging(format: LogFormat) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("story_session=debug".parse()?)
        .add_directive("info".parse()?);

    let layer = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_current_span(true)
            .flatten_event(true)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry().with(filter).with(layer).init();
    Ok(())
}
