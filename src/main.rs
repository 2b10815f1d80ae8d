// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::env;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use dagwood_client::config::consts::DEFAULT_HANDSHAKE_TIMEOUT_SECS;
use dagwood_client::config::{load_and_validate_config, ClientRuntime, RuntimeBuilder};
use dagwood_client::engine::QueueRequest;
use dagwood_client::events::{names, ClientEvent};
use dagwood_client::graph::{BehaviorRegistry, Graph};
use tokio_util::sync::CancellationToken;

fn load_workflow(path: &Path) -> Result<Graph> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read workflow {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("workflow {} is not valid JSON", path.display()))?;
    let mut graph = Graph::from_json(value)
        .with_context(|| format!("workflow {} is not a graph document", path.display()))?;
    BehaviorRegistry::with_builtins().attach(&mut graph);
    Ok(graph)
}

/// Print lifecycle events as they arrive
fn report_progress(runtime: &ClientRuntime) {
    runtime.bus.on(names::EXECUTING, |event| {
        if let Some(node) = event.executing_node() {
            println!("▶ executing node {}", node);
        }
    });
    runtime.bus.on(names::PROGRESS, |event| {
        if let ClientEvent::Progress(data) = event {
            println!("  {} / {}", data["value"], data["max"]);
        }
    });
    runtime.bus.on(names::EXECUTION_SUCCESS, |event| {
        if let ClientEvent::ExecutionSuccess(data) = event {
            println!("✅ job {} finished", data["prompt_id"]);
        }
    });
    runtime.bus.on(names::EXECUTION_ERROR, |event| {
        if let ClientEvent::ExecutionError(data) = event {
            println!("❌ job {} failed: {}", data["prompt_id"], data["exception_message"]);
        }
    });
    runtime.bus.on(names::PROMPT_ERROR, |event| {
        if let ClientEvent::PromptError { message, .. } = event {
            eprintln!("❌ submission rejected:\n{}", message);
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <config.yaml> <workflow.json> [priority] [repeat]", args[0]);
        eprintln!("Example: {} client.yaml workflow.json -1 4", args[0]);
        std::process::exit(1);
    }
    let priority: i64 = match args.get(3) {
        Some(p) => p.parse().with_context(|| format!("priority '{}' is not an integer", p))?,
        None => 0,
    };
    let repeat: u32 = match args.get(4) {
        Some(r) => r.parse().with_context(|| format!("repeat '{}' is not a positive integer", r))?,
        None => 1,
    };

    let config = load_and_validate_config(&args[1])?;
    let graph = load_workflow(Path::new(&args[2]))?;
    println!("🚀 Submitting {} ({} nodes) to {}", args[2], graph.len(), config.api_root);

    let runtime = RuntimeBuilder::from_config(&config, graph)?;
    report_progress(&runtime);

    let shutdown = CancellationToken::new();
    let transport = {
        let transport = runtime.transport.clone();
        let token = shutdown.clone();
        tokio::spawn(async move { transport.run(token).await })
    };

    let handshake = Duration::from_secs(DEFAULT_HANDSHAKE_TIMEOUT_SECS);
    match runtime.transport.wait_for_session(handshake).await {
        Some(sid) => tracing::debug!(client_id = %sid, "Session confirmed; submitting"),
        None => tracing::warn!(
            timeout_secs = handshake.as_secs(),
            client_id = %runtime.identity.client_id(),
            "No session handshake from the engine; lifecycle events may not reach this client"
        ),
    }

    runtime.driver.submit(QueueRequest::new(priority, repeat)).await;
    runtime.driver.wait_idle().await;

    let ledger = runtime.driver.ledger();
    if ledger.jobs().is_empty() {
        shutdown.cancel();
        let _ = transport.await;
        match runtime.driver.last_failure() {
            Some(failure) => bail!("no job was accepted: {}", failure.message),
            None => bail!("no job was accepted"),
        }
    }
    println!("📬 {} job(s) queued, waiting for the engine", ledger.jobs().len());

    tokio::select! {
        _ = ledger.wait_finished() => {}
        _ = tokio::signal::ctrl_c() => println!("Interrupted, leaving queued jobs to the engine"),
    }

    shutdown.cancel();
    let _ = transport.await;
    Ok(())
}
