/**
 * DSATrack Console - Main Entry Point
 *
 * Line-oriented front-end over the sync engine. Loads the catalog and the
 * confirmed statuses from the progress server, then reads commands from
 * stdin and prints engine events as they arrive.
 */
use dsatrack::dashboard::{
    next_event, Config, EngineEvent, FlushOutcome, HttpProgressClient, SyncEngine,
};
use dsatrack::shared::ProblemStatus;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "commands: set <id> <not_started|in_progress|completed>, get <id>, \
                    stats, pending, flush, retry, quit";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    tracing::info!("[STARTUP] Connecting to {}", config.server_url());

    let client = Arc::new(HttpProgressClient::new(&config)?);
    let engine = SyncEngine::load(&*client, &*client, client.clone(), config.sync().clone()).await?;

    let mut events = engine.subscribe();
    tokio::spawn(async move {
        while let Some(event) = next_event(&mut events).await {
            print_event(&event);
        }
    });

    println!("{} problems loaded. {}", engine.catalog().len(), HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            [] => continue,
            ["set", id, status] => match status.parse::<ProblemStatus>() {
                Ok(status) => {
                    if let Err(e) = engine.set_status(id, status).await {
                        println!("error: {}", e);
                    }
                }
                Err(e) => println!("error: {}", e),
            },
            ["get", id] => println!("{}: {}", id, engine.get_status(id).await),
            ["stats"] => {
                let stats = engine.aggregate_stats().await;
                println!(
                    "{} total, {} completed, {} in progress, {} not started ({:.1}%)",
                    stats.total,
                    stats.completed,
                    stats.in_progress,
                    stats.not_started,
                    stats.completion_percent()
                );
                for (category, counts) in &stats.by_category {
                    println!("  {:<20} {}/{}", category, counts.completed, counts.total());
                }
            }
            ["pending"] => {
                let state = engine.sync_state().await;
                println!(
                    "{} pending ({} queued, {} in flight), {} failed",
                    state.pending(),
                    state.queued,
                    state.in_flight,
                    engine.failed_mutations().await.len()
                );
            }
            ["flush"] => match engine.flush_now().await {
                FlushOutcome::Flushed(report) => println!(
                    "flushed: {} confirmed, {} rolled back",
                    report.confirmed().len(),
                    report.rolled_back().len()
                ),
                FlushOutcome::Deferred => println!("a flush is already in flight"),
                FlushOutcome::Empty => println!("nothing to flush"),
                FlushOutcome::Closed => println!("engine is shut down"),
            },
            ["retry"] => match engine.retry_failed().await {
                Ok(count) => println!("re-queued {} mutation(s)", count),
                Err(e) => println!("error: {}", e),
            },
            ["quit"] | ["exit"] => break,
            _ => println!("{}", HELP),
        }
    }

    let pending = engine.pending_count().await;
    if pending > 0 {
        tracing::warn!("[STARTUP] Flushing {} pending edit(s) before exit", pending);
        engine.flush_now().await;
    }
    engine.shutdown().await;
    Ok(())
}

fn print_event(event: &EngineEvent) {
    match event {
        EngineEvent::FlushFailed { error, report } => {
            println!(
                "! could not save {} edit(s): {}",
                report.rolled_back().len(),
                error
            );
        }
        EngineEvent::FlushConfirmed(report) => {
            println!("saved {} edit(s)", report.confirmed().len());
        }
        EngineEvent::StatusChanged { .. }
        | EngineEvent::StatsChanged(_)
        | EngineEvent::FlushStarted { .. } => {
            tracing::debug!("[EVENT] {:?}", event);
        }
    }
}
