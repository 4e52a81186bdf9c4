//! Replays a stream of `{route, payload}` JSON lines through the agent.
//!
//! Every line is delivered concurrently; results are printed in input order.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

use crate::handlers::{ReplayLine, ReplayResult};
use crate::ledger::LedgerAgent;

pub async fn run(agent: Arc<LedgerAgent>) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tasks: Vec<JoinHandle<ReplayResult>> = Vec::new();
    let mut line_no = 0;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        let entry = serde_json::from_str::<ReplayLine>(&line)
            .map_err(|e| e.to_string())
            .and_then(|entry| entry.validate().map(|()| entry));
        let agent = Arc::clone(&agent);
        tasks.push(tokio::spawn(async move {
            match entry {
                Ok(entry) => {
                    let delivery = agent.deliver(&entry.route, entry.payload).await;
                    ReplayResult::delivered(line_no, entry.route, delivery)
                }
                Err(e) => ReplayResult::invalid(line_no, e),
            }
        }));
    }

    tracing::info!(lines = tasks.len(), "Replay stream read, awaiting deliveries");

    let mut stale = 0usize;
    let mut failed = 0usize;
    for task in tasks {
        let result = match task.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "Replay task aborted");
                failed += 1;
                continue;
            }
        };
        match result.outcome {
            "stale" => stale += 1,
            "error" | "invalid" => failed += 1,
            _ => {}
        }
        match serde_json::to_string(&result) {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::error!(line = result.line, error = %e, "Could not encode result"),
        }
    }

    tracing::info!(stale, failed, tracked = agent.tracked_sequences(), "Replay finished");
    Ok(())
}
