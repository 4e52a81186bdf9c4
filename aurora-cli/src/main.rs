mod handlers;
mod ledger;
mod replay;
mod server;

use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use aurora_core::client::{RELEASE_NAME, RELEASE_VERSION};

use crate::ledger::{Ledger, LedgerAgent};

#[derive(Parser)]
#[command(
    name = "aurora",
    about = "Aurora — keyed, replay-safe message handlers for agents",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct AgentArgs {
    /// Index receivers by their parsed route instead of the raw string
    #[arg(long, env = "AURORA_ROUTE_PARSING")]
    route_parsing: bool,

    /// Simulated I/O latency inside each ledger handler, in milliseconds
    #[arg(long, default_value = "0", env = "AURORA_LATENCY_MS")]
    latency_ms: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Host the demo ledger agent over HTTP
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3100", env = "AURORA_PORT")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Maximum number of requests processed at once
        #[arg(long, default_value = "1024")]
        max_inflight: usize,

        #[command(flatten)]
        agent: AgentArgs,
    },

    /// Deliver `{route, payload}` JSON lines from stdin concurrently
    Replay {
        #[command(flatten)]
        agent: AgentArgs,
    },

    /// Print version information
    Version,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            host,
            max_inflight,
            agent,
        } => {
            let (agent, ledger) = build_agent(&agent);
            if let Err(e) = server::run(&host, port, max_inflight.max(1), agent, ledger).await {
                tracing::error!(error = %e, "Server stopped");
                std::process::exit(1);
            }
        }
        Commands::Replay { agent } => {
            let (agent, _ledger) = build_agent(&agent);
            if let Err(e) = replay::run(agent).await {
                tracing::error!(error = %e, "Failed to read replay stream");
                std::process::exit(1);
            }
        }
        Commands::Version => {
            println!("aurora {}", env!("CARGO_PKG_VERSION"));
            println!("{}-core {}", RELEASE_NAME, RELEASE_VERSION);
        }
    }
}

fn build_agent(args: &AgentArgs) -> (Arc<LedgerAgent>, Ledger) {
    let agent = LedgerAgent::new(None);
    agent.set_route_parsing(args.route_parsing);

    let ledger = Ledger::new(Duration::from_millis(args.latency_ms));
    if let Err(e) = ledger.register(&agent) {
        tracing::error!(error = %e, "Invalid receiver registration");
        std::process::exit(1);
    }

    agent.start();
    (Arc::new(agent), ledger)
}
