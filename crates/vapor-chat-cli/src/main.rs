//! Vapor Chat CLI
//!
//! Terminal client for a vapor-chat server. Lines typed on stdin are sent as
//! chat messages; messages from other participants are printed as they
//! arrive.

use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use vapor_chat_core::config::defaults::{DEFAULT_HANDSHAKE_TIMEOUT_SECS, DEFAULT_SERVER_URL};
use vapor_chat_core::events::StdoutEventSink;
use vapor_chat_core::ChatConfig;

mod chat;

/// Vapor Chat - talk to a vapor-chat server from the terminal
#[derive(Parser, Debug)]
#[command(name = "vapor-chat")]
#[command(version, about, long_about = None)]
struct Args {
    /// Chat endpoint (ws:// or wss://)
    #[arg(short, long, env = "VAPOR_CHAT_URL", default_value = DEFAULT_SERVER_URL)]
    url: String,

    /// Username to announce; prompted for when omitted
    #[arg(short = 'n', long)]
    username: Option<String>,

    /// Seconds to wait for the WebSocket handshake
    #[arg(long, default_value_t = DEFAULT_HANDSHAKE_TIMEOUT_SECS)]
    handshake_timeout: u64,

    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Clone, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();

    let config = ChatConfig::new()
        .with_server_url(args.url)
        .with_handshake_timeout(Duration::from_secs(args.handshake_timeout));

    let json_output = matches!(args.format, OutputFormat::Json);
    let event_sink = StdoutEventSink::new(json_output);

    tracing::info!("Starting vapor-chat against {}", config.server_url);

    match chat::run_chat(config, args.username, event_sink, json_output).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
