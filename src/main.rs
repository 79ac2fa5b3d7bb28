//! audiodriver command-line entry point
//!
//! `run` hosts the daemon; the other subcommands talk to a running daemon
//! over its control socket.

use anyhow::{bail, Context};
use audiodriver_lib::config::DaemonConfig;
use audiodriver_lib::ipc::{send_request, Request, Response};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Continuous audio capture into rotating segment files
#[derive(Parser, Debug)]
#[command(name = "audiodriver")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print raw JSON responses
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the capture daemon in the foreground
    Run {
        /// Start recording as soon as the daemon is up
        #[arg(long)]
        start: bool,
    },
    /// Start recording
    Start,
    /// Stop recording after finalizing the current segment
    Stop,
    /// Show whether a session is active
    Status,
    /// List segment files in the output directory
    Segments,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    audiodriver_lib::init_tracing();

    let config = DaemonConfig::load(cli.config.as_deref()).context("Failed to load config")?;

    let request = match cli.command {
        Commands::Run { start } => return audiodriver_lib::run_daemon(config, start).await,
        Commands::Start => Request::Start,
        Commands::Stop => Request::Stop,
        Commands::Status => Request::Status,
        Commands::Segments => Request::ListSegments,
    };

    let socket_path = config.socket_path();
    let response = send_request(&socket_path, &request)
        .await
        .with_context(|| format!("Is the daemon running? Could not reach {:?}", socket_path))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        if let Response::Error { code, .. } = &response {
            bail!("daemon returned {}", code);
        }
        return Ok(());
    }

    print_response(response)
}

fn print_response(response: Response) -> anyhow::Result<()> {
    match response {
        Response::Started { session_id } => println!("Recording started (session {})", session_id),
        Response::AlreadyActive => println!("Already recording"),
        Response::Stopping => println!("Stopping, finalizing current segment"),
        Response::NotRunning => println!("Not recording"),
        Response::Status { active, state } => {
            let label = serde_json::to_value(state)?;
            println!(
                "{} ({})",
                if active { "Recording" } else { "Idle" },
                label.as_str().unwrap_or("unknown")
            );
        }
        Response::Segments { files } => {
            if files.is_empty() {
                println!("No segments");
            }
            for file in files {
                println!("{}\t{} bytes", file.path.display(), file.size_bytes);
            }
        }
        Response::Error { code, message } => bail!("{}: {}", code, message),
    }
    Ok(())
}
