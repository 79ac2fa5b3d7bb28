//! audiodriver - continuous audio capture into bounded-duration segments.
//!
//! This is the library crate behind the `audiodriver` daemon. It wires the
//! session controller to its collaborators and exposes it over a local
//! control socket.

pub mod capture;
pub mod commands;
pub mod config;
pub mod ipc;
pub mod recorder;
pub mod storage;
pub mod utils;

use capture::{CapabilityProbe, FfmpegCapabilityProbe, FfmpegRecorderFactory, FixedTier, SystemAuthorizer};
use commands::CommandGateway;
use config::DaemonConfig;
use recorder::{SessionController, SessionDeps, SessionEvent, SystemClock};
use std::sync::Arc;
use storage::DirectoryStorage;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging; `RUST_LOG` overrides the default filter
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "audiodriver=debug,audiodriver_lib=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the production collaborators described by `config`
pub fn build_deps(config: &DaemonConfig) -> SessionDeps {
    let probe: Arc<dyn CapabilityProbe> = match config.capability_tier() {
        Some(tier) => {
            tracing::info!("Using configured capability tier {:?}", tier);
            Arc::new(FixedTier(tier))
        }
        None => Arc::new(FfmpegCapabilityProbe::new(config.ffmpeg_path.clone())),
    };

    SessionDeps {
        factory: Arc::new(FfmpegRecorderFactory::new(config.ffmpeg_settings())),
        authorizer: Arc::new(SystemAuthorizer::new(config.allow_capture)),
        storage: Arc::new(DirectoryStorage::new(config.output_dir())),
        probe,
        clock: Arc::new(SystemClock),
    }
}

/// Log every session event until the controller goes away
fn spawn_event_logger(mut events: broadcast::Receiver<SessionEvent>) {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SessionEvent::Started { session_id }) => {
                    tracing::info!(%session_id, "Recording started");
                }
                Ok(SessionEvent::SegmentCompleted { session_id, record }) => {
                    tracing::info!(
                        %session_id,
                        "Segment {} saved to {:?} ({:?} after {:?})",
                        record.index,
                        record.path,
                        record.reason,
                        record.elapsed
                    );
                }
                Ok(SessionEvent::Stopped {
                    session_id,
                    segment_count,
                }) => {
                    tracing::info!(%session_id, "Recording stopped, {} segment(s)", segment_count);
                }
                Ok(SessionEvent::Failed { session_id, error }) => {
                    tracing::error!(?session_id, code = error.code(), "Recording failed: {}", error);
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!("Event logger lagged, {} event(s) missed", missed);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

/// Resolves on SIGINT or SIGTERM (ctrl-c elsewhere)
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
                    _ = tokio::signal::ctrl_c() => tracing::info!("Received SIGINT"),
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for ctrl-c: {}", e);
        }
    }
}

/// Run the daemon until a shutdown signal arrives
///
/// On shutdown any active session is stopped and its last segment finalized
/// before returning.
pub async fn run_daemon(config: DaemonConfig, start_immediately: bool) -> anyhow::Result<()> {
    tracing::info!("Starting audiodriver v{}", env!("CARGO_PKG_VERSION"));

    let output_dir = config.output_dir();
    let socket_path = config.socket_path();
    tracing::info!("Segments go to {:?}", output_dir);

    let controller = Arc::new(SessionController::new(
        build_deps(&config),
        config.session_settings(),
    ));
    spawn_event_logger(controller.subscribe());

    let gateway = CommandGateway::new(Arc::clone(&controller), output_dir);

    // Claim the socket first so a second daemon exits before recording
    let socket = ipc::ControlSocket::bind(&socket_path)?;

    if start_immediately {
        if let Err(e) = gateway.start_recording() {
            tracing::error!("Initial start failed: {}", e);
        }
    }

    let served = socket.serve(gateway, shutdown_signal()).await;

    if let Some(summary) = controller.shutdown().await {
        tracing::info!(
            session_id = %summary.session_id,
            "Final session wrote {} segment(s)",
            summary.completed_segments().count()
        );
    }

    served?;
    tracing::info!("audiodriver stopped");
    Ok(())
}
