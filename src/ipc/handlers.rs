//! IPC request handlers

use crate::commands::CommandGateway;
use crate::ipc::messages::{Request, Response};
use crate::recorder::controller::{StartOutcome, StopOutcome};
use crate::utils::error::AppError;

/// Handle one request and build its response
pub fn handle_request(gateway: &CommandGateway, request: Request) -> Response {
    tracing::debug!("Handling request: {:?}", request);

    match request {
        Request::Start => match gateway.start_recording() {
            Ok(StartOutcome::Started { session_id }) => Response::Started { session_id },
            Ok(StartOutcome::AlreadyActive) => Response::AlreadyActive,
            Err(e) => Response::error(&e),
        },
        Request::Stop => match gateway.stop_recording() {
            StopOutcome::Stopping => Response::Stopping,
            StopOutcome::NotRunning => Response::NotRunning,
        },
        Request::Status => Response::Status {
            active: gateway.is_recording(),
            state: gateway.recording_state(),
        },
        Request::ListSegments => match gateway.list_segments() {
            Ok(files) => {
                tracing::debug!("Listed {} segment(s)", files.len());
                Response::Segments { files }
            }
            Err(e) => {
                tracing::error!("Failed to list segments: {}", e);
                Response::error(AppError::from(e))
            }
        },
    }
}
