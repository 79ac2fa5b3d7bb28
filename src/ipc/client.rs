//! IPC client used by the CLI subcommands

use crate::ipc::messages::{Request, Response};
use crate::ipc::protocol::{read_json, write_json, IpcError};
use std::path::Path;
use std::time::Duration;

/// How long to wait for the daemon before giving up
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Send one request and wait for its response
#[cfg(unix)]
pub async fn send_request(socket_path: &Path, request: &Request) -> Result<Response, IpcError> {
    use tokio::net::UnixStream;

    let exchange = async {
        let mut stream = UnixStream::connect(socket_path).await?;
        write_json(&mut stream, request).await?;
        let response: Response = read_json(&mut stream).await?;
        Ok::<_, IpcError>(response)
    };

    tokio::time::timeout(REQUEST_TIMEOUT, exchange)
        .await
        .map_err(|_| {
            IpcError::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("No response from {:?} within {:?}", socket_path, REQUEST_TIMEOUT),
            ))
        })?
}

#[cfg(not(unix))]
pub async fn send_request(socket_path: &Path, _request: &Request) -> Result<Response, IpcError> {
    Err(IpcError::Io(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        format!("Cannot connect to {:?}: Unix domain sockets unavailable", socket_path),
    )))
}
