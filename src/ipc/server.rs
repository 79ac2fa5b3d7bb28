//! IPC server on a Unix domain socket

use crate::commands::CommandGateway;
use crate::ipc::handlers::handle_request;
use crate::ipc::messages::{Request, Response};
use crate::ipc::protocol::{read_json, write_json, IpcError};
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncWrite};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Socket file permissions (owner read/write only)
#[cfg(unix)]
const SOCKET_MODE: u32 = 0o600;

/// Socket directory permissions (owner only)
#[cfg(unix)]
const DIRECTORY_MODE: u32 = 0o700;

/// Create the socket directory and clear a stale socket
///
/// A socket that still accepts connections belongs to a live daemon and is
/// left alone.
#[cfg(unix)]
fn prepare_socket_dir(socket_path: &Path) -> std::io::Result<()> {
    use std::io::ErrorKind;
    use std::os::unix::net::UnixStream;

    if let Some(dir) = socket_path.parent() {
        std::fs::create_dir_all(dir)?;
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(DIRECTORY_MODE))?;
    }

    match UnixStream::connect(socket_path) {
        Ok(_) => Err(std::io::Error::new(
            ErrorKind::AddrInUse,
            format!("daemon already running on {:?}", socket_path),
        )),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) if e.kind() == ErrorKind::ConnectionRefused => {
            tracing::debug!("Removing stale socket {:?}", socket_path);
            std::fs::remove_file(socket_path)
        }
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn secure_socket_file(socket_path: &Path) -> std::io::Result<()> {
    std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(SOCKET_MODE))?;

    let actual = std::fs::metadata(socket_path)?.permissions().mode() & 0o777;
    if actual != SOCKET_MODE {
        tracing::warn!("Socket mode is {:o}, expected {:o}", actual, SOCKET_MODE);
    }
    Ok(())
}

/// Serve requests from one client until it disconnects
async fn handle_client<S>(mut stream: S, gateway: CommandGateway, client_id: u64)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    tracing::debug!("Client {} connected", client_id);

    loop {
        let response = match read_json::<_, Request>(&mut stream).await {
            Ok(request) => handle_request(&gateway, request),
            Err(IpcError::ConnectionClosed) => {
                tracing::debug!("Client {} disconnected", client_id);
                break;
            }
            Err(IpcError::Parse(e)) => {
                tracing::warn!("Invalid request from client {}: {}", client_id, e);
                Response::Error {
                    code: "INVALID_REQUEST".to_string(),
                    message: e,
                }
            }
            Err(e) => {
                tracing::error!("Error reading request from client {}: {}", client_id, e);
                break;
            }
        };

        if let Err(e) = write_json(&mut stream, &response).await {
            tracing::error!("Error writing response to client {}: {}", client_id, e);
            break;
        }
    }
}

/// Bound control socket, not yet accepting clients
#[cfg(unix)]
pub struct ControlSocket {
    listener: tokio::net::UnixListener,
    path: PathBuf,
}

#[cfg(unix)]
impl ControlSocket {
    /// Bind `socket_path`, refusing to take over a socket a live daemon
    /// still answers on
    ///
    /// Must be called from within a Tokio runtime.
    pub fn bind(socket_path: &Path) -> Result<Self, IpcError> {
        prepare_socket_dir(socket_path)?;
        let listener = tokio::net::UnixListener::bind(socket_path)?;
        secure_socket_file(socket_path)?;
        tracing::info!("IPC server listening on {:?}", socket_path);

        Ok(Self {
            listener,
            path: socket_path.to_path_buf(),
        })
    }

    /// Accept clients until `shutdown` resolves
    ///
    /// The socket file is removed on the way out.
    pub async fn serve<F>(self, gateway: CommandGateway, shutdown: F) -> Result<(), IpcError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut next_client = 0u64;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested, stopping IPC server");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        next_client += 1;
                        tokio::spawn(handle_client(stream, gateway.clone(), next_client));
                    }
                    Err(e) => tracing::error!("Accept error: {}", e),
                },
            }
        }

        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!("Failed to remove socket {:?}: {}", self.path, e);
        }
        Ok(())
    }
}

#[cfg(not(unix))]
pub struct ControlSocket {
    _unsupported: (),
}

#[cfg(not(unix))]
impl ControlSocket {
    pub fn bind(socket_path: &Path) -> Result<Self, IpcError> {
        tracing::error!("IPC server is not supported on this platform ({:?})", socket_path);
        Err(IpcError::Io(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "Unix domain sockets are not available on this platform",
        )))
    }

    pub async fn serve<F>(self, _gateway: CommandGateway, _shutdown: F) -> Result<(), IpcError>
    where
        F: Future<Output = ()>,
    {
        Ok(())
    }
}

/// Bind `socket_path` and accept clients until `shutdown` resolves
pub async fn run_server<F>(
    socket_path: &Path,
    gateway: CommandGateway,
    shutdown: F,
) -> Result<(), IpcError>
where
    F: Future<Output = ()>,
{
    ControlSocket::bind(socket_path)?
        .serve(gateway, shutdown)
        .await
}
