//! Local control channel
//!
//! Length-prefixed JSON over a Unix domain socket. One request, one response;
//! a client may send several requests on the same connection.

pub mod client;
pub mod handlers;
pub mod messages;
pub mod protocol;
pub mod server;

pub use client::send_request;
pub use messages::{Request, Response};
pub use protocol::{IpcError, MAX_MESSAGE_SIZE};
pub use server::{run_server, ControlSocket};
