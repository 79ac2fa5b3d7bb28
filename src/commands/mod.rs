//! Command handlers
//!
//! The operations a control client can invoke on the daemon.

pub mod recording;

pub use recording::CommandGateway;
