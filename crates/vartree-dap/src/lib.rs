//! vartree-dap: Debug Adapter Protocol client for vartree.
//!
//! This crate talks to debug adapters: protocol types, Content-Length
//! framing, request/response correlation over an async byte stream,
//! and the session lifecycle that gates which requests may be sent.

pub mod capabilities;
pub mod client;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transport;

pub use capabilities::DapCapabilities;
pub use client::DapClient;
pub use connection::DapConnection;
pub use error::DapError;
pub use protocol::*;
pub use session::{DapSession, SessionState};
