//! Engine crate – shared frontend-side logic for the launcher.
//!
//! Holds the command registry, the typed invocation bridge over a backend
//! transport, and the status mirror the UI reads from. It does NOT depend
//! on Tauri runtime types, so the headless CLI harness drives exactly the
//! same code as the GUI.

pub mod bridge;
pub mod commands;
pub mod config;
pub mod context;
pub mod host;
pub mod logging;
pub mod scenario;
#[cfg(unix)]
pub mod socket;
pub mod status;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use bridge::{Bridge, BridgeError, InvokeError};
pub use commands::{Command, CommandName};
pub use context::{AppContext, BackendTarget};
pub use status::SystemStatus;
pub use transport::{Transport, TransportError};
pub use types::{CommandResult, ErrorCode, ErrorInfo, Status};
