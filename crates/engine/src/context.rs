//! Application context – built once at startup and passed to consumers.

use crate::bridge::Bridge;
use crate::config::AppConfig;
use crate::host::HostBackend;
#[cfg(unix)]
use crate::socket::SocketTransport;
use crate::status::SystemStatus;
use crate::transport::Transport;
#[cfg(unix)]
use std::path::PathBuf;
use std::sync::Arc;

/// Where backend commands are sent.
#[derive(Debug, Clone)]
pub enum BackendTarget {
    /// Answer commands in-process from this machine's facts.
    Host,
    /// Forward commands to a daemon listening on this socket.
    #[cfg(unix)]
    Socket(PathBuf),
}

/// Central context handed to every consumer of system status.
///
/// Holds the bridge and the single status mirror for the session, so
/// callers never look either up from global state.
pub struct AppContext {
    bridge: Bridge,
    status: Arc<SystemStatus>,
}

impl AppContext {
    /// Context over an arbitrary transport. The status mirror starts empty.
    pub fn new(transport: Arc<dyn Transport>, config: &AppConfig) -> Self {
        let bridge =
            Bridge::new(transport).with_response_validation(config.bridge.validate_responses);
        let status = Arc::new(SystemStatus::new(bridge.clone()));
        Self { bridge, status }
    }

    /// Context for the given backend. The status mirror starts empty.
    pub fn connect(target: BackendTarget, config: &AppConfig) -> Self {
        Self::new(transport_for(target, config), config)
    }

    /// Context for the given backend, with the status mirror refreshing in
    /// the background. Must be called from within a tokio runtime.
    pub fn start(target: BackendTarget, config: &AppConfig) -> Self {
        let ctx = Self::connect(target, config);
        ctx.status.spawn_refresh();
        ctx
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn status(&self) -> &Arc<SystemStatus> {
        &self.status
    }
}

fn transport_for(target: BackendTarget, config: &AppConfig) -> Arc<dyn Transport> {
    match target {
        BackendTarget::Host => Arc::new(HostBackend::detect(&config.host)),
        #[cfg(unix)]
        BackendTarget::Socket(path) => Arc::new(SocketTransport::new(path)),
    }
}
