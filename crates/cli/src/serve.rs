//! Daemon mode – serve the host backend over a Unix socket.

use engine::config::AppConfig;
use engine::host::HostBackend;
use engine::socket;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::UnixListener;

pub async fn run_daemon(socket_path: PathBuf, config: &AppConfig) {
    // Remove stale socket if it exists
    let _ = std::fs::remove_file(&socket_path);

    let listener = match UnixListener::bind(&socket_path) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("error: cannot bind socket {}: {}", socket_path.display(), e);
            std::process::exit(2);
        }
    };

    let backend = Arc::new(HostBackend::detect(&config.host));
    tracing::info!(socket = %socket_path.display(), "launcherctl daemon listening");
    eprintln!("launcherctl daemon listening on {}", socket_path.display());

    socket::serve(listener, backend).await;
}
