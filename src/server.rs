//! Unix-domain socket front end.
//!
//! Connections are accepted and served one at a time; every command
//! therefore sees a consistent snapshot and the virtual device is never
//! driven concurrently. Each connection carries exactly one framed
//! request and one framed response.

use crate::dispatcher::CommandDispatcher;
use crate::errors::AutomationError;
use crate::protocol::{read_frame, write_frame, Request, Response};
use std::future::Future;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::net::{UnixListener, UnixStream};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Time limit for the single request/response exchange. A client that
/// connects and stalls would otherwise block the whole service.
const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(10);

const SOCKET_FILE: &str = "clickd.sock";

/// Socket path under `$XDG_RUNTIME_DIR`, falling back to `/tmp`.
pub fn default_socket_path() -> PathBuf {
    let runtime_dir =
        std::env::var_os("XDG_RUNTIME_DIR").unwrap_or_else(|| "/tmp".into());
    PathBuf::from(runtime_dir).join(SOCKET_FILE)
}

pub struct Server {
    listener: UnixListener,
    path: PathBuf,
}

impl Server {
    /// Bind the listener, replacing any stale socket file from a previous
    /// run, and restrict it to the owning user.
    pub fn bind(path: &Path) -> Result<Self, AutomationError> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        let listener = UnixListener::bind(path)?;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        info!(path = %path.display(), "listening");
        Ok(Self {
            listener,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Accept loop. Runs until `shutdown` completes; a connection in
    /// flight is finished before the loop exits.
    pub async fn serve(
        self,
        mut dispatcher: CommandDispatcher,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), AutomationError> {
        tokio::pin!(shutdown);
        loop {
            let stream = tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, _)) => stream,
                    Err(e) => {
                        error!(error = %e, "accept failed");
                        continue;
                    }
                },
            };
            if let Err(e) = handle_connection(stream, &mut dispatcher).await {
                // A misbehaving client costs us one connection, nothing
                // more.
                warn!(error = %e, "connection aborted");
            }
        }
        Ok(())
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "failed to remove socket file");
            }
        }
    }
}

/// Serve one connection: read a frame, dispatch, answer, hang up.
///
/// Undecodable JSON still gets an error response. A framing violation
/// (oversize length) also gets a best-effort framed error before the
/// connection is aborted; a short read or a timeout gets nothing.
async fn handle_connection(
    mut stream: UnixStream,
    dispatcher: &mut CommandDispatcher,
) -> Result<(), AutomationError> {
    let exchange = async {
        let payload = match read_frame(&mut stream).await {
            Ok(Some(payload)) => payload,
            // Connected and left without sending anything.
            Ok(None) => return Ok(()),
            Err(e @ AutomationError::Protocol(_)) => {
                if let Ok(body) = serde_json::to_vec(&Response::error(e.to_string())) {
                    let _ = write_frame(&mut stream, &body).await;
                }
                return Err(e);
            }
            Err(e) => return Err(e),
        };
        let response = match Request::decode(&payload) {
            Ok(request) => {
                debug!(?request, "dispatching");
                dispatcher.dispatch(request).await
            }
            Err(e) => {
                warn!(error = %e, "undecodable request");
                Response::error(e.to_string())
            }
        };
        let body = serde_json::to_vec(&response)
            .map_err(|e| AutomationError::Protocol(format!("response encoding failed: {e}")))?;
        write_frame(&mut stream, &body).await
    };
    match timeout(EXCHANGE_TIMEOUT, exchange).await {
        Ok(result) => result,
        Err(_) => Err(AutomationError::Protocol(
            "request exchange timed out".to_string(),
        )),
    }
}
