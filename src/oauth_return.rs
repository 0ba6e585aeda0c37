//! OAuth Return Listener
//!
//! After the FreeAgent consent page, the backend's callback redirects the
//! browser to `{FRONTEND_URL}/settings?oauth=...`. When FRONTEND_URL points at
//! this listener, the browser request is answered with a short page and its
//! path and query are handed back so the shell can open the settings page
//! with the result.

use std::time::{Duration, Instant};

use tiny_http::{Response, Server};

use crate::config::OAuthReturnConfig;
use crate::views::OAuthCallback;

const RETURN_PATH: &str = "/settings";

#[derive(Debug, thiserror::Error)]
pub enum OAuthReturnError {
    #[error("HTTP server error: {0}")]
    Server(String),
    #[error("Timed out waiting for the OAuth redirect")]
    TimedOut,
}

/// Bound listener waiting for a single browser return
pub struct ReturnListener {
    server: Server,
}

impl ReturnListener {
    pub fn bind(addr: &str) -> Result<Self, OAuthReturnError> {
        let server = Server::http(addr).map_err(|e| OAuthReturnError::Server(e.to_string()))?;
        log::info!("OAuth return listener started on http://{}", addr);
        Ok(Self { server })
    }

    pub fn local_addr(&self) -> Option<std::net::SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Block until the browser hits `/settings` or `timeout` elapses.
    ///
    /// Returns the request path with its query string.
    pub fn wait(self, timeout: Duration) -> Result<String, OAuthReturnError> {
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(OAuthReturnError::TimedOut);
            }

            let request = match self.server.recv_timeout(remaining) {
                Ok(Some(request)) => request,
                Ok(None) => return Err(OAuthReturnError::TimedOut),
                Err(e) => return Err(OAuthReturnError::Server(e.to_string())),
            };

            let url = request.url().to_string();
            log::info!("Received OAuth return: {}", url);

            let (path, query) = url.split_once('?').unwrap_or((url.as_str(), ""));
            if path.trim_end_matches('/') == RETURN_PATH {
                let body = match OAuthCallback::from_query(query) {
                    Some(OAuthCallback::Success) => {
                        "FreeAgent connected! You can close this window and return to the dashboard."
                    }
                    _ => {
                        "FreeAgent connection finished. You can close this window and return to the dashboard."
                    }
                };
                if let Err(e) = request.respond(Response::from_string(body)) {
                    log::warn!("Failed to answer OAuth return request: {}", e);
                }
                return Ok(url);
            }

            // Favicon and other stray requests
            if let Err(e) = request.respond(Response::from_string("Not found").with_status_code(404)) {
                log::debug!("Failed to answer stray request {}: {}", url, e);
            }
        }
    }
}

/// Bind, then wait on a blocking thread
pub async fn listen(config: OAuthReturnConfig) -> Result<String, OAuthReturnError> {
    let listener = ReturnListener::bind(&config.addr)?;
    tokio::task::spawn_blocking(move || listener.wait(config.timeout))
        .await
        .map_err(|e| OAuthReturnError::Server(e.to_string()))?
}
