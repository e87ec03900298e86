//! Network link readiness.
//!
//! Joining the wireless network is the OS's job; the slideshow only needs
//! the generation endpoint to be reachable before the loop starts. This
//! blocks until a TCP probe to the endpoint host succeeds, drawing a status
//! screen while it waits. A link drop mid-loop is not handled here; it
//! surfaces as fetch failures and skipped cycles.

use crate::compositor::LayerCompositor;
use crate::display::{DisplayError, Screen};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Block until the endpoint host accepts a TCP connection.
///
/// Shows connection progress on the panel; reports the local address once
/// the link is up, like the panel does for storage progress.
pub async fn wait_until_online<S: Screen>(
    endpoint: &str,
    compositor: &mut LayerCompositor<S>,
) -> Result<(), DisplayError> {
    let (host, port) = endpoint_authority(endpoint);
    compositor.status_screen("Connecting to network...")?;

    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match timeout(PROBE_TIMEOUT, TcpStream::connect((host.as_str(), port))).await {
            Ok(Ok(stream)) => {
                let local = stream
                    .local_addr()
                    .map(|a| a.ip().to_string())
                    .unwrap_or_else(|_| "unknown".to_string());
                tracing::info!("Network link up, local address {}", local);
                compositor.status_screen(&format!("Network connected\nIP: {local}"))?;
                tokio::time::sleep(Duration::from_secs(1)).await;
                return Ok(());
            }
            Ok(Err(e)) => {
                tracing::debug!("Probe {} to {}:{} failed: {}", attempt, host, port, e);
            }
            Err(_) => {
                tracing::debug!("Probe {} to {}:{} timed out", attempt, host, port);
            }
        }

        if attempt % 5 == 0 {
            tracing::warn!("Still waiting for network after {} probes", attempt);
        }
        tokio::time::sleep(RETRY_DELAY).await;
    }
}

/// Extract (host, port) to probe from the endpoint URL
fn endpoint_authority(endpoint: &str) -> (String, u16) {
    match reqwest::Url::parse(endpoint) {
        Ok(url) => {
            let host = url.host_str().unwrap_or("localhost").to_string();
            let port = url.port_or_known_default().unwrap_or(443);
            (host, port)
        }
        Err(_) => (endpoint.to_string(), 443),
    }
}
