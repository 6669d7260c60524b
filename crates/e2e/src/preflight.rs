//! Reachability probe for the application under test

use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

/// Poll `base_url` until it answers with any HTTP response.
///
/// The app's status code is not judged here; a 404 on `/` still means the
/// server is up. Navigation steps decide what counts as a failed load.
pub async fn wait_until_reachable(base_url: &str, timeout: Duration) -> E2eResult<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()?;

    let start = Instant::now();
    let mut attempts = 0;

    while start.elapsed() < timeout {
        attempts += 1;

        match client.get(base_url).send().await {
            Ok(resp) => {
                info!("{} answered {} after {} attempt(s)", base_url, resp.status(), attempts);
                return Ok(());
            }
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for {} to accept connections...", base_url);
                }
                // Connection refused is expected while the dev server boots
                if !e.is_connect() {
                    warn!("Preflight error: {}", e);
                }
            }
        }

        sleep(Duration::from_millis(250)).await;
    }

    Err(E2eError::Unreachable(base_url.to_string(), timeout.as_secs()))
}
