//! Shared HTTP retry wrapper for the catalog's upstream services.

use std::future::Future;

use tracing::warn;

use ashbot_core::retry::RetryPolicy;

use crate::error::{CatalogError, Result};

/// Run a request under `policy`. Transport errors and retriable upstream
/// statuses back off and retry; any other response is handed back for the
/// caller's status handling.
pub(crate) async fn send_with_retry<F, Fut>(
    policy: &RetryPolicy,
    mut op: F,
) -> Result<reqwest::Response>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<reqwest::Response, reqwest::Error>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(resp) => {
                let status = resp.status().as_u16();
                if policy.is_retriable_status(status) {
                    if let Some(delay) = policy.delay_for(attempt) {
                        warn!(status, attempt, "transient upstream status, retrying");
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                }
                return Ok(resp);
            }
            Err(e) => match policy.delay_for(attempt) {
                Some(delay) => {
                    warn!(err = %e, attempt, "request failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => return Err(CatalogError::Http(e)),
            },
        }
    }
}
