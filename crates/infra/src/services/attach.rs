//! The patch leg of a document attach.
//!
//! Attaching is two writes: the upload, then a patch pointing the owner at the
//! returned URL. Only the patch is retried. An upload is never repeated for the
//! same attach, so a retry can't leave orphaned copies behind.

use std::future::Future;
use std::time::Duration;

use crate::config::CoreConfig;
use crate::error::StoreError;
use crate::files::UploadTarget;

const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// A stored document and the record that now points at it.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment<T> {
    pub url: String,
    pub record: T,
}

/// Run `patch` until it succeeds, a non-transient error comes back, or the
/// configured attempts are used up. The delay doubles after every failure.
pub(crate) async fn link_with_retry<T, F, Fut>(
    config: &CoreConfig,
    target: UploadTarget,
    mut patch: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let attempts = config.attach_patch_attempts.max(1);
    let mut delay = config.attach_retry_backoff;
    let mut attempt = 1;

    loop {
        match patch().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(%target, attempt, "attachment linked after retry");
                }
                return Ok(value);
            }
            Err(e) if attempt < attempts && e.is_transient() => {
                tracing::warn!(
                    "Linking attachment to {} failed (attempt {}/{}), retrying in {:?}: {}",
                    target,
                    attempt,
                    attempts,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
                delay = std::cmp::min(delay * 2, MAX_BACKOFF);
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(%target, attempt, error = %e, "giving up on linking attachment");
                return Err(e);
            }
        }
    }
}
