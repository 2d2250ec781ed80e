//! Bounded polling over the provider's eventual-consistency window
//!
//! Resources created a moment ago may not be visible to the next call yet.
//! Both suspension points of a run (tagging a just-created resource and
//! waiting for its block devices) poll at a fixed interval until the provider
//! catches up or the timeout expires.

use crate::api::CloudApi;
use crate::error::{CloudError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Fixed-interval polling policy
#[derive(Debug, Clone)]
pub struct WaitConfig {
    /// Delay between two attempts
    pub interval: Duration,

    /// Give up once this much time has passed since the first attempt
    pub timeout: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(300),
        }
    }
}

/// Poll `probe` until it yields a value.
///
/// `Ok(None)` means "not there yet" and schedules another attempt; errors
/// abort immediately. Exhausting the timeout raises
/// [`CloudError::TransientVisibility`].
pub async fn poll_until<T, F, Fut>(wait: &WaitConfig, resource: &str, mut probe: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let start = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        if let Some(value) = probe().await? {
            tracing::debug!(resource = %resource, attempts, "Resource visible");
            return Ok(value);
        }

        let elapsed = start.elapsed();
        if elapsed >= wait.timeout {
            return Err(CloudError::TransientVisibility {
                resource: resource.to_string(),
                attempts,
                elapsed,
            });
        }

        tokio::time::sleep(wait.interval).await;
    }
}

/// Attach one tag to a just-created resource, waiting out its visibility window
pub async fn confirm_tag(
    api: &dyn CloudApi,
    wait: &WaitConfig,
    resource_id: &str,
    key: &str,
    value: &str,
) -> Result<()> {
    poll_until(wait, resource_id, move || async move {
        match api.create_tag(resource_id, key, value).await {
            Ok(()) => Ok(Some(())),
            Err(e) if e.is_not_visible() => {
                tracing::warn!(resource = %resource_id, error = %e, "Waiting for resource to rise");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    })
    .await
}

/// Capitalize every word: `name` -> `Name`, `cost_center` -> `Cost_Center`
pub fn title_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut word_start = true;
    for c in key.chars() {
        if word_start {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        word_start = !c.is_alphabetic();
    }
    out
}
