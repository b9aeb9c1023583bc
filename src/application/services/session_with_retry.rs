use crate::domain::external_apis::github::Session;
use crate::domain::models::page::Page;
use crate::domain::ports::Clock;
use anyhow::Error;
use async_trait::async_trait;
use std::time::Duration;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

/// Exponential backoff without jitter: `base_delay * 2^retry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn delay(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(retry))
    }
}

/// A [`Session`] decorator that retries failed GETs.
///
/// Once the retry budget is spent the last outcome is handed back as is:
/// a failed page stays an `Ok` page with an error status.
pub struct SessionWithRetry<S, C> {
    inner: S,
    clock: C,
    policy: RetryPolicy,
}

impl<S: Session, C: Clock> SessionWithRetry<S, C> {
    pub fn new(inner: S, clock: C, policy: RetryPolicy) -> Self {
        Self {
            inner,
            clock,
            policy,
        }
    }
}

#[async_trait]
impl<S: Session, C: Clock> Session for SessionWithRetry<S, C> {
    async fn get(&self, url: &str) -> Result<Page, Error> {
        let mut retries = 0;

        loop {
            let outcome = self.inner.get(url).await;
            let failure = match &outcome {
                Ok(page) if page.is_success() => None,
                Ok(page) => Some(format!("HTTP status {}", page.status)),
                Err(e) => Some(format!("{e:#}")),
            };
            let Some(failure) = failure else {
                return outcome;
            };
            tracing::warn!("Error fetching {url}: {failure}");

            if retries >= self.policy.max_retries {
                tracing::warn!("Maximum retries reached ({}).", self.policy.max_retries);
                return outcome;
            }

            let delay = self.policy.delay(retries);
            retries += 1;
            tracing::warn!(
                "Retrying in {:?} seconds (retry attempt {retries})...",
                delay.as_secs_f64()
            );
            self.clock.sleep(delay).await;
        }
    }
}
