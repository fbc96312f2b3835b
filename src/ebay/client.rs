//! Rate-limited HTTP fetcher using wreq for TLS fingerprint emulation.

use crate::config::Config;
use crate::error::{BudgetExhausted, FetchError};
use anyhow::Result;
use rand::RngExt;
use std::time::Duration;
use tracing::{debug, warn};
use wreq::Client;
use wreq_util::Emulation;

/// Pre-attempt gate for metered backends; a failure aborts the fetch.
type ChargeFn = Box<dyn Fn() -> Result<(), BudgetExhausted> + Send + Sync>;

/// Phrases that identify a bot-challenge page served with HTTP 200.
const BLOCK_PHRASES: &[&str] = &["captcha", "access denied", "verify you are human"];

/// Picks one of the rotated browser profiles for a request.
fn random_emulation() -> Emulation {
    if rand::rng().random_bool(0.5) {
        Emulation::Chrome131
    } else {
        Emulation::Chrome130
    }
}

/// Decides whether a timed-out request is retried with a revised timeout.
///
/// The interactive "ask the user for a new timeout" behavior lives in a
/// UI layer, not here; the default policy abandons the page.
pub trait TimeoutPolicy: Send + Sync {
    /// Given the timeout that just expired and the attempt number, returns
    /// a revised timeout to retry with, or None to abandon the page.
    fn revise(&self, expired: Duration, attempt: u32) -> Option<Duration>;
}

/// Non-interactive default: a timeout abandons the page immediately.
pub struct AbortOnTimeout;

impl TimeoutPolicy for AbortOnTimeout {
    fn revise(&self, _expired: Duration, _attempt: u32) -> Option<Duration> {
        None
    }
}

/// Retries every timeout with the same fixed, larger timeout.
pub struct FixedEscalation(pub Duration);

impl TimeoutPolicy for FixedEscalation {
    fn revise(&self, _expired: Duration, _attempt: u32) -> Option<Duration> {
        Some(self.0)
    }
}

/// HTTP client with inter-request delay, retry with linear backoff, and
/// bot-block cooldown.
pub struct MarketClient {
    client: Client,
    delay_ms: u64,
    delay_jitter_ms: u64,
    timeout: Duration,
    attempts: u32,
    backoff_base: Duration,
    block_cooldown: Duration,
    timeout_policy: Box<dyn TimeoutPolicy>,
    charge: Option<ChargeFn>,
}

impl MarketClient {
    /// Creates a client from the configuration, with production pacing
    /// (5 s linear backoff, 60 s bot-block cooldown).
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            delay_ms: config.delay_ms,
            delay_jitter_ms: config.delay_jitter_ms,
            timeout: Duration::from_secs(config.timeout_secs),
            attempts: config.attempts.max(1),
            backoff_base: Duration::from_secs(5),
            block_cooldown: Duration::from_secs(60),
            timeout_policy: Box::new(AbortOnTimeout),
            charge: None,
        })
    }

    /// Replaces the timeout-escalation policy.
    pub fn with_timeout_policy(mut self, policy: impl TimeoutPolicy + 'static) -> Self {
        self.timeout_policy = Box::new(policy);
        self
    }

    /// Installs a gate consulted before every attempt. Metered backends
    /// charge their call budget here, so retries are counted individually.
    pub fn with_charge(
        mut self,
        charge: impl Fn() -> Result<(), BudgetExhausted> + Send + Sync + 'static,
    ) -> Self {
        self.charge = Some(Box::new(charge));
        self
    }

    /// Overrides backoff and cooldown pacing (tests zero these out).
    pub fn set_retry_pacing(&mut self, backoff_base: Duration, block_cooldown: Duration) {
        self.backoff_base = backoff_base;
        self.block_cooldown = block_cooldown;
    }

    /// Fetches one URL, classifying every outcome.
    ///
    /// Every attempt, including retries, first passes the charge gate when
    /// one is installed; an exhausted budget aborts the fetch immediately.
    /// A bot-challenge body or a 503 waits out the block cooldown and
    /// consumes an attempt. Other non-200 statuses and connection errors
    /// back off linearly (`backoff_base * attempt`). A timeout consults the
    /// timeout policy and aborts the page under the default policy.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let mut timeout = self.timeout;
        let mut last = FetchError::Network("no attempts made".to_string());
        let mut attempt = 1;

        while attempt <= self.attempts {
            if let Some(charge) = &self.charge {
                charge()?;
            }

            self.delay().await;

            debug!(attempt, ?timeout, "GET {}", url);

            match self.get(url, timeout).await {
                Ok(response) => {
                    let status = response.status().as_u16();

                    if status == 503 {
                        warn!("Blocked by marketplace (503), cooling down before retry");
                        tokio::time::sleep(self.block_cooldown).await;
                        last = FetchError::Blocked;
                        attempt += 1;
                        continue;
                    }

                    if (200..300).contains(&status) {
                        match response.text().await {
                            Ok(body) => {
                                if is_bot_blocked(&body) {
                                    warn!("Bot-challenge page detected, cooling down before retry");
                                    tokio::time::sleep(self.block_cooldown).await;
                                    last = FetchError::Blocked;
                                    attempt += 1;
                                    continue;
                                }
                                return Ok(body);
                            }
                            Err(e) => {
                                last = FetchError::Network(e.to_string());
                            }
                        }
                    } else {
                        debug!("Non-200 status: {}", status);
                        last = FetchError::Http(status);
                    }
                }
                Err(e) if e.is_timeout() => {
                    warn!("Request timed out after {:?}", timeout);
                    match self.timeout_policy.revise(timeout, attempt) {
                        Some(revised) => {
                            debug!("Retrying with revised timeout {:?}", revised);
                            tokio::time::sleep(self.backoff_base).await;
                            last = FetchError::Timeout(timeout);
                            timeout = revised;
                            attempt += 1;
                            continue;
                        }
                        None => return Err(FetchError::Timeout(timeout)),
                    }
                }
                Err(e) => {
                    debug!("Request error: {}", e);
                    last = FetchError::Network(e.to_string());
                }
            }

            if attempt < self.attempts {
                let wait = self.backoff_base * attempt;
                debug!(?wait, "Backing off before retry");
                tokio::time::sleep(wait).await;
            }
            attempt += 1;
        }

        Err(last)
    }

    /// Issues one GET with browser emulation and a per-request timeout.
    async fn get(&self, url: &str, timeout: Duration) -> Result<wreq::Response, wreq::Error> {
        self.client
            .get(url)
            .emulation(random_emulation())
            .timeout(timeout)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header("Accept-Language", "en-GB,en;q=0.9")
            .header("Accept-Encoding", "gzip, deflate, br")
            .header("Upgrade-Insecure-Requests", "1")
            .send()
            .await
    }

    /// Randomized pre-request delay to respect rate limits.
    async fn delay(&self) {
        if self.delay_ms == 0 && self.delay_jitter_ms == 0 {
            return;
        }

        let jitter = if self.delay_jitter_ms > 0 {
            rand::rng().random_range(0..=self.delay_jitter_ms)
        } else {
            0
        };

        let total = self.delay_ms + jitter;
        debug!("Delaying {}ms", total);
        tokio::time::sleep(Duration::from_millis(total)).await;
    }
}

/// Case-insensitive content check for known bot-challenge signatures.
fn is_bot_blocked(body: &str) -> bool {
    let body = body.to_lowercase();
    BLOCK_PHRASES.iter().any(|phrase| body.contains(phrase))
}
