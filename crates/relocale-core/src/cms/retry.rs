//! Transport retry for CMS requests: classification and exponential backoff.
//!
//! Retries happen inside the client, per HTTP request. Pages that still fail
//! are reported once to the orchestrator and never re-attempted there.

use std::time::Duration;

use super::CmsError;
use crate::config::RetryConfig;

/// Retry-relevant classification of a CMS error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connect or transfer timed out.
    Timeout,
    /// 429 or 503: the API asked us to slow down.
    Throttled,
    /// Connection reset, DNS failure and the like.
    Connection,
    /// Other 5xx.
    Server(u32),
    /// 4xx, bad payloads, local failures. Never retried.
    Final,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Stop,
    RetryAfter(Duration),
}

/// Exponential backoff with a cap on attempts and on delay.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        let max_delay = Duration::from_secs(cfg.max_delay_secs);
        Self {
            max_attempts: cfg.max_attempts.max(1),
            base_delay: Duration::try_from_secs_f64(cfg.base_delay_secs.max(0.0))
                .unwrap_or(max_delay),
            max_delay,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// `attempt` is 1-based (1 = the request that just failed was the first).
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt >= self.max_attempts || kind == ErrorKind::Final {
            return RetryDecision::Stop;
        }
        let factor = 1u32 << attempt.saturating_sub(1).min(8);
        RetryDecision::RetryAfter(self.base_delay.saturating_mul(factor).min(self.max_delay))
    }
}

fn classify_status(status: u32) -> ErrorKind {
    match status {
        429 | 503 => ErrorKind::Throttled,
        500..=599 => ErrorKind::Server(status),
        _ => ErrorKind::Final,
    }
}

fn classify_curl(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
    {
        return ErrorKind::Connection;
    }
    ErrorKind::Final
}

pub fn classify(e: &CmsError) -> ErrorKind {
    match e {
        CmsError::Curl(ce) => classify_curl(ce),
        CmsError::Http { status, .. } => classify_status(*status),
        CmsError::Decode(_) | CmsError::Url(_) | CmsError::Task(_) | CmsError::Other(_) => {
            ErrorKind::Final
        }
    }
}

/// Runs `f` until it succeeds or the policy says stop, sleeping the current
/// thread between attempts. Call from `spawn_blocking` in async code.
pub fn run_with_retry<T, F>(policy: &RetryPolicy, mut f: F) -> Result<T, CmsError>
where
    F: FnMut() -> Result<T, CmsError>,
{
    let mut attempt = 1u32;
    loop {
        let err = match f() {
            Ok(v) => return Ok(v),
            Err(e) => e,
        };
        match policy.decide(attempt, classify(&err)) {
            RetryDecision::Stop => return Err(err),
            RetryDecision::RetryAfter(delay) => {
                tracing::warn!(attempt, ?delay, error = %err, "CMS request failed, retrying");
                std::thread::sleep(delay);
                attempt += 1;
            }
        }
    }
}
