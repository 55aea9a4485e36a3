//! Response classification
//!
//! The report API answers a report request in one of three ways:
//!
//! | Status | Meaning | Outcome |
//! |---|---|---|
//! | 200 | report ready | [`Outcome::Done`] |
//! | 201, 202 | queued / building, `Retryin` says when to ask again | [`Outcome::RetryAfter`] |
//! | 503 | overloaded | [`Outcome::RetryAfter`] one second |
//! | other | error or unsupported | [`Outcome::Done`] |
//!
//! A 201/202 without a usable `Retryin` header is [`Outcome::Fatal`].

use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use std::time::Duration;

/// Response header carrying the retry delay in whole seconds
pub const RETRY_IN_HEADER: &str = "Retryin";

/// Fixed backoff after a 503
pub const UNAVAILABLE_BACKOFF: Duration = Duration::from_secs(1);

/// What a task should do after a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Terminal: stop polling
    Done,
    /// Ask again no earlier than after this delay
    RetryAfter(Duration),
    /// Terminal: the response broke the API contract
    Fatal(String),
}

/// Classify a response by status and headers
pub fn classify(status: StatusCode, headers: &HeaderMap) -> Outcome {
    match status.as_u16() {
        200 => Outcome::Done,
        201 | 202 => match retry_in(headers) {
            Ok(delay) => Outcome::RetryAfter(delay),
            Err(reason) => Outcome::Fatal(reason),
        },
        503 => Outcome::RetryAfter(UNAVAILABLE_BACKOFF),
        _ => Outcome::Done,
    }
}

fn retry_in(headers: &HeaderMap) -> Result<Duration, String> {
    let value = headers
        .get(RETRY_IN_HEADER)
        .ok_or_else(|| format!("missing {} header", RETRY_IN_HEADER))?;
    let text = value
        .to_str()
        .map_err(|_| format!("{} header is not valid text", RETRY_IN_HEADER))?;
    let secs = text
        .trim()
        .parse::<i64>()
        .map_err(|_| format!("{} header is not an integer: {:?}", RETRY_IN_HEADER, text))?;
    u64::try_from(secs)
        .map(Duration::from_secs)
        .map_err(|_| format!("{} header is negative: {}", RETRY_IN_HEADER, secs))
}
