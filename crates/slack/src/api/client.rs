//! Slack Web API HTTP client
//!
//! Uses synchronous HTTP (ureq). A rate-limited request blocks the calling
//! thread for the server-provided delay and is then retried unchanged.

use log::{error, info, warn};
use serde_json::Value;
use std::time::Duration;

/// Errors raised by the transport
#[derive(Debug, thiserror::Error)]
pub enum SlackError {
    /// Connection or I/O failure before a status was received
    #[error("request to {method} failed: {source}")]
    Transport {
        method: String,
        #[source]
        source: ureq::Error,
    },

    /// Any non-2xx status other than 429
    #[error("GET {method}: [{status} - {body}]")]
    Status {
        method: String,
        status: u16,
        body: String,
    },

    /// A 2xx response whose body carries `"ok": false`
    #[error("GET {method}: response is not OK [{error}]")]
    NotOk { method: String, error: String },

    /// Body was not valid JSON
    #[error("GET {method}: invalid JSON body: {source}")]
    Decode {
        method: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Issues a single Slack Web API method call and returns its JSON body
///
/// Implementations must only return bodies whose `ok` flag is true.
pub trait SlackApi {
    fn call(&self, method: &str, params: &[(&'static str, String)]) -> Result<Value, SlackError>;
}

/// Blocking Slack Web API client
pub struct SlackClient {
    agent: ureq::Agent,
    base_url: String,
    token: String,
}

impl SlackClient {
    /// Slack Web API base URL
    pub const BASE_URL: &'static str = "https://slack.com/api";

    /// Wait applied when a 429 carries no usable `Retry-After` header
    const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

    /// Create a client against the public Slack API
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(token, Self::BASE_URL)
    }

    /// Create a client against an alternate API root
    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        // Statuses are inspected by hand so 429 headers stay readable
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build();

        Self {
            agent: ureq::Agent::new_with_config(config),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn transport_error(method: &str, source: ureq::Error) -> SlackError {
        SlackError::Transport {
            method: method.to_string(),
            source,
        }
    }
}

impl SlackApi for SlackClient {
    fn call(&self, method: &str, params: &[(&'static str, String)]) -> Result<Value, SlackError> {
        let url = format!("{}/{}", self.base_url, method);

        loop {
            info!("GET {} {:?}", url, params);

            let mut request = self
                .agent
                .get(&url)
                .header("Authorization", &format!("Bearer {}", self.token));
            for (key, value) in params {
                request = request.query(*key, value);
            }

            let mut response = request
                .call()
                .map_err(|e| Self::transport_error(method, e))?;
            let status = response.status().as_u16();

            if status == 429 {
                let raw = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let delay = match raw.as_deref().and_then(parse_retry_after) {
                    Some(delay) => delay,
                    None => {
                        warn!(
                            "Got 429 response without a usable Retry-After ({:?}), waiting {:?}",
                            raw,
                            Self::DEFAULT_RETRY_AFTER
                        );
                        Self::DEFAULT_RETRY_AFTER
                    }
                };
                info!(
                    "Got 429 response, waiting {}s before retrying. (Raw header: {:?})",
                    delay.as_secs_f64(),
                    raw
                );
                std::thread::sleep(delay);
                continue;
            }

            // Unpaged lists such as users.list can exceed ureq's 10 MiB default
            let body = response
                .body_mut()
                .with_config()
                .limit(u64::MAX)
                .read_to_string()
                .map_err(|e| Self::transport_error(method, e))?;

            if !(200..300).contains(&status) {
                error!("GET {}: [{} - {}]", url, status, body);
                return Err(SlackError::Status {
                    method: method.to_string(),
                    status,
                    body,
                });
            }

            let json: Value = serde_json::from_str(&body).map_err(|source| SlackError::Decode {
                method: method.to_string(),
                source,
            })?;

            if json.get("ok").and_then(Value::as_bool) != Some(true) {
                let reason = json
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown_error")
                    .to_string();
                return Err(SlackError::NotOk {
                    method: method.to_string(),
                    error: reason,
                });
            }

            return Ok(json);
        }
    }
}

/// Parse a `Retry-After` value given in (possibly fractional) seconds
fn parse_retry_after(raw: &str) -> Option<Duration> {
    let secs: f64 = raw.trim().parse().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}
