//! Spam screening for submitted content
//!
//! The checker is an external HTTP service: content is posted as the form
//! field `content` and the reply is a JSON verdict `{"valid": bool}`.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Request timeout in seconds
const CHECK_TIMEOUT: u64 = 5;

#[derive(Error, Debug)]
pub enum SpamCheckError {
    #[error("Invalid spam check endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("Spam check request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Spam check returned HTTP {status}")]
    Status { status: u16 },

    #[error("Malformed spam check verdict: {0}")]
    Verdict(#[from] serde_json::Error),
}

/// Decides whether a piece of user content is spam
pub trait SpamCheck: Send + Sync {
    fn is_spam(&self, content: &str) -> Result<bool, SpamCheckError>;
}

#[derive(Debug, Deserialize)]
struct Verdict {
    valid: bool,
}

/// Spam check backed by the remote verdict service
pub struct HttpSpamCheck {
    client: reqwest::blocking::Client,
    endpoint: Url,
}

impl HttpSpamCheck {
    pub fn new(endpoint: &str) -> Result<Self, SpamCheckError> {
        let endpoint = Url::parse(endpoint).map_err(|e| SpamCheckError::InvalidEndpoint {
            url: endpoint.to_string(),
            reason: e.to_string(),
        })?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(CHECK_TIMEOUT))
            .user_agent(concat!("glossa/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl SpamCheck for HttpSpamCheck {
    fn is_spam(&self, content: &str) -> Result<bool, SpamCheckError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .form(&[("content", content)])
            .send()?;

        let status = response.status();
        if !status.is_success() {
            warn!("Spam check at {} answered {}", self.endpoint, status);
            return Err(SpamCheckError::Status {
                status: status.as_u16(),
            });
        }

        let spam = parse_verdict(&response.text()?)?;
        debug!("Spam check verdict: spam={}", spam);
        Ok(spam)
    }
}

/// Accepts everything; used when no endpoint is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct PermissiveSpamCheck;

impl SpamCheck for PermissiveSpamCheck {
    fn is_spam(&self, _content: &str) -> Result<bool, SpamCheckError> {
        Ok(false)
    }
}

/// Parse a verdict body; returns true when the content is spam
fn parse_verdict(body: &str) -> Result<bool, SpamCheckError> {
    let verdict: Verdict = serde_json::from_str(body)?;
    Ok(!verdict.valid)
}
