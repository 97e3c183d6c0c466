//! Client configuration

use crate::{PesepayError, Result};
use std::time::Duration;

/// Production endpoint for initiating payments
pub const DEFAULT_INITIATE_URL: &str =
    "https://api.pesepay.com/api/payments-engine/v1/payments/initiate";

/// Production endpoint for checking a payment by reference number
pub const DEFAULT_CHECK_PAYMENT_URL: &str =
    "https://api.pesepay.com/api/payments-engine/v1/payments/check-payment";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Endpoints and HTTP settings used by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PesepayConfig {
    /// URL receiving the encrypted payment request (POST)
    pub initiate_url: String,
    /// URL answering status checks (GET, `referenceNumber` query parameter)
    pub check_payment_url: String,
    /// Request timeout
    pub timeout: Option<Duration>,
    /// `User-Agent` sent with every request
    pub user_agent: String,
}

impl PesepayConfig {
    /// Create a config pointing at custom endpoints
    pub fn new(initiate_url: impl Into<String>, check_payment_url: impl Into<String>) -> Self {
        Self {
            initiate_url: initiate_url.into(),
            check_payment_url: check_payment_url.into(),
            timeout: Some(DEFAULT_TIMEOUT),
            user_agent: format!("pesepay-rust/{}", crate::VERSION),
        }
    }

    /// Create a config with both endpoints under one base URL, using the
    /// production path layout. Handy for mock servers.
    pub fn with_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self::new(
            format!("{}/api/payments-engine/v1/payments/initiate", base),
            format!("{}/api/payments-engine/v1/payments/check-payment", base),
        )
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validate_url("initiate", &self.initiate_url)?;
        validate_url("check-payment", &self.check_payment_url)?;

        if self.timeout == Some(Duration::ZERO) {
            return Err(PesepayError::config("Timeout must be greater than zero"));
        }

        Ok(())
    }

    /// Set the initiate endpoint
    pub fn with_initiate_url(mut self, url: impl Into<String>) -> Self {
        self.initiate_url = url.into();
        self
    }

    /// Set the check-payment endpoint
    pub fn with_check_payment_url(mut self, url: impl Into<String>) -> Self {
        self.check_payment_url = url.into();
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Leave timeouts to the HTTP client defaults
    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

impl Default for PesepayConfig {
    fn default() -> Self {
        Self::new(DEFAULT_INITIATE_URL, DEFAULT_CHECK_PAYMENT_URL)
    }
}

fn validate_url(name: &str, raw: &str) -> Result<()> {
    if raw.is_empty() {
        return Err(PesepayError::config(format!("{} URL cannot be empty", name)));
    }

    let url = url::Url::parse(raw)
        .map_err(|e| PesepayError::config(format!("Invalid {} URL '{}': {}", name, raw, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(PesepayError::config(format!(
            "{} URL must use http or https, got '{}'",
            name, other
        ))),
    }
}
