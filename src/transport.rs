//! HTTP transport for the Pesepay payment endpoints

use crate::config::PesepayConfig;
use crate::types::Envelope;
use crate::{PesepayError, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response};
use tracing::{debug, info, warn};

/// Query parameter carrying the reference number on status checks
pub const REFERENCE_NUMBER_PARAM: &str = "referenceNumber";

/// Round trips to the payment service carrying encrypted envelopes
///
/// Every call is a single request. Nothing is retried: initiating a payment is
/// not idempotent on the service side.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Submit an encrypted payment request
    async fn initiate_payment(
        &self,
        envelope: &Envelope,
        integration_key: &str,
    ) -> Result<Envelope>;

    /// Ask for the state of a payment by its reference number
    async fn check_payment(
        &self,
        reference_number: &str,
        integration_key: &str,
    ) -> Result<Envelope>;

    /// Ask for the state of a payment through the poll URL the service returned
    async fn poll(&self, poll_url: &str, integration_key: &str) -> Result<Envelope>;
}

/// `Transport` over HTTPS using reqwest
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: PesepayConfig,
}

impl HttpTransport {
    /// Create a transport from a validated configuration
    pub fn new(config: PesepayConfig) -> Result<Self> {
        config.validate()?;

        let mut client_builder = Client::builder().user_agent(config.user_agent.clone());

        if let Some(timeout) = config.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        let client = client_builder
            .build()
            .map_err(|e| PesepayError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Create a transport reusing an existing reqwest client
    pub fn with_client(client: Client, config: PesepayConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { client, config })
    }

    /// The configuration in use
    pub fn config(&self) -> &PesepayConfig {
        &self.config
    }

    fn authorized(&self, request: RequestBuilder, integration_key: &str) -> RequestBuilder {
        request
            .header(AUTHORIZATION, integration_key)
            .header(CONTENT_TYPE, "application/json")
    }

    async fn get_envelope(
        &self,
        url: &str,
        query: Option<(&str, &str)>,
        integration_key: &str,
    ) -> Result<Envelope> {
        let mut request = self.client.get(url);
        if let Some(pair) = query {
            request = request.query(&[pair]);
        }

        let response = self.authorized(request, integration_key).send().await?;
        read_envelope(response).await
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn initiate_payment(
        &self,
        envelope: &Envelope,
        integration_key: &str,
    ) -> Result<Envelope> {
        info!("Initiating payment at {}", self.config.initiate_url);

        let request = self.client.post(&self.config.initiate_url).json(envelope);

        let response = self.authorized(request, integration_key).send().await?;
        read_envelope(response).await
    }

    async fn check_payment(
        &self,
        reference_number: &str,
        integration_key: &str,
    ) -> Result<Envelope> {
        info!(
            "Checking payment {} at {}",
            reference_number, self.config.check_payment_url
        );

        self.get_envelope(
            &self.config.check_payment_url,
            Some((REFERENCE_NUMBER_PARAM, reference_number)),
            integration_key,
        )
        .await
    }

    async fn poll(&self, poll_url: &str, integration_key: &str) -> Result<Envelope> {
        let url = url::Url::parse(poll_url)
            .map_err(|e| PesepayError::config(format!("Invalid poll URL '{}': {}", poll_url, e)))?;
        info!("Polling payment at {}", url);

        self.get_envelope(url.as_str(), None, integration_key).await
    }
}

/// Turn a response into an envelope, separating status failures from bodies
/// that are not envelopes.
async fn read_envelope(response: Response) -> Result<Envelope> {
    let status = response.status();
    debug!("Payment service responded with status {}", status);

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!("Payment service returned {}: {}", status, body);
        return Err(PesepayError::status(status.as_u16(), body));
    }

    let body = response.text().await?;
    serde_json::from_str::<Envelope>(&body).map_err(|e| {
        PesepayError::malformed_response(format!("expected a payload envelope: {}", e))
    })
}
