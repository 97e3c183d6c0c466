//! Payment client composing the envelope codec and the transport

use crate::config::PesepayConfig;
use crate::crypto::{self, EncryptionKey};
use crate::transport::{HttpTransport, Transport};
use crate::types::{Envelope, PaymentRequest, TransactionDetails};
use crate::Result;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Client for initiating and checking Pesepay payments
///
/// Holds no per-call state; clones share the same transport and can be used
/// from concurrent tasks.
#[derive(Clone)]
pub struct PesepayClient {
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for PesepayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PesepayClient")
            .field("transport", &"<dyn Transport>")
            .finish()
    }
}

impl PesepayClient {
    /// Create a client for the production endpoints
    pub fn new() -> Result<Self> {
        Self::with_config(PesepayConfig::default())
    }

    /// Create a client with custom configuration
    pub fn with_config(config: PesepayConfig) -> Result<Self> {
        Ok(Self::with_transport(Arc::new(HttpTransport::new(config)?)))
    }

    /// Create a client over any transport
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Initiate a payment
    ///
    /// Every failure, whether a bad key, an unreachable service, an error
    /// status or an unreadable response, is logged and returned as `None`.
    /// Use [`try_make_payment`](Self::try_make_payment) to tell them apart.
    pub async fn make_payment(
        &self,
        request: &PaymentRequest,
        encryption_key: &str,
        integration_key: &str,
    ) -> Option<TransactionDetails> {
        match self
            .try_make_payment(request, encryption_key, integration_key)
            .await
        {
            Ok(details) => Some(details),
            Err(e) => {
                error!("Error making payment: {}", e);
                None
            }
        }
    }

    /// Check a payment by reference number
    ///
    /// Transport failures are returned as errors so that pollers can decide
    /// whether to keep going. A response that cannot be decrypted or parsed,
    /// including because the encryption key is malformed, yields `Ok(None)`.
    pub async fn check_payment(
        &self,
        reference_number: &str,
        encryption_key: &str,
        integration_key: &str,
    ) -> Result<Option<TransactionDetails>> {
        payload_failure_as_none(
            self.try_check_payment(reference_number, encryption_key, integration_key)
                .await,
        )
    }

    /// Check a payment through the poll URL returned at initiation, with the
    /// same error policy as [`check_payment`](Self::check_payment)
    pub async fn poll_payment(
        &self,
        poll_url: &str,
        encryption_key: &str,
        integration_key: &str,
    ) -> Result<Option<TransactionDetails>> {
        payload_failure_as_none(
            self.try_poll_payment(poll_url, encryption_key, integration_key)
                .await,
        )
    }

    /// Initiate a payment, reporting exactly what went wrong
    pub async fn try_make_payment(
        &self,
        request: &PaymentRequest,
        encryption_key: &str,
        integration_key: &str,
    ) -> Result<TransactionDetails> {
        let key = EncryptionKey::new(encryption_key)?;
        let envelope = crypto::encrypt_envelope(request, &key)?;

        let response = self
            .transport
            .initiate_payment(&envelope, integration_key)
            .await?;

        let details = crypto::try_decrypt(&response.payload, &key)?;
        info!(
            "Payment initiated with reference {}",
            details.reference_number.as_deref().unwrap_or("<none>")
        );
        Ok(details)
    }

    /// Check a payment by reference number, reporting exactly what went wrong
    pub async fn try_check_payment(
        &self,
        reference_number: &str,
        encryption_key: &str,
        integration_key: &str,
    ) -> Result<TransactionDetails> {
        let response = self
            .transport
            .check_payment(reference_number, integration_key)
            .await?;
        open(&response, encryption_key)
    }

    /// Check a payment through its poll URL, reporting exactly what went wrong
    pub async fn try_poll_payment(
        &self,
        poll_url: &str,
        encryption_key: &str,
        integration_key: &str,
    ) -> Result<TransactionDetails> {
        let response = self.transport.poll(poll_url, integration_key).await?;
        open(&response, encryption_key)
    }
}

fn open(envelope: &Envelope, encryption_key: &str) -> Result<TransactionDetails> {
    let key = EncryptionKey::new(encryption_key)?;
    crypto::try_decrypt(&envelope.payload, &key)
}

fn payload_failure_as_none(
    result: Result<TransactionDetails>,
) -> Result<Option<TransactionDetails>> {
    match result {
        Ok(details) => Ok(Some(details)),
        Err(e) if e.is_payload() => {
            warn!("Could not interpret payment status response: {}", e);
            Ok(None)
        }
        Err(e) => {
            error!("Error checking payment status: {}", e);
            Err(e)
        }
    }
}

/// Initiate a payment against the production endpoints
///
/// See [`PesepayClient::make_payment`].
pub async fn make_payment(
    request: &PaymentRequest,
    encryption_key: &str,
    integration_key: &str,
) -> Option<TransactionDetails> {
    match PesepayClient::new() {
        Ok(client) => {
            client
                .make_payment(request, encryption_key, integration_key)
                .await
        }
        Err(e) => {
            error!("Error making payment: {}", e);
            None
        }
    }
}

/// Check a payment against the production endpoints
///
/// See [`PesepayClient::check_payment`].
pub async fn check_payment(
    reference_number: &str,
    encryption_key: &str,
    integration_key: &str,
) -> Result<Option<TransactionDetails>> {
    PesepayClient::new()?
        .check_payment(reference_number, encryption_key, integration_key)
        .await
}
