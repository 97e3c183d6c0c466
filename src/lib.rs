//! # pesepay - Pesepay payment client
//!
//! A Rust client for the Pesepay payment-initiation API. Payment requests are
//! encrypted with the merchant's shared encryption key, sent in a
//! `{"payload": ...}` envelope with the integration key as authorization, and
//! the service's encrypted answer is decrypted into [`TransactionDetails`].
//!
//! The top-level [`encrypt`], [`decrypt`], [`make_payment`] and
//! [`check_payment`] functions take keys as plain strings and use the
//! production endpoints. [`PesepayClient`] allows custom endpoints and
//! transports.

pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use client::{check_payment, make_payment, PesepayClient};
pub use config::PesepayConfig;
pub use crypto::EncryptionKey;
pub use error::{PesepayError, Result};
pub use transport::{HttpTransport, Transport};
pub use types::*;

/// Current version of the pesepay library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Encrypt a payment request with the shared encryption key
pub fn encrypt(request: &PaymentRequest, encryption_key: &str) -> Result<String> {
    crypto::encrypt(request, &EncryptionKey::new(encryption_key)?)
}

/// Decrypt a response payload with the shared encryption key
///
/// Returns `None` if the key is malformed or the payload cannot be decrypted
/// into a JSON record.
pub fn decrypt(ciphertext: &str, encryption_key: &str) -> Option<TransactionDetails> {
    match EncryptionKey::new(encryption_key) {
        Ok(key) => crypto::decrypt(ciphertext, &key),
        Err(e) => {
            tracing::warn!("Error decrypting payload: {}", e);
            None
        }
    }
}
