//! Envelope encryption for Pesepay payloads
//!
//! Payloads are serialized to compact JSON, encrypted with AES in CBC mode
//! with PKCS#7 padding and carried as standard base64. The AES key is the raw
//! UTF-8 bytes of the shared encryption key and the IV is its first 16 bytes,
//! so equal payloads under the same key always produce equal ciphertext. The
//! service expects exactly this layout.

use crate::types::{Envelope, TransactionDetails};
use crate::{PesepayError, Result};
use aes::{Aes128, Aes192, Aes256};
use base64::{engine::general_purpose::STANDARD, Engine};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// AES block size, which is also the IV length
pub const BLOCK_SIZE: usize = 16;

/// Shared secret used to encrypt and decrypt payloads
///
/// Valid lengths are 16, 24 and 32 bytes (AES-128/192/256).
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey {
    bytes: Vec<u8>,
}

impl EncryptionKey {
    /// Create a key from the secret issued by the service
    pub fn new(key: impl AsRef<str>) -> Result<Self> {
        let bytes = key.as_ref().as_bytes();
        match bytes.len() {
            16 | 24 | 32 => Ok(Self {
                bytes: bytes.to_vec(),
            }),
            len => Err(PesepayError::invalid_key(format!(
                "expected 16, 24 or 32 bytes (an AES-128, AES-192 or AES-256 key), got {}",
                len
            ))),
        }
    }

    /// Key length in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; empty keys are rejected at construction
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn iv(&self) -> &[u8] {
        &self.bytes[..BLOCK_SIZE]
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("len", &self.bytes.len())
            .field("bytes", &"<redacted>")
            .finish()
    }
}

impl FromStr for EncryptionKey {
    type Err = PesepayError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<&str> for EncryptionKey {
    type Error = PesepayError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

/// Encrypt a payload into base64 ciphertext
pub fn encrypt<T>(payload: &T, key: &EncryptionKey) -> Result<String>
where
    T: Serialize + ?Sized,
{
    let plaintext = serde_json::to_vec(payload)?;
    let ciphertext = encrypt_bytes(&plaintext, key)?;
    debug!(
        plaintext_len = plaintext.len(),
        ciphertext_len = ciphertext.len(),
        "Encrypted payload"
    );
    Ok(STANDARD.encode(ciphertext))
}

/// Encrypt a payload and wrap it for the wire
pub fn encrypt_envelope<T>(payload: &T, key: &EncryptionKey) -> Result<Envelope>
where
    T: Serialize + ?Sized,
{
    encrypt(payload, key).map(Envelope::new)
}

/// Decrypt base64 ciphertext into any deserializable type
pub fn decrypt_as<T>(ciphertext: &str, key: &EncryptionKey) -> Result<T>
where
    T: DeserializeOwned,
{
    let bytes = STANDARD.decode(ciphertext.trim())?;
    let plaintext = decrypt_bytes(&bytes, key)?;
    Ok(serde_json::from_slice(&plaintext)?)
}

/// Decrypt a response payload, reporting why it failed
pub fn try_decrypt(ciphertext: &str, key: &EncryptionKey) -> Result<TransactionDetails> {
    decrypt_as(ciphertext, key)
}

/// Decrypt a response payload
///
/// Returns `None` when the payload cannot be interpreted: bad base64, a wrong
/// key, or plaintext that is not a JSON object. The record itself is not
/// validated.
pub fn decrypt(ciphertext: &str, key: &EncryptionKey) -> Option<TransactionDetails> {
    match try_decrypt(ciphertext, key) {
        Ok(details) => Some(details),
        Err(e) => {
            warn!("Error decrypting payload: {}", e);
            None
        }
    }
}

fn encrypt_bytes(plaintext: &[u8], key: &EncryptionKey) -> Result<Vec<u8>> {
    let (bytes, iv) = (key.bytes.as_slice(), key.iv());
    let invalid = |e: cbc::cipher::InvalidLength| PesepayError::encryption(e.to_string());

    let ciphertext = match bytes.len() {
        16 => cbc::Encryptor::<Aes128>::new_from_slices(bytes, iv)
            .map_err(invalid)?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        24 => cbc::Encryptor::<Aes192>::new_from_slices(bytes, iv)
            .map_err(invalid)?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        32 => cbc::Encryptor::<Aes256>::new_from_slices(bytes, iv)
            .map_err(invalid)?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        len => {
            return Err(PesepayError::invalid_key(format!(
                "unsupported key length {}",
                len
            )))
        }
    };

    Ok(ciphertext)
}

fn decrypt_bytes(ciphertext: &[u8], key: &EncryptionKey) -> Result<Vec<u8>> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(PesepayError::decryption(format!(
            "ciphertext length {} is not a positive multiple of {}",
            ciphertext.len(),
            BLOCK_SIZE
        )));
    }

    let (bytes, iv) = (key.bytes.as_slice(), key.iv());
    let invalid = |e: cbc::cipher::InvalidLength| PesepayError::decryption(e.to_string());
    let unpad = |_| PesepayError::decryption("invalid padding, the key is probably wrong");

    match bytes.len() {
        16 => cbc::Decryptor::<Aes128>::new_from_slices(bytes, iv)
            .map_err(invalid)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(unpad),
        24 => cbc::Decryptor::<Aes192>::new_from_slices(bytes, iv)
            .map_err(invalid)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(unpad),
        32 => cbc::Decryptor::<Aes256>::new_from_slices(bytes, iv)
            .map_err(invalid)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(unpad),
        len => Err(PesepayError::invalid_key(format!(
            "unsupported key length {}",
            len
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PaymentRequest, TransactionStatus};
    use rust_decimal::Decimal;

    const KEY_128: &str = "0123456789abcdef";
    const KEY_256: &str = "0123456789abcdef0123456789abcdef";

    // Produced with `openssl enc -aes-128-cbc` over the request's JSON, key and IV
    // both set to KEY_128.
    const REQUEST_CIPHERTEXT: &str = "5ZrYyTwdofnQzT52a4WgHdFIkhBk+DJVedrY8rulBx7OMpID0r7TrVOWEKkNExoTuFhk8ODCwYTiUvSX4xbPoSnTXqo8Zc78YxAVInAGoLSIZyardeQ5ywDILw8Zp73Ns9+DNjS/1A9Y+wjq93fUfz+mKZ+BG9wvDDI6lrLQtaSbxWl4sXAxPHFaOxKLPYKw";

    // `openssl enc -aes-256-cbc`, key KEY_256, IV its first 16 bytes.
    const RESPONSE_CIPHERTEXT: &str = "R6jEfCYLRrhgng0xOZ2WnqNx/8tuGKVQyCFmz/DztuuI1EGuoMqU55ItACkab8CxffxfgrEbJUu2uZMxB0p5BR2J9/Avy3ORXP+QFGRMCMjwb4bAF2SB/U2rakUhPkMLsj2TupZmRC0lzFAW+6V4S3OqisE5D2IzKan4qdOwzHU=";

    // 30 characters, 32 bytes. The 16-byte IV ends inside "secrète".
    const KEY_MULTIBYTE: &str = "clé-pesepay-secrète-0123456789";

    // `openssl enc -aes-256-cbc` over
    // {"referenceNumber":"20240101-ABC","transactionStatus":"PENDING"},
    // key KEY_MULTIBYTE as UTF-8, IV its first 16 bytes.
    const MULTIBYTE_CIPHERTEXT: &str = "KEL8E2cqF9GYPdqabpQ9WX1Kq28A94X1E8ICJ7+2h9k8b4H7NkZbR7XVSYJnuAXLxW3MJop0dqzDJqKgt7B7LO0/Y7nBw0eWnU20ZPnxdsU=";

    fn test_request() -> PaymentRequest {
        PaymentRequest::new(
            Decimal::new(10, 0),
            "USD",
            "Order #1",
            "https://x/r",
            "https://x/b",
        )
    }

    #[test]
    fn test_key_length_validation() {
        assert!(EncryptionKey::new(KEY_128).is_ok());
        assert!(EncryptionKey::new("0123456789abcdef01234567").is_ok());
        assert!(EncryptionKey::new(KEY_256).is_ok());

        let error = EncryptionKey::new("short").unwrap_err();
        assert!(matches!(error, PesepayError::InvalidKey { .. }));
        assert!(error.to_string().contains("got 5"));

        let error = EncryptionKey::new("0123456789abcdef0123").unwrap_err();
        assert!(error.to_string().contains("AES-128, AES-192 or AES-256"));
        assert!(error.to_string().contains("got 20"));
        assert!(EncryptionKey::new("0123456789abcdef0").is_err());
        assert!("".parse::<EncryptionKey>().is_err());
    }

    #[test]
    fn test_key_debug_is_redacted() {
        let key = EncryptionKey::new(KEY_128).unwrap();
        let debug = format!("{:?}", key);
        assert!(!debug.contains(KEY_128));
        assert!(debug.contains("redacted"));
    }

    #[test]
    fn test_encrypt_matches_reference_ciphertext() {
        let key = EncryptionKey::new(KEY_128).unwrap();
        let ciphertext = encrypt(&test_request(), &key).unwrap();
        assert_eq!(ciphertext, REQUEST_CIPHERTEXT);
    }

    #[test]
    fn test_decrypt_reference_response() {
        let key = EncryptionKey::new(KEY_256).unwrap();
        let details = decrypt(RESPONSE_CIPHERTEXT, &key).unwrap();

        assert_eq!(details.reference_number.as_deref(), Some("20240101-ABC"));
        assert_eq!(details.transaction_status, Some(TransactionStatus::Success));
        assert_eq!(
            details.poll_url.as_deref(),
            Some("https://api.pesepay.com/poll/20240101-ABC")
        );
    }

    #[test]
    fn test_round_trip_restores_request() {
        for raw_key in [KEY_128, "0123456789abcdef01234567", KEY_256] {
            let key = EncryptionKey::new(raw_key).unwrap();
            let request = test_request().with_merchant_reference("M-1");
            let ciphertext = encrypt(&request, &key).unwrap();

            let restored: PaymentRequest = decrypt_as(&ciphertext, &key).unwrap();
            assert_eq!(restored, request);
        }
    }

    #[test]
    fn test_encrypt_is_deterministic() {
        let key = EncryptionKey::new(KEY_256).unwrap();
        let first = encrypt(&test_request(), &key).unwrap();
        let second = encrypt(&test_request(), &key).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_wrong_key_yields_none() {
        let key = EncryptionKey::new(KEY_128).unwrap();
        let other = EncryptionKey::new("fedcba9876543210").unwrap();
        let ciphertext = encrypt(&test_request(), &key).unwrap();

        assert!(decrypt(&ciphertext, &other).is_none());
        assert!(try_decrypt(&ciphertext, &other).unwrap_err().is_payload());
    }

    #[test]
    fn test_invalid_base64_yields_none() {
        let key = EncryptionKey::new(KEY_128).unwrap();
        assert!(decrypt("not-valid-base64", &key).is_none());
        assert!(matches!(
            try_decrypt("not-valid-base64", &key),
            Err(PesepayError::Base64(_))
        ));
    }

    #[test]
    fn test_truncated_ciphertext_yields_none() {
        let key = EncryptionKey::new(KEY_128).unwrap();
        let truncated = STANDARD.encode([0u8; 15]);
        assert!(matches!(
            try_decrypt(&truncated, &key),
            Err(PesepayError::Decryption { .. })
        ));
        assert!(decrypt("", &key).is_none());
    }

    #[test]
    fn test_non_json_plaintext_yields_none() {
        let key = EncryptionKey::new(KEY_128).unwrap();
        let ciphertext = STANDARD.encode(encrypt_bytes(b"<html>oops</html>", &key).unwrap());

        assert!(decrypt(&ciphertext, &key).is_none());
        assert!(matches!(
            try_decrypt(&ciphertext, &key),
            Err(PesepayError::Json(_))
        ));
    }

    #[test]
    fn test_partial_record_is_accepted() {
        let key = EncryptionKey::new(KEY_128).unwrap();
        let ciphertext = encrypt(&serde_json::json!({"unexpected": "shape"}), &key).unwrap();

        let details = decrypt(&ciphertext, &key).unwrap();
        assert!(details.reference_number.is_none());
        assert_eq!(details.extra["unexpected"], "shape");
    }

    #[test]
    fn test_multibyte_key_uses_leading_bytes_as_iv() {
        assert_eq!(KEY_MULTIBYTE.chars().count(), 30);
        let key = EncryptionKey::new(KEY_MULTIBYTE).unwrap();
        assert_eq!(key.len(), 32);
        assert_eq!(key.iv(), &KEY_MULTIBYTE.as_bytes()[..BLOCK_SIZE]);

        let record = serde_json::json!({
            "referenceNumber": "20240101-ABC",
            "transactionStatus": "PENDING"
        });
        assert_eq!(encrypt(&record, &key).unwrap(), MULTIBYTE_CIPHERTEXT);

        let details = decrypt(MULTIBYTE_CIPHERTEXT, &key).unwrap();
        assert_eq!(details.reference_number.as_deref(), Some("20240101-ABC"));
        assert_eq!(details.transaction_status, Some(TransactionStatus::Pending));
    }

    #[test]
    fn test_wrong_typed_fields_are_passed_through() {
        let key = EncryptionKey::new(KEY_128).unwrap();
        let ciphertext = encrypt(
            &serde_json::json!({
                "referenceNumber": "20240101-ABC",
                "id": "4242",
                "redirectRequired": "true",
                "transactionStatus": 7,
                "customer": {"contactNumbers": null, "email": "a@b.c"},
                "amountDetails": {"amount": "ten", "currencyCode": "USD"}
            }),
            &key,
        )
        .unwrap();

        let details = try_decrypt(&ciphertext, &key).unwrap();
        assert_eq!(details.reference_number.as_deref(), Some("20240101-ABC"));
        assert!(details.id.is_none());
        assert!(details.redirect_required.is_none());
        assert!(details.transaction_status.is_none());
        assert_eq!(details.extra["id"], "4242");
        assert_eq!(details.extra["redirectRequired"], "true");
        assert_eq!(details.extra["transactionStatus"], 7);

        let customer = details.customer.as_ref().unwrap();
        assert!(customer.contact_numbers.is_empty());
        assert_eq!(customer.email.as_deref(), Some("a@b.c"));

        let amount = details.amount_details.as_ref().unwrap();
        assert!(amount.amount.is_none());
        assert_eq!(amount.currency_code.as_deref(), Some("USD"));

        assert!(decrypt(&ciphertext, &key).is_some());
    }

    #[test]
    fn test_non_object_json_yields_none() {
        let key = EncryptionKey::new(KEY_128).unwrap();
        let ciphertext = encrypt(&serde_json::json!([1, 2, 3]), &key).unwrap();
        assert!(matches!(
            try_decrypt(&ciphertext, &key),
            Err(PesepayError::Json(_))
        ));
    }

    #[test]
    fn test_envelope_has_single_payload_field() {
        let key = EncryptionKey::new(KEY_128).unwrap();
        let envelope = encrypt_envelope(&test_request(), &key).unwrap();
        let value = serde_json::to_value(&envelope).unwrap();

        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 1);
        assert!(object["payload"].is_string());
        assert_eq!(object["payload"], REQUEST_CIPHERTEXT);
    }
}
