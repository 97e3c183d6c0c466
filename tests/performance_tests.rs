//! Performance and concurrency tests for pesepay

use mockito::Server;
use pesepay::{
    crypto::{self, EncryptionKey},
    types::*,
    PesepayClient, PesepayConfig,
};
use rust_decimal::Decimal;
use serde_json::json;
use std::time::Instant;

const ENCRYPTION_KEY: &str = "0123456789abcdef0123456789abcdef";

#[tokio::test]
async fn test_encryption_performance() {
    let iterations = 1000;
    let key = EncryptionKey::new(ENCRYPTION_KEY).unwrap();
    let request = create_test_payment_request(1);
    let start = Instant::now();

    for _ in 0..iterations {
        let _ciphertext = crypto::encrypt(&request, &key).unwrap();
    }

    let duration = start.elapsed();
    let avg_time = duration.as_nanos() / iterations as u128;

    println!("Envelope encryption: {}ns per operation", avg_time);
    assert!(avg_time < 10_000_000); // Should be under 10ms per operation
}

#[tokio::test]
async fn test_decryption_performance() {
    let iterations = 1000;
    let key = EncryptionKey::new(ENCRYPTION_KEY).unwrap();
    let ciphertext = crypto::encrypt(&create_test_payment_request(1), &key).unwrap();
    let start = Instant::now();

    for _ in 0..iterations {
        let _details = crypto::decrypt(&ciphertext, &key).unwrap();
    }

    let duration = start.elapsed();
    let avg_time = duration.as_nanos() / iterations as u128;

    println!("Envelope decryption: {}ns per operation", avg_time);
    assert!(avg_time < 10_000_000); // Should be under 10ms per operation
}

#[tokio::test]
async fn test_concurrent_payments() {
    use tokio::task;

    let concurrency = 10;
    let mut server = Server::new_async().await;
    let key = EncryptionKey::new(ENCRYPTION_KEY).unwrap();
    let body = json!({
        "payload": crypto::encrypt(
            &json!({"referenceNumber": "REF", "transactionStatus": "INITIATED"}),
            &key,
        )
        .unwrap()
    })
    .to_string();

    let mock = server
        .mock("POST", "/api/payments-engine/v1/payments/initiate")
        .with_status(200)
        .with_body(body)
        .expect(concurrency)
        .create_async()
        .await;

    let client =
        PesepayClient::with_config(PesepayConfig::with_base_url(&server.url())).unwrap();

    let handles: Vec<_> = (0..concurrency)
        .map(|i| {
            let client = client.clone();
            task::spawn(async move {
                client
                    .make_payment(&create_test_payment_request(i), ENCRYPTION_KEY, "int-key")
                    .await
            })
        })
        .collect();

    for handle in handles {
        let details = handle.await.unwrap().unwrap();
        assert_eq!(details.transaction_status, Some(TransactionStatus::Initiated));
    }

    mock.assert_async().await;
}

fn create_test_payment_request(order: usize) -> PaymentRequest {
    PaymentRequest::new(
        Decimal::new(2500, 2),
        "USD",
        format!("Order #{}", order),
        "https://merchant.example/result",
        "https://merchant.example/return",
    )
}
