//! Tests for the provider factory and shared request checks.

use super::*;
use crate::error::ConfigurationError;
use crate::provider::{AwsSqsConfig, InMemoryConfig};

#[tokio::test]
async fn test_factory_creates_in_memory_provider() {
    let provider = QueueClientFactory::create_provider(ProviderConfig::InMemory(
        InMemoryConfig::default(),
    ))
    .await
    .unwrap();

    assert_eq!(provider.provider_type(), ProviderType::InMemory);
    assert_eq!(provider.max_batch_size(), 100);
}

#[tokio::test]
async fn test_factory_rejects_empty_in_memory_queue() {
    let result = QueueClientFactory::create_provider(ProviderConfig::InMemory(InMemoryConfig {
        max_queue_size: 0,
        ..InMemoryConfig::default()
    }))
    .await;

    assert!(matches!(
        result,
        Err(QueueError::ConfigurationError(ConfigurationError::Invalid { .. }))
    ));
}

#[tokio::test]
async fn test_factory_rejects_blank_sqs_region() {
    let result = QueueClientFactory::create_provider(ProviderConfig::AwsSqs(AwsSqsConfig {
        region: Some(String::new()),
        ..AwsSqsConfig::default()
    }))
    .await;

    match result {
        Err(QueueError::ConfigurationError(ConfigurationError::Missing { key })) => {
            assert_eq!(key, "region")
        }
        Err(other) => panic!("expected missing region, got {:?}", other),
        Ok(_) => panic!("expected missing region"),
    }
}

/// Verify the provider contract through the trait object: send, receive,
/// complete, then nothing left to receive.
#[tokio::test]
async fn test_provider_contract_through_trait_object() {
    // Arrange
    let provider = QueueClientFactory::create_test_provider();
    let queue = QueueName::new("contract-test").unwrap();

    // Act
    let sent = provider
        .send_message(&queue, &Message::new("contract"))
        .await
        .unwrap();
    let received = provider
        .receive_messages(&queue, 10, Duration::ZERO)
        .await
        .unwrap();
    provider
        .complete_message(&received[0].receipt_handle)
        .await
        .unwrap();

    // Assert
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].message_id, sent);
    let remaining = provider
        .receive_messages(&queue, 10, Duration::ZERO)
        .await
        .unwrap();
    assert!(remaining.is_empty());
}

#[test]
fn test_check_batch_size_bounds() {
    assert!(check_batch_size(ProviderType::AwsSqs, 1).is_ok());
    assert!(check_batch_size(ProviderType::AwsSqs, 10).is_ok());
    assert!(check_batch_size(ProviderType::AwsSqs, 0).is_err());
    assert!(check_batch_size(ProviderType::AwsSqs, 11).is_err());
}

#[test]
fn test_check_message_size_limit() {
    let within = Message::new(vec![b'a'; 1024]);
    let over = Message::new(vec![b'a'; 256 * 1024 + 1]);

    assert!(check_message_size(ProviderType::AwsSqs, &within).is_ok());
    assert!(matches!(
        check_message_size(ProviderType::AwsSqs, &over),
        Err(QueueError::MessageTooLarge { size, max_size }) if size == 256 * 1024 + 1 && max_size == 256 * 1024
    ));
}
