//! Tests for DynamoDB item mapping

use super::*;

fn inception() -> Movie {
    Movie {
        id: MovieId::new("01ARZ3NDEKTSV4RRFFQ69G5FAV"),
        title: "Inception".to_string(),
        year: 2010,
    }
}

#[test]
fn test_movie_to_item_layout() {
    let item = movie_to_item(&inception());

    assert_eq!(item.len(), 3);
    assert_eq!(
        item.get("id"),
        Some(&AttributeValue::S("01ARZ3NDEKTSV4RRFFQ69G5FAV".to_string()))
    );
    assert_eq!(
        item.get("title"),
        Some(&AttributeValue::S("Inception".to_string()))
    );
    assert_eq!(item.get("year"), Some(&AttributeValue::N("2010".to_string())));
}

#[test]
fn test_item_to_movie_reads_stored_item() {
    let movie = inception();
    let item = movie_to_item(&movie);

    let decoded = item_to_movie(&movie.id, &item).expect("item should decode");

    assert_eq!(decoded, movie);
}

#[test]
fn test_item_to_movie_missing_year_is_malformed() {
    let movie = inception();
    let mut item = movie_to_item(&movie);
    item.remove("year");

    let result = item_to_movie(&movie.id, &item);

    match result {
        Err(StoreError::Malformed { id, message }) => {
            assert_eq!(id, "01ARZ3NDEKTSV4RRFFQ69G5FAV");
            assert!(message.contains("year"));
        }
        other => panic!("expected malformed error, got {:?}", other),
    }
}

#[test]
fn test_item_to_movie_wrong_attribute_type_is_malformed() {
    let movie = inception();
    let mut item = movie_to_item(&movie);
    item.insert("year".to_string(), AttributeValue::S("2010".to_string()));

    let result = item_to_movie(&movie.id, &item);

    assert!(matches!(result, Err(StoreError::Malformed { .. })));
}

#[test]
fn test_item_to_movie_non_integer_year_is_malformed() {
    let movie = inception();
    let mut item = movie_to_item(&movie);
    item.insert("year".to_string(), AttributeValue::N("2010.5".to_string()));

    let result = item_to_movie(&movie.id, &item);

    assert!(matches!(result, Err(StoreError::Malformed { .. })));
}

// ============================================================================
// Client Construction
// ============================================================================

#[tokio::test]
#[serial_test::serial]
async fn test_new_without_region_uses_sdk_default_chain() {
    std::env::set_var("AWS_REGION", "eu-west-1");

    let store = DynamoDbMovieStore::new(
        None,
        "movies".to_string(),
        Some("http://localhost:8000".to_string()),
    )
    .await;

    std::env::remove_var("AWS_REGION");
    assert_eq!(
        store.client.config().region().map(|r| r.as_ref().to_string()),
        Some("eu-west-1".to_string())
    );
}

#[tokio::test]
#[serial_test::serial]
async fn test_new_with_region_overrides_sdk_default_chain() {
    std::env::set_var("AWS_REGION", "eu-west-1");

    let store = DynamoDbMovieStore::new(
        Some("us-west-2".to_string()),
        "movies".to_string(),
        Some("http://localhost:8000".to_string()),
    )
    .await;

    std::env::remove_var("AWS_REGION");
    assert_eq!(
        store.client.config().region().map(|r| r.as_ref().to_string()),
        Some("us-west-2".to_string())
    );
}
