//! # DynamoDB Movie Store
//!
//! Record store backed by a DynamoDB table keyed on the string attribute
//! `id`.
//!
//! ## Item Layout
//!
//! ```text
//! id:    S  movie identifier (partition key)
//! title: S
//! year:  N
//! ```
//!
//! Writes are plain `PutItem` calls without condition expressions. The table
//! must already exist; this adapter never creates or alters it.

use crate::store::{MovieStore, StoreError};
use crate::{Movie, MovieId};
use async_trait::async_trait;
use aws_sdk_dynamodb::{
    error::{DisplayErrorContext, SdkError},
    types::AttributeValue,
    Client as DynamoDbClient,
};
use std::collections::HashMap;
use tracing::{debug, instrument};

#[cfg(test)]
#[path = "dynamodb_store_tests.rs"]
mod tests;

const ID_ATTRIBUTE: &str = "id";
const TITLE_ATTRIBUTE: &str = "title";
const YEAR_ATTRIBUTE: &str = "year";

/// DynamoDB record store
///
/// ## Example
///
/// ```rust,no_run
/// use movies_core::adapters::DynamoDbMovieStore;
///
/// # async fn example() {
/// let store = DynamoDbMovieStore::new(
///     Some("us-east-1".to_string()),
///     "movies".to_string(),
///     Some("http://localhost:8000".to_string()), // DynamoDB Local
/// )
/// .await;
/// # }
/// ```
#[derive(Clone)]
pub struct DynamoDbMovieStore {
    client: DynamoDbClient,
    table_name: String,
}

impl DynamoDbMovieStore {
    /// Create a store using the default AWS credential chain
    ///
    /// The region falls back to the SDK default chain when `region` is
    /// `None`. `endpoint_url` overrides the service endpoint, for DynamoDB
    /// Local or LocalStack.
    #[instrument(skip(endpoint_url))]
    pub async fn new(
        region: Option<String>,
        table_name: String,
        endpoint_url: Option<String>,
    ) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());

        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region));
        }

        if let Some(endpoint) = endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        let config = loader.load().await;
        debug!(
            table_name = %table_name,
            region = ?config.region(),
            "DynamoDB movie store initialized"
        );

        Self::from_client(DynamoDbClient::new(&config), table_name)
    }

    /// Create a store from an existing client
    pub fn from_client(client: DynamoDbClient, table_name: String) -> Self {
        Self { client, table_name }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

#[async_trait]
impl MovieStore for DynamoDbMovieStore {
    #[instrument(skip(self, movie), fields(table_name = %self.table_name, movie_id = %movie.id))]
    async fn put(&self, movie: &Movie) -> Result<(), StoreError> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(movie_to_item(movie)))
            .send()
            .await
            .map_err(map_sdk_error)?;

        debug!("Stored movie item");
        Ok(())
    }

    #[instrument(skip(self), fields(table_name = %self.table_name))]
    async fn get(&self, id: &MovieId) -> Result<Option<Movie>, StoreError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(ID_ATTRIBUTE, AttributeValue::S(id.as_str().to_string()))
            .send()
            .await
            .map_err(map_sdk_error)?;

        match output.item() {
            Some(item) => item_to_movie(id, item).map(Some),
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for DynamoDbMovieStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamoDbMovieStore")
            .field("table_name", &self.table_name)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Item Mapping
// ============================================================================

pub(crate) fn movie_to_item(movie: &Movie) -> HashMap<String, AttributeValue> {
    HashMap::from([
        (
            ID_ATTRIBUTE.to_string(),
            AttributeValue::S(movie.id.as_str().to_string()),
        ),
        (
            TITLE_ATTRIBUTE.to_string(),
            AttributeValue::S(movie.title.clone()),
        ),
        (
            YEAR_ATTRIBUTE.to_string(),
            AttributeValue::N(movie.year.to_string()),
        ),
    ])
}

pub(crate) fn item_to_movie(
    requested: &MovieId,
    item: &HashMap<String, AttributeValue>,
) -> Result<Movie, StoreError> {
    let malformed = |message: String| StoreError::Malformed {
        id: requested.to_string(),
        message,
    };

    let string_attribute = |name: &str| -> Result<String, StoreError> {
        item.get(name)
            .ok_or_else(|| malformed(format!("missing attribute '{}'", name)))?
            .as_s()
            .map(|s| s.to_string())
            .map_err(|_| malformed(format!("attribute '{}' is not a string", name)))
    };

    let id = string_attribute(ID_ATTRIBUTE)?;
    let title = string_attribute(TITLE_ATTRIBUTE)?;

    let year = item
        .get(YEAR_ATTRIBUTE)
        .ok_or_else(|| malformed(format!("missing attribute '{}'", YEAR_ATTRIBUTE)))?
        .as_n()
        .map_err(|_| malformed(format!("attribute '{}' is not a number", YEAR_ATTRIBUTE)))?
        .parse::<i32>()
        .map_err(|e| malformed(format!("attribute '{}' is not an integer: {}", YEAR_ATTRIBUTE, e)))?;

    Ok(Movie {
        id: MovieId::new(id),
        title,
        year,
    })
}

fn map_sdk_error<E, R>(error: SdkError<E, R>) -> StoreError
where
    E: std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    let message = DisplayErrorContext(&error).to_string();
    match error {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            StoreError::Unavailable { message }
        }
        _ => StoreError::Rejected { message },
    }
}
