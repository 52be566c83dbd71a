use anyhow::Result;
use async_trait::async_trait;
use dyn_clone::DynClone;
use leaky_bucket::RateLimiter;
use std::sync::Arc;
use tracing::warn;

use crate::config::Config;
use crate::types::{BatchRequest, ContinuationToken, KeyError, ListPage, ListingMode};

pub mod s3;

/// Type alias for a boxed Storage trait object.
pub type Storage = Box<dyn StorageTrait + Send + Sync>;

/// Remote capabilities needed to purge a bucket.
///
/// Implementations perform exactly one remote call per method invocation and
/// never retry on their own; retries belong to the SDK client configuration.
#[async_trait]
pub trait StorageTrait: DynClone {
    /// Fetch one listing page of `container` under `prefix`.
    ///
    /// `token` is `None` for the first page. The returned page carries the
    /// token of the following page, or `None` when the listing is complete.
    async fn list_page(
        &self,
        container: &str,
        prefix: &str,
        mode: ListingMode,
        max_keys: i32,
        token: Option<ContinuationToken>,
    ) -> Result<ListPage>;

    /// Delete every member of `request` in a single DeleteObjects call.
    ///
    /// `Err` means the call itself failed and no member can be assumed
    /// deleted. `Ok` carries the keys the server reported as not deleted;
    /// every other member was deleted.
    async fn delete_batch(&self, request: &BatchRequest) -> Result<Vec<KeyError>>;

    /// Delete an (empty) bucket.
    async fn delete_bucket(&self, container: &str) -> Result<()>;
}

dyn_clone::clone_trait_object!(StorageTrait);

// Default refill interval 100ms
const REFILL_PER_INTERVAL_DIVIDER: usize = 10;

/// Build the objects-per-second rate limiter configured by `rate_limit_objects`.
///
/// A limit of 0 would never grant a token, so it is ignored.
pub fn create_rate_limiter(rate_limit_objects: Option<u32>) -> Option<Arc<RateLimiter>> {
    if rate_limit_objects == Some(0) {
        warn!("rate limit of 0 objects per second ignored.");
        return None;
    }

    rate_limit_objects.map(|rate_limit_value| {
        let refill = if (rate_limit_value as usize) <= REFILL_PER_INTERVAL_DIVIDER {
            1
        } else {
            rate_limit_value as usize / REFILL_PER_INTERVAL_DIVIDER
        };
        Arc::new(
            RateLimiter::builder()
                .max(rate_limit_value as usize)
                .initial(rate_limit_value as usize)
                .refill(refill)
                .fair(true)
                .build(),
        )
    })
}

/// Create the S3 storage used to purge the configured target.
pub async fn create_storage(config: &Config) -> Storage {
    let client_config = config.target_client_config.clone().unwrap_or_default();
    let rate_limit_objects_per_sec = create_rate_limiter(config.rate_limit_objects);

    s3::S3StorageFactory::create(&client_config, rate_limit_objects_per_sec).await
}
