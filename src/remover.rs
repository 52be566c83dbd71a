//! Purge a bucket (or a prefix of it) and optionally delete the bucket.

use anyhow::{Context, Result, anyhow};
use tracing::{info, warn};

use crate::classifier::S3ErrorClassifier;
use crate::config::Config;
use crate::deleter::BatchDeleter;
use crate::source::PaginatedCandidateSource;
use crate::storage::{Storage, create_storage};
use crate::types::error::S3purgeError;
use crate::types::token::PipelineCancellationToken;
use crate::types::{DeletionStats, ListingMode, SharedFlags};

/// Lists the configured target and deletes everything under it.
///
/// Objects that are already gone (`NoSuchKey`, `NoSuchVersion`) do not count
/// as failures, so an interrupted purge can simply be run again.
///
/// # Example
///
/// ```no_run
/// use s3purge_rs::{BucketRemover, Config, create_pipeline_cancellation_token};
///
/// #[tokio::main]
/// async fn main() {
///     let config = Config::for_target("my-bucket", "logs/");
///     let remover = BucketRemover::new(config, create_pipeline_cancellation_token()).await;
///
///     match remover.remove().await {
///         Ok(stats) => println!("deleted {} objects", stats.deleted),
///         Err(e) => eprintln!("{e:#}"),
///     }
/// }
/// ```
pub struct BucketRemover {
    config: Config,
    target: Storage,
    cancellation_token: PipelineCancellationToken,
}

impl BucketRemover {
    /// Create a remover talking to S3 through the client described by
    /// `config.target_client_config`.
    pub async fn new(config: Config, cancellation_token: PipelineCancellationToken) -> Self {
        let target = create_storage(&config).await;
        Self::with_storage(config, target, cancellation_token)
    }

    pub fn with_storage(
        config: Config,
        target: Storage,
        cancellation_token: PipelineCancellationToken,
    ) -> Self {
        Self {
            config,
            target,
            cancellation_token,
        }
    }

    /// Run the purge.
    ///
    /// On failure the returned error carries [`S3purgeError::Cancelled`] or
    /// [`S3purgeError::PartialFailure`] (objects left behind) or
    /// [`S3purgeError::Incomplete`] (listing or hook failures only) as
    /// context, wrapping the
    /// [`BatchDeleteError`](crate::types::error::BatchDeleteError) with
    /// every individual failure.
    pub async fn remove(&self) -> Result<DeletionStats> {
        let (bucket, prefix) = self.config.target_location();
        let mode = if self.config.delete_all_versions {
            ListingMode::Versions
        } else {
            ListingMode::Objects
        };
        let shared_flags = SharedFlags::new(self.config.mfa.clone(), self.config.request_payer());

        let mut source = PaginatedCandidateSource::new(
            self.target.clone(),
            bucket,
            prefix,
            self.cancellation_token.clone(),
        )
        .with_mode(mode)
        .with_max_keys(self.config.max_keys)
        .with_shared_flags(shared_flags);

        let deleter = BatchDeleter::from_config(
            self.target.clone(),
            &self.config,
            self.cancellation_token.clone(),
        )
        .with_classifier(S3ErrorClassifier);

        info!(
            bucket = bucket,
            prefix = prefix,
            delete_all_versions = self.config.delete_all_versions,
            batch_size = deleter.max_batch_size(),
            dry_run = self.config.dry_run,
            "purge started."
        );

        let result = deleter.delete_all(&mut source).await;
        let stats = deleter.stats_report().snapshot();

        if let Err(e) = result {
            if e.is_cancelled() {
                warn!(
                    bucket = bucket,
                    deleted = stats.deleted,
                    "purge cancelled."
                );
                return Err(anyhow!(e).context(S3purgeError::Cancelled));
            }

            warn!(
                bucket = bucket,
                deleted = stats.deleted,
                failed = stats.failed,
                errors = e.errors().len(),
                "purge finished with failures."
            );
            let context = if stats.failed > 0 {
                S3purgeError::PartialFailure {
                    failed: stats.failed,
                }
            } else {
                S3purgeError::Incomplete {
                    errors: e.errors().len() as u64,
                }
            };
            return Err(anyhow!(e).context(context));
        }

        info!(
            bucket = bucket,
            prefix = prefix,
            batches = stats.batches,
            deleted = stats.deleted,
            "purge completed."
        );

        if self.config.delete_bucket {
            self.delete_bucket(bucket).await?;
        }

        Ok(stats)
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        if self.config.dry_run {
            info!(bucket = bucket, dry_run = true, "bucket deleted.");
            return Ok(());
        }

        self.target
            .delete_bucket(bucket)
            .await
            .with_context(|| format!("failed to delete bucket s3://{bucket}."))?;

        info!(bucket = bucket, "bucket deleted.");
        Ok(())
    }
}
