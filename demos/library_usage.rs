//! Example: Using s3purge-rs as a library.
//!
//! Deletes an explicit list of keys with a post-delete hook per key, then
//! purges a prefix the same way the `s3purge` binary does.
//!
//! Run with:
//! ```sh
//! cargo run --example library_usage -- s3://my-bucket/tmp/ --dry-run
//! ```

use std::sync::{Arc, Mutex};

use s3purge_rs::storage::create_storage;
use s3purge_rs::types::DeletionCandidate;
use s3purge_rs::{
    BatchDeleter, BucketRemover, S3ErrorClassifier, StaticCandidateSource,
    build_config_from_args, create_pipeline_cancellation_token,
};

#[tokio::main]
async fn main() {
    let config = match build_config_from_args(std::env::args()) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("{message}");
            std::process::exit(2);
        }
    };
    let (bucket, prefix) = config.target_location();
    let (bucket, prefix) = (bucket.to_string(), prefix.to_string());

    // Explicit candidates, with a hook recording each confirmed key.
    let confirmed = Arc::new(Mutex::new(Vec::new()));
    let candidates = ["marker-1", "marker-2"]
        .into_iter()
        .map(|name| {
            let key = format!("{prefix}{name}");
            let confirmed = confirmed.clone();
            let hook_key = key.clone();
            DeletionCandidate::new(bucket.as_str(), key).with_post_hook(move || {
                if let Ok(mut confirmed) = confirmed.lock() {
                    confirmed.push(hook_key);
                }
                Ok(())
            })
        })
        .collect();
    let mut source = StaticCandidateSource::new(candidates);

    let deleter = BatchDeleter::from_config(
        create_storage(&config).await,
        &config,
        create_pipeline_cancellation_token(),
    )
    .with_classifier(S3ErrorClassifier);

    if let Err(e) = deleter.delete_all(&mut source).await {
        for error in e.errors() {
            eprintln!("  FAILED: {error}");
        }
    }
    if let Ok(confirmed) = confirmed.lock() {
        println!("confirmed: {:?}", *confirmed);
    }

    // Everything else under the prefix.
    let remover = BucketRemover::new(config, create_pipeline_cancellation_token()).await;
    match remover.remove().await {
        Ok(stats) => println!(
            "deleted {} objects in {} batches",
            stats.deleted, stats.batches
        ),
        Err(e) => eprintln!("purge failed: {e:#}"),
    }
}
