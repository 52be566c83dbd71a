/*!
# Overview
s3purge-rs deletes large numbers of Amazon S3 objects with the DeleteObjects
API, up to 1000 keys per request.

Candidates are pulled from a source (a fixed list, or a paginated bucket
listing), grouped into batches that share a bucket and the same
request-level flags (MFA, request payer), and deleted batch by batch.
Every failure is kept: transport failures, per-key failures reported by S3,
failing post-delete hooks and listing failures all end up in one
[`BatchDeleteError`](types::error::BatchDeleteError).

## As a Library
The `s3purge` CLI is a thin wrapper over this crate.

```toml
[dependencies]
s3purge-rs = "0.1"
tokio = { version = "1", features = ["full"] }
```

Purging a prefix:

```no_run
use s3purge_rs::config::args::parse_from_args;
use s3purge_rs::{BucketRemover, Config, create_pipeline_cancellation_token};

#[tokio::main]
async fn main() {
    let args = vec!["s3purge", "s3://my-bucket/prefix/", "--dry-run"];

    let config = Config::try_from(parse_from_args(args).unwrap()).unwrap();
    let remover = BucketRemover::new(config, create_pipeline_cancellation_token()).await;

    if let Err(e) = remover.remove().await {
        eprintln!("{e:#}");
    }
}
```

Deleting an explicit list of keys, with a hook per key:

```no_run
use s3purge_rs::source::StaticCandidateSource;
use s3purge_rs::storage::create_storage;
use s3purge_rs::types::DeletionCandidate;
use s3purge_rs::{BatchDeleter, Config, create_pipeline_cancellation_token};

#[tokio::main]
async fn main() {
    let config = Config::for_target("my-bucket", "");
    let storage = create_storage(&config).await;
    let deleter = BatchDeleter::new(storage, create_pipeline_cancellation_token());

    let mut source = StaticCandidateSource::new(vec![
        DeletionCandidate::new("my-bucket", "a.txt").with_post_hook(|| {
            println!("a.txt processed");
            Ok(())
        }),
        DeletionCandidate::new("my-bucket", "b.txt").with_version_id("3HL4kqtJlcpXroDTDmJ"),
    ]);

    if let Err(e) = deleter.delete_all(&mut source).await {
        for failure in e.errors() {
            eprintln!("{failure}");
        }
    }
}
```
*/

pub mod assembler;
pub mod classifier;
pub mod config;
pub mod deleter;
pub mod remover;
pub mod source;
pub mod storage;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;

pub use assembler::{BatchAssembler, MAX_BATCH_SIZE};
pub use classifier::{ErrorClass, ErrorClassifier, S3ErrorClassifier, StrictClassifier};
pub use config::Config;
pub use config::args::{CLIArgs, build_config_from_args, parse_from_args};
pub use deleter::BatchDeleter;
pub use remover::BucketRemover;
pub use source::{CandidateSource, PaginatedCandidateSource, StaticCandidateSource};
pub use types::error::{
    BatchDeleteError, CandidateError, FailureKind, S3purgeError, exit_code_from_error,
    is_cancelled_error,
};
pub use types::token::{PipelineCancellationToken, create_pipeline_cancellation_token};
pub use types::{DeletionCandidate, DeletionStats};
