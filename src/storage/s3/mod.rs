pub mod client_builder;

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::delete_objects::DeleteObjectsOutput;
use aws_sdk_s3::operation::list_object_versions::ListObjectVersionsOutput;
use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Output;
use aws_sdk_s3::types::{Delete, ObjectIdentifier, RequestPayer};
use aws_smithy_types::error::metadata::ProvideErrorMetadata;
use leaky_bucket::RateLimiter;
use std::sync::Arc;

use crate::config::ClientConfig;
use crate::storage::{Storage, StorageTrait};
use crate::types::error::RemoteError;
use crate::types::{BatchRequest, ContinuationToken, KeyError, ListPage, ListingMode, ObjectEntry};

/// Extracts the S3 error code and message from an AWS SDK error.
///
/// Service errors yield the S3 error code (e.g. "AccessDenied") and the
/// message of the response. Anything else (dispatch failure, timeout) yields
/// "N/A" and the full error description.
fn extract_sdk_error_details<E: std::fmt::Display + ProvideErrorMetadata>(
    e: &SdkError<E>,
) -> (String, String) {
    if let Some(service_err) = e.as_service_error() {
        (
            service_err.code().unwrap_or("unknown").to_string(),
            service_err.message().unwrap_or("no message").to_string(),
        )
    } else {
        ("N/A".to_string(), e.to_string())
    }
}

/// Wrap an SDK error so callers can downcast the S3 error code.
///
/// Service errors get a [`RemoteError`] context on top of the SDK error;
/// transport errors keep only the operation context.
fn wrap_sdk_error<E>(e: SdkError<E>, operation: &str) -> anyhow::Error
where
    E: std::error::Error + ProvideErrorMetadata + Send + Sync + 'static,
{
    let remote_error = e.as_service_error().map(|service_err| {
        RemoteError::new(
            service_err.code().unwrap_or("unknown"),
            service_err.message().unwrap_or("no message"),
        )
    });

    let error = anyhow::Error::new(e).context(format!("aws_sdk_s3::client::{operation}() failed."));
    match remote_error {
        Some(remote_error) => error.context(remote_error),
        None => error,
    }
}

pub struct S3StorageFactory;

impl S3StorageFactory {
    pub async fn create(
        client_config: &ClientConfig,
        rate_limit_objects_per_sec: Option<Arc<RateLimiter>>,
    ) -> Storage {
        Box::new(S3Storage {
            client: Arc::new(client_config.create_client().await),
            request_payer: client_config.request_payer.clone(),
            rate_limit_objects_per_sec,
        })
    }
}

/// S3 implementation of the listing and DeleteObjects capabilities.
#[derive(Clone)]
struct S3Storage {
    client: Arc<Client>,
    // Applied to listing calls; deletes use the batch's own flags.
    request_payer: Option<RequestPayer>,
    rate_limit_objects_per_sec: Option<Arc<RateLimiter>>,
}

#[async_trait]
impl StorageTrait for S3Storage {
    async fn list_page(
        &self,
        container: &str,
        prefix: &str,
        mode: ListingMode,
        max_keys: i32,
        token: Option<ContinuationToken>,
    ) -> Result<ListPage> {
        self.exec_rate_limit_objects_per_sec().await;

        match mode {
            ListingMode::Objects => {
                self.list_objects_page(container, prefix, max_keys, token).await
            }
            ListingMode::Versions => {
                self.list_object_versions_page(container, prefix, max_keys, token)
                    .await
            }
        }
    }

    async fn delete_batch(&self, request: &BatchRequest) -> Result<Vec<KeyError>> {
        if request.is_empty() {
            return Ok(Vec::new());
        }

        let object_count = request.len();
        self.exec_rate_limit_objects_per_sec_n(object_count).await;

        let delete = build_delete(request)?;
        let output = self
            .client
            .delete_objects()
            .bucket(&request.container)
            .delete(delete)
            .set_mfa(request.shared_flags.mfa.clone())
            .set_request_payer(request.shared_flags.request_payer.clone())
            .send()
            .await
            .map_err(|e| {
                let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);
                tracing::error!(
                    bucket = request.container,
                    object_count = object_count,
                    s3_error_code = s3_error_code,
                    s3_error_message = s3_error_message,
                    "S3 DeleteObjects API call failed for {} objects in s3://{}: {} ({}).",
                    object_count,
                    request.container,
                    s3_error_code,
                    s3_error_message,
                );
                wrap_sdk_error(e, "delete_objects")
            })?;

        Ok(key_errors(&output))
    }

    async fn delete_bucket(&self, container: &str) -> Result<()> {
        self.client
            .delete_bucket()
            .bucket(container)
            .send()
            .await
            .map_err(|e| {
                let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);
                tracing::error!(
                    bucket = container,
                    s3_error_code = s3_error_code,
                    s3_error_message = s3_error_message,
                    "S3 DeleteBucket API call failed for s3://{}: {} ({}).",
                    container,
                    s3_error_code,
                    s3_error_message,
                );
                wrap_sdk_error(e, "delete_bucket")
            })?;

        Ok(())
    }
}

impl S3Storage {
    async fn list_objects_page(
        &self,
        container: &str,
        prefix: &str,
        max_keys: i32,
        token: Option<ContinuationToken>,
    ) -> Result<ListPage> {
        let continuation_token = match token {
            None => None,
            Some(ContinuationToken::Objects(token)) => Some(token),
            Some(other) => {
                return Err(anyhow::anyhow!(
                    "unexpected continuation token for ListObjectsV2: {other:?}"
                ));
            }
        };

        let output = self
            .client
            .list_objects_v2()
            .set_request_payer(self.request_payer.clone())
            .bucket(container)
            .prefix(prefix)
            .set_continuation_token(continuation_token)
            .max_keys(max_keys)
            .send()
            .await
            .map_err(|e| {
                let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);
                tracing::error!(
                    bucket = container,
                    prefix = prefix,
                    s3_error_code = s3_error_code,
                    s3_error_message = s3_error_message,
                    "S3 ListObjectsV2 API call failed for s3://{}/{}: {} ({}).",
                    container,
                    prefix,
                    s3_error_code,
                    s3_error_message,
                );
                wrap_sdk_error(e, "list_objects_v2")
            })?;

        Ok(objects_page(&output))
    }

    async fn list_object_versions_page(
        &self,
        container: &str,
        prefix: &str,
        max_keys: i32,
        token: Option<ContinuationToken>,
    ) -> Result<ListPage> {
        let (key_marker, version_id_marker) = match token {
            None => (None, None),
            Some(ContinuationToken::Versions {
                key_marker,
                version_id_marker,
            }) => (Some(key_marker), version_id_marker),
            Some(other) => {
                return Err(anyhow::anyhow!(
                    "unexpected continuation token for ListObjectVersions: {other:?}"
                ));
            }
        };

        let output = self
            .client
            .list_object_versions()
            .set_request_payer(self.request_payer.clone())
            .bucket(container)
            .prefix(prefix)
            .set_key_marker(key_marker)
            .set_version_id_marker(version_id_marker)
            .max_keys(max_keys)
            .send()
            .await
            .map_err(|e| {
                let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);
                tracing::error!(
                    bucket = container,
                    prefix = prefix,
                    s3_error_code = s3_error_code,
                    s3_error_message = s3_error_message,
                    "S3 ListObjectVersions API call failed for s3://{}/{}: {} ({}).",
                    container,
                    prefix,
                    s3_error_code,
                    s3_error_message,
                );
                wrap_sdk_error(e, "list_object_versions")
            })?;

        Ok(versions_page(&output))
    }

    async fn exec_rate_limit_objects_per_sec(&self) {
        if let Some(ref rate_limiter) = self.rate_limit_objects_per_sec {
            rate_limiter.acquire_one().await;
        }
    }

    /// Acquire one token per object of a DeleteObjects call.
    async fn exec_rate_limit_objects_per_sec_n(&self, count: usize) {
        if count == 0 {
            return;
        }
        if let Some(ref rate_limiter) = self.rate_limit_objects_per_sec {
            rate_limiter.acquire(count).await;
        }
    }
}

fn objects_page(output: &ListObjectsV2Output) -> ListPage {
    let items = output
        .contents()
        .iter()
        .filter_map(|object| object.key())
        .map(|key| ObjectEntry::new(key, None))
        .collect();

    let next_token = if output.is_truncated() == Some(true) {
        output
            .next_continuation_token()
            .map(|token| ContinuationToken::Objects(token.to_string()))
    } else {
        None
    };

    ListPage { items, next_token }
}

// Versions first, then delete markers.
fn versions_page(output: &ListObjectVersionsOutput) -> ListPage {
    let versions = output.versions().iter().filter_map(|version| {
        version
            .key()
            .map(|key| ObjectEntry::new(key, version.version_id().map(String::from)))
    });
    let delete_markers = output.delete_markers().iter().filter_map(|marker| {
        marker
            .key()
            .map(|key| ObjectEntry::new(key, marker.version_id().map(String::from)))
    });
    let items = versions.chain(delete_markers).collect();

    let next_token = if output.is_truncated() == Some(true) {
        output
            .next_key_marker()
            .map(|key_marker| ContinuationToken::Versions {
                key_marker: key_marker.to_string(),
                version_id_marker: output.next_version_id_marker().map(String::from),
            })
    } else {
        None
    };

    ListPage { items, next_token }
}

fn key_errors(output: &DeleteObjectsOutput) -> Vec<KeyError> {
    output
        .errors()
        .iter()
        .map(|error| KeyError {
            key: error.key().map(String::from),
            version_id: error.version_id().map(String::from),
            code: error.code().map(String::from),
            message: error.message().map(String::from),
        })
        .collect()
}

fn build_delete(request: &BatchRequest) -> Result<Delete> {
    let objects = request
        .members
        .iter()
        .map(|member| {
            ObjectIdentifier::builder()
                .key(&member.key)
                .set_version_id(member.version_id.clone())
                .build()
                .context("Failed to build ObjectIdentifier")
        })
        .collect::<Result<Vec<_>>>()?;

    Delete::builder()
        .set_objects(Some(objects))
        .quiet(true)
        .build()
        .context("Failed to build Delete request")
}
