pub mod args;

use crate::assembler::MAX_BATCH_SIZE;
use crate::types::StoragePath;
use aws_sdk_s3::types::RequestPayer;

/// Main configuration for an s3purge-rs run.
///
/// Holds the target bucket/prefix, the S3 client settings and the knobs of
/// the batch deleter (batch size, page size, versioning, MFA, dry-run).
///
/// # Quick Start
///
/// ```
/// use s3purge_rs::Config;
///
/// let mut config = Config::for_target("my-bucket", "logs/2024/");
/// config.dry_run = true;
/// assert_eq!(config.batch_size, 1000);
/// ```
///
/// [`Config::default()`] targets an empty bucket/prefix. Set `target`
/// before running a [`BucketRemover`](crate::BucketRemover).
#[derive(Debug, Clone)]
pub struct Config {
    pub target: StoragePath,
    pub target_client_config: Option<ClientConfig>,
    pub tracing_config: Option<TracingConfig>,
    pub dry_run: bool,
    pub rate_limit_objects: Option<u32>,
    /// Page size of the listing calls.
    pub max_keys: i32,
    pub auto_complete_shell: Option<clap_complete::shells::Shell>,
    pub batch_size: u16,
    pub delete_all_versions: bool,
    /// `x-amz-mfa` value ("serial token") sent with every DeleteObjects call.
    pub mfa: Option<String>,
    /// Delete the bucket itself once it has been emptied.
    pub delete_bucket: bool,
}

impl Config {
    /// Create a `Config` with defaults for the given S3 bucket and prefix.
    ///
    /// ```
    /// use s3purge_rs::Config;
    /// use s3purge_rs::types::StoragePath;
    ///
    /// let config = Config::for_target("my-bucket", "logs/");
    /// let StoragePath::S3 { bucket, prefix } = &config.target;
    /// assert_eq!(bucket, "my-bucket");
    /// assert_eq!(prefix, "logs/");
    /// ```
    pub fn for_target(bucket: &str, prefix: &str) -> Self {
        Config {
            target: StoragePath::S3 {
                bucket: bucket.to_string(),
                prefix: prefix.to_string(),
            },
            ..Config::default()
        }
    }

    /// Bucket and prefix of the target.
    pub fn target_location(&self) -> (&str, &str) {
        let StoragePath::S3 { bucket, prefix } = &self.target;
        (bucket, prefix)
    }

    /// Request payer configured on the target client, if any.
    pub fn request_payer(&self) -> Option<RequestPayer> {
        self.target_client_config
            .as_ref()
            .and_then(|client_config| client_config.request_payer.clone())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            target: StoragePath::S3 {
                bucket: String::new(),
                prefix: String::new(),
            },
            target_client_config: None,
            tracing_config: None,
            dry_run: false,
            rate_limit_objects: None,
            max_keys: 1000,
            auto_complete_shell: None,
            batch_size: MAX_BATCH_SIZE as u16,
            delete_all_versions: false,
            mfa: None,
            delete_bucket: false,
        }
    }
}

/// AWS S3 client configuration.
///
/// Credentials come from the default provider chain, optionally narrowed to
/// a named profile.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub profile: Option<String>,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
    pub request_payer: Option<RequestPayer>,
    pub retry_config: RetryConfig,
    pub cli_timeout_config: CLITimeoutConfig,
}

/// Retry configuration for AWS SDK operations.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub aws_max_attempts: u32,
    pub initial_backoff_milliseconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            aws_max_attempts: 10,
            initial_backoff_milliseconds: 100,
        }
    }
}

/// Timeout configuration for AWS SDK operations. `None` keeps the SDK default.
#[derive(Debug, Clone, Default)]
pub struct CLITimeoutConfig {
    pub operation_timeout_milliseconds: Option<u64>,
    pub operation_attempt_timeout_milliseconds: Option<u64>,
    pub connect_timeout_milliseconds: Option<u64>,
    pub read_timeout_milliseconds: Option<u64>,
}

/// Tracing (logging) configuration.
#[derive(Debug, Clone, Copy)]
pub struct TracingConfig {
    pub tracing_level: log::Level,
    pub json_tracing: bool,
    pub aws_sdk_tracing: bool,
    pub span_events_tracing: bool,
    pub disable_color_tracing: bool,
}
