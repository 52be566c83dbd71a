use crate::config::{CLITimeoutConfig, ClientConfig, Config, RetryConfig, TracingConfig};
use crate::types::StoragePath;
use aws_sdk_s3::types::RequestPayer;
use clap::Parser;
use clap::builder::{ArgPredicate, NonEmptyStringValueParser};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use std::ffi::OsString;


// ---------------------------------------------------------------------------
// Default constants
// ---------------------------------------------------------------------------

const DEFAULT_BATCH_SIZE: u16 = 1000;
const DEFAULT_MAX_KEYS: i32 = 1000;
const DEFAULT_AWS_MAX_ATTEMPTS: u32 = 10;
const DEFAULT_INITIAL_BACKOFF_MILLISECONDS: u64 = 100;
const DEFAULT_JSON_TRACING: bool = false;
const DEFAULT_AWS_SDK_TRACING: bool = false;
const DEFAULT_SPAN_EVENTS_TRACING: bool = false;
const DEFAULT_DISABLE_COLOR_TRACING: bool = false;
const DEFAULT_FORCE_PATH_STYLE: bool = false;
const DEFAULT_DRY_RUN: bool = false;
const DEFAULT_REQUEST_PAYER: bool = false;
const DEFAULT_DELETE_ALL_VERSIONS: bool = false;
const DEFAULT_DELETE_BUCKET: bool = false;

// ---------------------------------------------------------------------------
// Error messages
// ---------------------------------------------------------------------------

const ERROR_MESSAGE_INVALID_TARGET: &str =
    "Target must be an S3 path starting with 's3://' (e.g., s3://bucket/prefix).";
const ERROR_MESSAGE_INVALID_MFA: &str =
    "MFA must be the device serial number and the token separated by a space.";
const ERROR_MESSAGE_BATCH_SIZE_ZERO: &str = "Batch size must be at least 1.";
const ERROR_MESSAGE_BATCH_SIZE_TOO_LARGE: &str = "Batch size must be at most 1000 (S3 API limit).";
const ERROR_MESSAGE_MAX_KEYS_OUT_OF_RANGE: &str = "Max keys must be between 1 and 1000.";
const ERROR_MESSAGE_RATE_LIMIT_ZERO: &str = "Rate limit must be at least 1 object per second.";
const ERROR_MESSAGE_DELETE_BUCKET_WITH_PREFIX: &str =
    "--delete-bucket cannot be used with a prefix; the whole bucket must be purged.";

// ---------------------------------------------------------------------------
// Value parser helpers
// ---------------------------------------------------------------------------

fn check_s3_target(s: &str) -> Result<String, String> {
    if s.starts_with("s3://") && s.len() > 5 {
        Ok(s.to_string())
    } else {
        Err(ERROR_MESSAGE_INVALID_TARGET.to_string())
    }
}

fn check_mfa(s: &str) -> Result<String, String> {
    match s.split_once(' ') {
        Some((serial, token)) if !serial.is_empty() && !token.trim().is_empty() => {
            Ok(s.to_string())
        }
        _ => Err(ERROR_MESSAGE_INVALID_MFA.to_string()),
    }
}

// ---------------------------------------------------------------------------
// CLIArgs (clap-derived argument struct)
// ---------------------------------------------------------------------------

/// s3purge - Bulk Amazon S3 object deletion with DeleteObjects batching.
///
/// Example:
///   s3purge s3://my-bucket/logs/2023/ --dry-run
///   s3purge s3://my-bucket/ --delete-all-versions --delete-bucket -v
#[derive(Parser, Clone, Debug)]
#[command(name = "s3purge", version, about, long_about = None)]
pub struct CLIArgs {
    /// S3 target path: s3://<BUCKET_NAME>[/prefix]
    #[arg(
        env,
        help = "s3://<BUCKET_NAME>[/prefix]",
        value_parser = check_s3_target,
        default_value_if("auto_complete_shell", ArgPredicate::IsPresent, "s3://ignored"),
        required = false,
    )]
    pub target: String,

    // -----------------------------------------------------------------------
    // General options
    // -----------------------------------------------------------------------
    /// List and batch objects, but do not send any DeleteObjects request.
    #[arg(short = 'd', long, env, default_value_t = DEFAULT_DRY_RUN, help_heading = "General")]
    pub dry_run: bool,

    // -----------------------------------------------------------------------
    // Deletion options
    // -----------------------------------------------------------------------
    /// Number of objects per DeleteObjects request (1-1000).
    #[arg(long, env, default_value_t = DEFAULT_BATCH_SIZE, help_heading = "Deletion")]
    pub batch_size: u16,

    /// Delete every object version and delete marker, not just current objects.
    #[arg(long, env, default_value_t = DEFAULT_DELETE_ALL_VERSIONS, help_heading = "Deletion")]
    pub delete_all_versions: bool,

    /// Delete the bucket itself after it has been emptied.
    #[arg(long, env, default_value_t = DEFAULT_DELETE_BUCKET, help_heading = "Deletion")]
    pub delete_bucket: bool,

    /// MFA device serial number and token, separated by a space.
    #[arg(long, env, value_parser = check_mfa, help_heading = "Deletion")]
    pub mfa: Option<String>,

    // -----------------------------------------------------------------------
    // Performance options
    // -----------------------------------------------------------------------
    /// Maximum number of objects processed per second.
    #[arg(long, env, help_heading = "Performance")]
    pub rate_limit_objects: Option<u32>,

    // -----------------------------------------------------------------------
    // Logging options
    // -----------------------------------------------------------------------
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Output structured logs in JSON format.
    #[arg(long, env, default_value_t = DEFAULT_JSON_TRACING, help_heading = "Logging")]
    pub json_tracing: bool,

    /// Include AWS SDK internal traces.
    #[arg(long, env, default_value_t = DEFAULT_AWS_SDK_TRACING, help_heading = "Logging")]
    pub aws_sdk_tracing: bool,

    /// Log span open/close events.
    #[arg(long, env, default_value_t = DEFAULT_SPAN_EVENTS_TRACING, help_heading = "Logging")]
    pub span_events_tracing: bool,

    /// Disable ANSI colors in log output.
    #[arg(long, env, default_value_t = DEFAULT_DISABLE_COLOR_TRACING, help_heading = "Logging")]
    pub disable_color_tracing: bool,

    // -----------------------------------------------------------------------
    // Retry options
    // -----------------------------------------------------------------------
    /// Maximum retry attempts for AWS SDK operations.
    #[arg(long, env, default_value_t = DEFAULT_AWS_MAX_ATTEMPTS, help_heading = "Retry")]
    pub aws_max_attempts: u32,

    /// Initial backoff in milliseconds for retries.
    #[arg(
        long,
        env,
        default_value_t = DEFAULT_INITIAL_BACKOFF_MILLISECONDS,
        help_heading = "Retry"
    )]
    pub initial_backoff_milliseconds: u64,

    // -----------------------------------------------------------------------
    // Timeout options
    // -----------------------------------------------------------------------
    #[arg(long, env, help_heading = "Timeout")]
    pub operation_timeout_milliseconds: Option<u64>,

    #[arg(long, env, help_heading = "Timeout")]
    pub operation_attempt_timeout_milliseconds: Option<u64>,

    #[arg(long, env, help_heading = "Timeout")]
    pub connect_timeout_milliseconds: Option<u64>,

    #[arg(long, env, help_heading = "Timeout")]
    pub read_timeout_milliseconds: Option<u64>,

    // -----------------------------------------------------------------------
    // AWS configuration
    // -----------------------------------------------------------------------
    /// AWS CLI profile to use for the target.
    #[arg(long, env, value_parser = NonEmptyStringValueParser::new(), help_heading = "AWS")]
    pub target_profile: Option<String>,

    #[arg(long, env, value_parser = NonEmptyStringValueParser::new(), help_heading = "AWS")]
    pub target_region: Option<String>,

    /// Custom S3-compatible endpoint URL (e.g. MinIO).
    #[arg(long, env, value_parser = NonEmptyStringValueParser::new(), help_heading = "AWS")]
    pub target_endpoint_url: Option<String>,

    #[arg(long, env, default_value_t = DEFAULT_FORCE_PATH_STYLE, help_heading = "AWS")]
    pub target_force_path_style: bool,

    /// Send requests as requester-pays.
    #[arg(long, env, default_value_t = DEFAULT_REQUEST_PAYER, help_heading = "AWS")]
    pub target_request_payer: bool,

    // -----------------------------------------------------------------------
    // Advanced options
    // -----------------------------------------------------------------------
    /// Page size of the listing requests (1-1000).
    #[arg(long, env, default_value_t = DEFAULT_MAX_KEYS, help_heading = "Advanced")]
    pub max_keys: i32,

    /// Generate shell completions for the given shell and exit.
    #[arg(long, env, help_heading = "Advanced")]
    pub auto_complete_shell: Option<clap_complete::shells::Shell>,
}

// ---------------------------------------------------------------------------
// parse_from_args (public API)
// ---------------------------------------------------------------------------

pub fn parse_from_args<I, T>(args: I) -> Result<CLIArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    CLIArgs::try_parse_from(args)
}

pub fn build_config_from_args<I, T>(args: I) -> Result<Config, String>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli_args = CLIArgs::try_parse_from(args).map_err(|e| e.to_string())?;
    Config::try_from(cli_args)
}

// ---------------------------------------------------------------------------
// Validation and Config conversion
// ---------------------------------------------------------------------------

impl CLIArgs {
    fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err(ERROR_MESSAGE_BATCH_SIZE_ZERO.to_string());
        }
        if self.batch_size > 1000 {
            return Err(ERROR_MESSAGE_BATCH_SIZE_TOO_LARGE.to_string());
        }
        if !(1..=1000).contains(&self.max_keys) {
            return Err(ERROR_MESSAGE_MAX_KEYS_OUT_OF_RANGE.to_string());
        }
        if self.rate_limit_objects == Some(0) {
            return Err(ERROR_MESSAGE_RATE_LIMIT_ZERO.to_string());
        }
        Ok(())
    }

    fn build_client_config(&self) -> Option<ClientConfig> {
        let request_payer = if self.target_request_payer {
            Some(RequestPayer::Requester)
        } else {
            None
        };

        Some(ClientConfig {
            profile: self.target_profile.clone(),
            region: self.target_region.clone(),
            endpoint_url: self.target_endpoint_url.clone(),
            force_path_style: self.target_force_path_style,
            request_payer,
            retry_config: RetryConfig {
                aws_max_attempts: self.aws_max_attempts,
                initial_backoff_milliseconds: self.initial_backoff_milliseconds,
            },
            cli_timeout_config: CLITimeoutConfig {
                operation_timeout_milliseconds: self.operation_timeout_milliseconds,
                operation_attempt_timeout_milliseconds: self.operation_attempt_timeout_milliseconds,
                connect_timeout_milliseconds: self.connect_timeout_milliseconds,
                read_timeout_milliseconds: self.read_timeout_milliseconds,
            },
        })
    }

    fn build_tracing_config(&self) -> Option<TracingConfig> {
        let log_level = self.verbosity.log_level()?;

        Some(TracingConfig {
            tracing_level: log_level,
            json_tracing: self.json_tracing,
            aws_sdk_tracing: self.aws_sdk_tracing,
            span_events_tracing: self.span_events_tracing,
            disable_color_tracing: self.disable_color_tracing,
        })
    }

    fn parse_target(&self) -> Result<StoragePath, String> {
        let without_scheme = self
            .target
            .strip_prefix("s3://")
            .ok_or_else(|| ERROR_MESSAGE_INVALID_TARGET.to_string())?;

        let (bucket, prefix) = match without_scheme.split_once('/') {
            Some((bucket, prefix)) => (bucket.to_string(), prefix.to_string()),
            None => (without_scheme.to_string(), String::new()),
        };

        if bucket.is_empty() {
            return Err(ERROR_MESSAGE_INVALID_TARGET.to_string());
        }

        Ok(StoragePath::S3 { bucket, prefix })
    }
}

impl TryFrom<CLIArgs> for Config {
    type Error = String;

    fn try_from(args: CLIArgs) -> Result<Self, Self::Error> {
        args.validate()?;

        let target = args.parse_target()?;
        let StoragePath::S3 { ref prefix, .. } = target;
        if args.delete_bucket && !prefix.is_empty() {
            return Err(ERROR_MESSAGE_DELETE_BUCKET_WITH_PREFIX.to_string());
        }

        Ok(Config {
            target_client_config: args.build_client_config(),
            tracing_config: args.build_tracing_config(),
            target,
            dry_run: args.dry_run,
            rate_limit_objects: args.rate_limit_objects,
            max_keys: args.max_keys,
            auto_complete_shell: args.auto_complete_shell,
            batch_size: args.batch_size,
            delete_all_versions: args.delete_all_versions,
            mfa: args.mfa,
            delete_bucket: args.delete_bucket,
        })
    }
}
