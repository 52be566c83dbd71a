use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_config::retry::RetryConfig as SdkRetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Region;

use crate::config::ClientConfig;

impl ClientConfig {
    /// Build an S3 client from the default AWS provider chain, overridden by
    /// the profile, region, endpoint, retry and timeout settings held here.
    pub async fn create_client(&self) -> Client {
        let mut config_loader = aws_config::defaults(BehaviorVersion::latest())
            .retry_config(self.build_retry_config())
            .timeout_config(self.build_timeout_config());

        if let Some(profile) = &self.profile {
            config_loader = config_loader.profile_name(profile);
        }
        if let Some(region) = &self.region {
            config_loader = config_loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint_url) = &self.endpoint_url {
            config_loader = config_loader.endpoint_url(endpoint_url);
        }

        let sdk_config = config_loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(self.force_path_style)
            .build();

        Client::from_conf(s3_config)
    }

    fn build_retry_config(&self) -> SdkRetryConfig {
        SdkRetryConfig::standard()
            .with_max_attempts(self.retry_config.aws_max_attempts)
            .with_initial_backoff(Duration::from_millis(
                self.retry_config.initial_backoff_milliseconds,
            ))
    }

    fn build_timeout_config(&self) -> TimeoutConfig {
        let timeouts = &self.cli_timeout_config;
        let mut builder = TimeoutConfig::builder();

        if let Some(ms) = timeouts.operation_timeout_milliseconds {
            builder = builder.operation_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = timeouts.operation_attempt_timeout_milliseconds {
            builder = builder.operation_attempt_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = timeouts.connect_timeout_milliseconds {
            builder = builder.connect_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = timeouts.read_timeout_milliseconds {
            builder = builder.read_timeout(Duration::from_millis(ms));
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CLITimeoutConfig, RetryConfig};
    use crate::test_utils::init_dummy_tracing_subscriber;

    fn make_client_config() -> ClientConfig {
        ClientConfig {
            profile: None,
            region: Some("eu-west-1".to_string()),
            endpoint_url: Some("https://localhost:9000".to_string()),
            force_path_style: true,
            retry_config: RetryConfig {
                aws_max_attempts: 4,
                initial_backoff_milliseconds: 250,
            },
            cli_timeout_config: CLITimeoutConfig {
                operation_timeout_milliseconds: Some(30_000),
                operation_attempt_timeout_milliseconds: None,
                connect_timeout_milliseconds: Some(5_000),
                read_timeout_milliseconds: None,
            },
            request_payer: None,
        }
    }

    #[tokio::test]
    async fn client_uses_configured_region_and_retry() {
        init_dummy_tracing_subscriber();

        let client = make_client_config().create_client().await;

        assert_eq!(client.config().region().unwrap().to_string(), "eu-west-1");
        let retry_config = client.config().retry_config().unwrap();
        assert_eq!(retry_config.max_attempts(), 4);
        assert_eq!(retry_config.initial_backoff(), Duration::from_millis(250));
    }

    #[test]
    fn timeout_config_only_sets_given_values() {
        let timeout_config = make_client_config().build_timeout_config();

        assert_eq!(
            timeout_config.operation_timeout(),
            Some(Duration::from_secs(30))
        );
        assert_eq!(timeout_config.connect_timeout(), Some(Duration::from_secs(5)));
        assert!(timeout_config.operation_attempt_timeout().is_none());
        assert!(timeout_config.read_timeout().is_none());
    }
}
