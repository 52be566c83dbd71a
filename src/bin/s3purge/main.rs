use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use tracing::{debug, error, info, trace};

use s3purge_rs::config::Config;
use s3purge_rs::{
    BucketRemover, CLIArgs, create_pipeline_cancellation_token, exit_code_from_error,
    is_cancelled_error,
};

mod ctrl_c_handler;
mod tracing_init;

/// s3purge - Bulk Amazon S3 object deletion.
///
/// This binary is a thin wrapper over the s3purge-rs library.
#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config_exit_if_err();

    if let Some(shell) = config.auto_complete_shell {
        generate(
            shell,
            &mut CLIArgs::command(),
            "s3purge",
            &mut std::io::stdout(),
        );

        return Ok(());
    }

    start_tracing_if_necessary(&config);

    trace!("config = {:?}", config);

    let exit_code = run(config).await;
    if exit_code != 0 {
        std::process::exit(exit_code);
    }

    Ok(())
}

fn load_config_exit_if_err() -> Config {
    match Config::try_from(CLIArgs::parse()) {
        Ok(config) => config,
        Err(error_message) => {
            clap::Error::raw(clap::error::ErrorKind::ValueValidation, error_message).exit()
        }
    }
}

fn start_tracing_if_necessary(config: &Config) -> bool {
    let Some(tracing_config) = config.tracing_config.as_ref() else {
        return false;
    };

    tracing_init::init_tracing(tracing_config);
    true
}

/// Run the purge and return the process exit code.
async fn run(config: Config) -> i32 {
    let cancellation_token = create_pipeline_cancellation_token();
    ctrl_c_handler::spawn_ctrl_c_handler(cancellation_token.clone());

    let start_time = tokio::time::Instant::now();
    debug!("purge start.");

    let remover = BucketRemover::new(config, cancellation_token.clone()).await;
    let result = remover.remove().await;

    // stop the Ctrl+C handler task
    cancellation_token.cancel();

    let duration_sec = format!("{:.3}", start_time.elapsed().as_secs_f32());

    match result {
        Ok(stats) => {
            info!(
                duration_sec = duration_sec,
                batches = stats.batches,
                deleted = stats.deleted,
                "s3purge has been completed."
            );
            0
        }
        Err(e) if is_cancelled_error(&e) => {
            debug!(duration_sec = duration_sec, "purge cancelled by user.");
            exit_code_from_error(&e)
        }
        Err(e) => {
            error!(duration_sec = duration_sec, "s3purge failed: {:#}", e);
            exit_code_from_error(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusty_fork::rusty_fork_test;
    use s3purge_rs::config::args::parse_from_args;

    rusty_fork_test! {
        #[test]
        fn with_tracing() {
            let args = vec![
                "s3purge",
                "-v",
                "s3://test-bucket/prefix/",
            ];

            let config = Config::try_from(parse_from_args(args).unwrap()).unwrap();
            assert!(start_tracing_if_necessary(&config));
        }

        #[test]
        fn without_tracing() {
            let args = vec![
                "s3purge",
                "-qq",
                "s3://test-bucket/prefix/",
            ];

            let config = Config::try_from(parse_from_args(args).unwrap()).unwrap();
            assert!(!start_tracing_if_necessary(&config));
        }
    }
}
