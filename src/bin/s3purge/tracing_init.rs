// Initializes the tracing subscriber for the CLI binary.

use std::env;
use std::io::IsTerminal;

use tracing_subscriber::fmt::format::FmtSpan;

use s3purge_rs::config::TracingConfig;

const EVENT_FILTER_ENV_VAR: &str = "RUST_LOG";

fn event_filter(config: &TracingConfig, rust_log: Option<String>) -> (String, bool) {
    let tracing_level = config.tracing_level;
    if config.aws_sdk_tracing {
        (
            format!(
                "s3purge_rs={tracing_level},s3purge={tracing_level},aws_smithy_runtime={tracing_level},aws_config={tracing_level},aws_sigv4={tracing_level}"
            ),
            true,
        )
    } else if let Some(rust_log) = rust_log {
        (rust_log, true)
    } else {
        (
            format!("s3purge_rs={tracing_level},s3purge={tracing_level}"),
            false,
        )
    }
}

pub fn init_tracing(config: &TracingConfig) {
    let fmt_span = if config.span_events_tracing {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let (event_filter, show_target) = event_filter(config, env::var(EVENT_FILTER_ENV_VAR).ok());

    let subscriber_builder = tracing_subscriber::fmt()
        .with_writer(std::io::stdout)
        .compact()
        .with_ansi(!config.disable_color_tracing && std::io::stdout().is_terminal())
        .with_span_events(fmt_span)
        .with_env_filter(event_filter)
        .with_target(show_target);

    if config.json_tracing {
        subscriber_builder.json().init();
    } else {
        subscriber_builder.init();
    }
}
