use tracing_subscriber::{
    fmt::format::Format, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

const DEFAULT_FILTER: &str = "ferry=debug,ferry_api=debug,ferry_uploads=debug,tower_http=debug";

/// Initialize tracing.
///
/// `compact` is meant for consoles, `json` for log shippers. A second call (tests build
/// several apps in one process) keeps the first subscriber.
pub fn init_telemetry(log_format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    let installed = match log_format {
        "json" => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init(),
        _ => {
            let console_fmt = tracing_subscriber::fmt::layer().event_format(
                Format::default()
                    .compact()
                    .with_target(false)
                    .without_time(),
            );
            tracing_subscriber::registry()
                .with(filter)
                .with(console_fmt)
                .try_init()
        }
    };

    match installed {
        Ok(()) => tracing::info!(log_format, "Tracing initialized"),
        Err(_) => tracing::debug!("Tracing subscriber already installed"),
    }
    Ok(())
}
