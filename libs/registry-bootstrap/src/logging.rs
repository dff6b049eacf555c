use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global tracing subscriber. In `dev` mode the console
/// layer defaults to `debug`; any other mode defaults to `info`. The
/// `RUST_LOG` environment variable always takes precedence.
pub fn init(mode: &str) {
    let default_level = if mode == "dev" { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("registry={default_level},info")));

    let fmt_layer = fmt::layer().with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
