//! Process-wide tracing setup.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_FILTER: &str = "info";

/// `RUST_LOG` wins over the configured directive, which wins over `info`.
fn filter_directive(from_env: Option<String>, configured: Option<&str>) -> String {
    from_env
        .filter(|d| !d.trim().is_empty())
        .or_else(|| configured.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

/// Install the stderr subscriber. Returns false if one was already installed.
pub fn init(configured: Option<&str>) -> bool {
    let directive = filter_directive(std::env::var(EnvFilter::DEFAULT_ENV).ok(), configured);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|e| {
        eprintln!("Warning: Invalid log filter \"{directive}\": {e}. Using \"{DEFAULT_FILTER}\".");
        EnvFilter::new(DEFAULT_FILTER)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()
        .is_ok()
}
