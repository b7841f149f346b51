//! Tracing subscriber initialization.

use tracing_subscriber::fmt::format::Format;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// filter, which keeps this service's crates at debug and everything else
/// at their own defaults.
pub fn init_telemetry() {
    let default_filter = "conveyor_api=debug,conveyor_db=debug,conveyor_storage=debug,\
                          conveyor_worker=debug,conveyor_core=debug,tower_http=debug";

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(
            tracing_subscriber::fmt::layer().event_format(
                Format::default()
                    .compact()
                    .with_target(false)
                    .without_time(),
            ),
        )
        .init();
}
