//! Helpers shared by the demos.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Well-known name claimed by the demo services.
pub const NAME: &str = "se.tedro.DBusExample";

/// Object path the demo services export their interfaces at.
pub const PATH: &str = "/se/tedro/DBusExample";

/// Install a tracing subscriber configured through `RUST_LOG`.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}
