//! Tracing subscriber setup for the binary.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs a stderr subscriber.
///
/// `RUST_LOG` takes precedence over the default level, which is INFO or
/// DEBUG with `verbose`. A subscriber that is already installed (tests
/// calling into the CLI more than once) is left in place.
pub fn init(verbose: bool, json: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let env_filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();
    let subscriber = tracing_subscriber::registry().with(env_filter);

    let result = if json {
        subscriber.with(fmt::layer().json().with_writer(std::io::stderr)).try_init()
    } else {
        subscriber.with(fmt::layer().with_target(false).with_writer(std::io::stderr)).try_init()
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
