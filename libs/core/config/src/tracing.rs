use crate::Environment;
use tracing::{debug, info};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Default filter when `RUST_LOG` is not set.
///
/// Vendor SDK internals (h2, hyper, tonic, tungstenite) stay at `warn` so
/// the searcher and stream spans are readable.
const DEV_FILTER: &str = "debug,h2=warn,hyper=warn,hyper_util=warn,tonic=warn,tower=warn,tungstenite=warn,tokio_tungstenite=warn";
const PROD_FILTER: &str = "info,h2=warn,hyper=warn,hyper_util=warn,tonic=warn,tungstenite=warn";

/// Initialize tracing with environment-aware configuration and error span capture.
///
/// - **Production** (`APP_ENV=production`): flattened JSON events, no module
///   targets, `ErrorLayer` for span traces.
/// - **Development** (default): pretty output, `ErrorLayer` for span traces.
///
/// `RUST_LOG` overrides the default filter in both modes.
///
/// Safe to call multiple times: a second call leaves the installed
/// subscriber in place (common in tests).
pub fn init_tracing(environment: &Environment) {
    let is_production = environment.is_production();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if is_production {
            EnvFilter::new(PROD_FILTER)
        } else {
            EnvFilter::new(DEV_FILTER)
        }
    });

    let result = if is_production {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .with_current_span(true)
                    .flatten_event(true),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false)
                    .pretty(),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    };

    match result {
        Ok(_) => {
            info!(environment = ?environment, "Tracing initialized");
        }
        Err(_) => {
            debug!("Tracing already initialized, skipping re-initialization");
        }
    }
}
