use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// JSON lines when `BASEMATCH_ENV=production`, pretty output otherwise.
    pub fn from_env() -> Self {
        match std::env::var("BASEMATCH_ENV").as_deref() {
            Ok("production") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Default filter when `RUST_LOG` is unset: debug for our own crates.
pub fn default_filter(service_name: &str) -> String {
    let crate_target = service_name.replace('-', "_");
    format!("info,{crate_target}=debug,basematch_shared=debug,tower_http=debug")
}

/// Install the global subscriber for `service_name`.
pub fn init_tracing(service_name: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(service_name)));
    let format = LogFormat::from_env();

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_target(true),
            )
            .init(),
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init(),
    }

    tracing::info!(service = service_name, format = ?format, "tracing initialized");
}
