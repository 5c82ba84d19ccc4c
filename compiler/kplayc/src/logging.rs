use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Set to render spans as an indented tree instead of flat lines.
pub const LOG_TREE_VAR: &str = "KPLAY_LOG_TREE";

/// Initialize tracing on stderr.
///
/// Call this once at startup. Safe to call multiple times.
/// Enable with `RUST_LOG=kplayc=debug` or `RUST_LOG=kplay_backend=trace`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_err() {
            return;
        }
        let filter = EnvFilter::from_default_env();
        let registry = tracing_subscriber::registry().with(filter);
        let installed = if std::env::var_os(LOG_TREE_VAR).is_some() {
            registry
                .with(
                    tracing_tree::HierarchicalLayer::new(2)
                        .with_targets(true)
                        .with_writer(std::io::stderr),
                )
                .try_init()
        } else {
            registry
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_level(true)
                        .with_writer(std::io::stderr),
                )
                .try_init()
        };
        // Embedders may already own the global subscriber.
        if installed.is_err() {
            tracing::debug!("tracing subscriber already installed");
        }
    });
}
