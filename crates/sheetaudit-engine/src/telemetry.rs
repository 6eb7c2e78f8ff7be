//! Opt-in log output for binaries and tests.

/// Install a global fmt subscriber filtered by `RUST_LOG` (default `warn`).
///
/// Safe to call repeatedly; only the first call installs anything, and an
/// already-installed subscriber from the host application is left alone.
#[cfg(feature = "tracing")]
pub fn init_tracing() {
    use once_cell::sync::OnceCell;
    use tracing_subscriber::EnvFilter;

    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init();
    });
}

#[cfg(not(feature = "tracing"))]
pub fn init_tracing() {}
