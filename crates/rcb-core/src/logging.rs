use crate::Result;

/// Initialize tracing for the gateway.
///
/// Default filter is `info` for our crates and `warn` for everything else;
/// `RUST_LOG` overrides it.
pub fn init(service_name: &str) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,rcb_core=info,rcb_platform=info,rcb_server=info,{}=info",
            service_name.replace('-', "_")
        ))
    });

    // A second init (tests, embedding) is not an error.
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .try_init();

    Ok(())
}
