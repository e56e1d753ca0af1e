//! Logging initialization.

use tracing_subscriber::EnvFilter;

/// Initialize stdout logging.
///
/// `RUST_LOG` wins over the built-in filter when set.
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .init();
}

fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "assetbridge=debug,assetbridge_server=debug,assetbridge_mcp=debug,tower_http=debug"
    } else {
        "assetbridge=info,assetbridge_server=info,assetbridge_mcp=info,tower_http=info"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filters_parse() {
        for verbose in [false, true] {
            assert!(EnvFilter::try_new(default_filter(verbose)).is_ok());
        }
        assert!(default_filter(true).contains("assetbridge_mcp=debug"));
    }
}
