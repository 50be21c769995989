//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber filtered at `level`.
///
/// `RUST_LOG` takes precedence when set. Returns `false` if a global
/// subscriber was already installed.
pub fn init_tracing(level: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        let _ = init_tracing("debug");
        assert!(!init_tracing("info"));
    }
}
