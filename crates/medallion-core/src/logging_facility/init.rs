//! Logging initialization
//!
//! One call per process; later calls are ignored.

use std::sync::Once;
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

/// Logging profile configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Human-readable output for development
    Development,
    /// JSON structured output for production
    Production,
    /// Test capture mode for deterministic testing
    Test,
}

impl Profile {
    /// Pick a profile from a name such as `"production"` or `"json"`.
    /// Unknown names fall back to Development.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" | "json" => Profile::Production,
            "test" => Profile::Test,
            _ => Profile::Development,
        }
    }

    fn default_filter(&self) -> &'static str {
        match self {
            Profile::Production => "medallion=info",
            _ => "medallion=debug",
        }
    }
}

static INIT_ONCE: Once = Once::new();

/// Initialize the logging facility
///
/// - **Development**: human-readable logs, debug level for `medallion*` targets
/// - **Production**: JSON logs, info level
/// - **Test**: bare registry; use `init_test_capture()` to collect events
///
/// `RUST_LOG` overrides the default filter in every profile.
///
/// ```
/// use medallion_core::logging_facility::{init, Profile};
///
/// init(Profile::Development);
/// ```
pub fn init(profile: Profile) {
    INIT_ONCE.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(profile.default_filter()));
        match profile {
            Profile::Development => {
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_writer(std::io::stderr)
                    .init();
            }
            Profile::Production => {
                tracing_subscriber::fmt()
                    .json()
                    .with_env_filter(filter)
                    .with_writer(std::io::stderr)
                    .init();
            }
            Profile::Test => {
                tracing_subscriber::registry().init();
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_from_name() {
        assert_eq!(Profile::from_name("production"), Profile::Production);
        assert_eq!(Profile::from_name(" JSON "), Profile::Production);
        assert_eq!(Profile::from_name("test"), Profile::Test);
        assert_eq!(Profile::from_name("anything"), Profile::Development);
    }

    #[test]
    fn test_default_filters() {
        assert_eq!(Profile::Production.default_filter(), "medallion=info");
        assert_eq!(Profile::Development.default_filter(), "medallion=debug");
    }
}
