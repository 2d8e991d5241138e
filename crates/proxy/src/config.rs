use tracing_subscriber::EnvFilter;

pub const DEFAULT_ADDR: &str = "0.0.0.0:3001";
pub const DEFAULT_DB: &str = "flexdata.db";
const DEFAULT_FILTER: &str = "flexdata=info,tower_http=info";

/// Where the proxy listens and which database it reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub addr: String,
    pub db_path: String,
}

impl ProxyConfig {
    /// Read `FLEXDATA_ADDR` and `FLEXDATA_DB` from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ProxyConfig::from_env`] over an arbitrary lookup. Blank
    /// values fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        Self {
            addr: read("FLEXDATA_ADDR", DEFAULT_ADDR),
            db_path: read("FLEXDATA_DB", DEFAULT_DB),
        }
    }
}

/// Install the fmt subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
