use std::time::Duration;

use cached::proc_macro::cached;
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

pub use config::ConfigError as Error;

#[derive(Deserialize, Debug, Clone)]
pub struct Hosts {
    pub listen: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Upstream {
    pub base_url: String,
    pub token: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Upstream {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Token to send upstream, if one is configured
    pub fn token(&self) -> Option<&str> {
        Some(self.token.as_str()).filter(|token| !token.is_empty())
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct Cache {
    pub check_ttl_secs: u64,
    pub poll_ttl_secs: u64,
}

impl Cache {
    pub fn check_ttl(&self) -> Duration {
        Duration::from_secs(self.check_ttl_secs)
    }

    pub fn poll_ttl(&self) -> Duration {
        Duration::from_secs(self.poll_ttl_secs)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    pub hosts: Hosts,
    pub upstream: Upstream,
    pub cache: Cache,
}

/// Build the layered configuration
///
/// Embedded defaults, then `Netscope.toml` in the working directory, then
/// `NETSCOPE__SECTION__KEY` environment variables.
pub fn read() -> Result<Config, ConfigError> {
    let mut builder = Config::builder().add_source(File::from_str(
        include_str!("../Netscope.toml"),
        FileFormat::Toml,
    ));

    if std::path::Path::new("Netscope.toml").exists() {
        builder = builder.add_source(File::new("Netscope.toml", FileFormat::Toml));
    }

    builder
        .add_source(
            Environment::with_prefix("NETSCOPE")
                .separator("__")
                .try_parsing(true),
        )
        .build()
}

#[cached(time = 30, result = true)]
pub async fn config() -> Result<Settings, ConfigError> {
    read()?.try_deserialize::<Settings>()
}

/// Configure logging and environment for a service
///
/// Loads `.env`, defaults `RUST_LOG` to `info` and installs the global
/// tracing subscriber.
pub fn setup_logging(application: &str, version: &str) {
    dotenv::dotenv().ok();

    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }

    if tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .is_err()
    {
        tracing::warn!("Tracing subscriber was already installed");
    }

    tracing::info!("Starting {application} [version {version}].");
}

#[macro_export]
macro_rules! configure {
    ($application: ident) => {
        $crate::setup_logging(stringify!($application), env!("CARGO_PKG_VERSION"))
    };
}
