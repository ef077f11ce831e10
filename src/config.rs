use crate::{
    api::{ApiQuerier, ExhaustPolicy, DEFAULT_PROVIDERS, DEFAULT_PROXY},
    conf::DEFAULT_TIMEOUT,
    share::DEFAULT_SERVER_PORT,
    ConfigErr, QueryErr,
};
use serde::Deserialize;
use std::{fs, path::Path, time::Duration};

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    pub server: ServerConfig,
    pub query: QueryConfig,
    pub api: ApiConfig,
    pub refresh: RefreshConfig,
}

/// Server queried when no address is given.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "rwmc.top".into(),
            port: DEFAULT_SERVER_PORT,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Server List Ping straight to the server.
    #[default]
    Direct,
    /// Third-party status APIs.
    Api,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct QueryConfig {
    pub strategy: Strategy,
    pub timeout_ms: u64,
    /// Follow SRV records on direct queries.
    pub srv: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            srv: true,
        }
    }
}

impl QueryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct ApiConfig {
    /// URL templates with `%host%` and `%port%` placeholders, tried in order.
    pub providers: Vec<String>,
    /// First provider to ask.
    pub provider: usize,
    pub allow_retry: bool,
    pub use_proxy: bool,
    pub proxy: String,
    pub on_exhausted: ExhaustPolicy,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            providers: DEFAULT_PROVIDERS.iter().map(|p| p.to_string()).collect(),
            provider: 0,
            allow_retry: true,
            use_proxy: false,
            proxy: DEFAULT_PROXY.into(),
            on_exhausted: ExhaustPolicy::default(),
        }
    }
}

impl ApiConfig {
    pub fn querier(&self, timeout: Duration) -> Result<ApiQuerier, QueryErr> {
        Ok(ApiQuerier::with_timeout(self.providers.clone(), timeout)?
            .proxy(self.use_proxy.then(|| self.proxy.clone()))
            .on_exhausted(self.on_exhausted))
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct RefreshConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: 10,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigErr> {
        Self::parse(&fs::read_to_string(path)?)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigErr> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigErr> {
        if self.server.port == 0 {
            return Err(ConfigErr::Invalid("server.port must not be 0".into()));
        }
        if self.query.timeout_ms == 0 {
            return Err(ConfigErr::Invalid("query.timeout_ms must not be 0".into()));
        }
        if self.api.providers.is_empty() {
            return Err(ConfigErr::Invalid("api.providers must not be empty".into()));
        }
        if self.api.provider >= self.api.providers.len() {
            return Err(ConfigErr::Invalid(format!(
                "api.provider {} is out of range ({} providers)",
                self.api.provider,
                self.api.providers.len()
            )));
        }
        if self.refresh.interval_secs == 0 {
            return Err(ConfigErr::Invalid(
                "refresh.interval_secs must not be 0".into(),
            ));
        }

        Ok(())
    }
}
