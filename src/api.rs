use crate::QueryErr;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

/// Status endpoints tried in order. `%host%` and `%port%` are substituted per request.
pub const DEFAULT_PROVIDERS: [&str; 2] = [
    "https://api.mcstatus.io/v2/status/java/%host%:%port%",
    "https://api.mcsrvstat.us/3/%host%:%port%",
];

/// CORS proxy the target URL is appended to when proxying is enabled.
pub const DEFAULT_PROXY: &str = "https://proxy.mengze.vip/proxy/";

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// What a call returns once every provider it may try has failed.
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExhaustPolicy {
    /// Fail with [QueryErr::AllProvidersFailed].
    #[default]
    Error,
    /// Return `Ok(None)` and leave the decision to the caller.
    Empty,
}

/// Queries third-party HTTP status APIs.
#[derive(Debug, Clone)]
pub struct ApiQuerier {
    client: reqwest::Client,
    providers: Vec<String>,
    proxy: Option<String>,
    on_exhausted: ExhaustPolicy,
}

impl ApiQuerier {
    /// Querier over [DEFAULT_PROVIDERS] without a proxy.
    pub fn new() -> Result<Self, QueryErr> {
        Self::with_providers(DEFAULT_PROVIDERS.iter().map(|p| p.to_string()).collect())
    }

    pub fn with_providers(providers: Vec<String>) -> Result<Self, QueryErr> {
        Self::with_timeout(providers, DEFAULT_HTTP_TIMEOUT)
    }

    pub fn with_timeout(providers: Vec<String>, timeout: Duration) -> Result<Self, QueryErr> {
        // one request per call, nothing is kept alive in between; proxying is
        // only ever the explicit URL prefix, never the environment's HTTP_PROXY
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(0)
            .no_proxy()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| QueryErr::ConnectionFailed {
                target: "http client".into(),
                reason: err.to_string(),
            })?;

        Ok(Self {
            client,
            providers,
            proxy: None,
            on_exhausted: ExhaustPolicy::default(),
        })
    }

    /// Route every request through `proxy`, which is prefixed to the target URL.
    pub fn proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn on_exhausted(mut self, policy: ExhaustPolicy) -> Self {
        self.on_exhausted = policy;
        self
    }

    /// Build the request URL for provider `index`.
    ///
    /// Without a port the `:%port%` segment is removed and the provider applies its default.
    pub fn build_url(&self, index: usize, host: &str, port: Option<u16>) -> Option<String> {
        let template = self.providers.get(index)?;
        let url = template.replace("%host%", host);
        let url = match port {
            Some(port) => url.replace("%port%", &port.to_string()),
            None => url.replace(":%port%", "").replace("%port%", ""),
        };

        Some(match &self.proxy {
            Some(proxy) => format!("{}{}", proxy, url),
            None => url,
        })
    }

    /// Fetch the raw status payload of `host` from provider `provider`.
    ///
    /// With `allow_retry` a failure is retried once against the next provider.
    /// Returns `Ok(None)` only when the querier uses [ExhaustPolicy::Empty].
    pub async fn query(
        &self,
        host: &str,
        port: Option<u16>,
        provider: usize,
        allow_retry: bool,
    ) -> Result<Option<Value>, QueryErr> {
        if provider >= self.providers.len() {
            return Err(QueryErr::UnknownProvider(provider));
        }

        let mut attempted = vec![provider];
        let mut last_error = match self.fetch(provider, host, port).await {
            Ok(value) => return Ok(Some(value)),
            Err(err) => err,
        };

        if allow_retry {
            let next = provider + 1;

            if next < self.providers.len() {
                info!("retrying {} with status provider {}", host, next);
                attempted.push(next);

                match self.fetch(next, host, port).await {
                    Ok(value) => return Ok(Some(value)),
                    Err(err) => last_error = err,
                }
            }
        }

        warn!("all status providers failed for {}: {}", host, last_error);

        match self.on_exhausted {
            ExhaustPolicy::Error => Err(QueryErr::AllProvidersFailed {
                attempted,
                last_error,
            }),
            ExhaustPolicy::Empty => Ok(None),
        }
    }

    async fn fetch(&self, index: usize, host: &str, port: Option<u16>) -> Result<Value, String> {
        let url = self
            .build_url(index, host, port)
            .ok_or_else(|| format!("no status provider at index {}", index))?;

        let response = self.client.get(&url).send().await.map_err(|err| {
            let reason = format!("request to {} failed: {}", url, err);
            warn!("[provider {}] {}", index, reason);
            reason
        })?;

        if !response.status().is_success() {
            let reason = format!("{} answered {}", url, response.status());
            warn!("[provider {}] {}", index, reason);
            return Err(reason);
        }

        response.json::<Value>().await.map_err(|err| {
            let reason = format!("{} returned an unreadable body: {}", url, err);
            warn!("[provider {}] {}", index, reason);
            reason
        })
    }
}
