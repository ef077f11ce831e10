//! Minecraft server status queries.
//!
//! A server can be asked directly with the Server List Ping protocol, or through
//! third-party status APIs when it cannot be reached from here. Both paths end
//! in the same [ServerStatus].

mod api;
mod conf;
mod config;
mod error;
pub mod logging;
mod normalize;
pub mod server;
mod share;
pub mod srv;
mod status;
pub mod varint;

pub use api::{ApiQuerier, ExhaustPolicy, DEFAULT_PROVIDERS, DEFAULT_PROXY};
pub use conf::{Conf, DEFAULT_TIMEOUT};
pub use config::{ApiConfig, Config, QueryConfig, RefreshConfig, ServerConfig, Strategy};
pub use error::{ConfigErr, NormalizeErr, QueryErr, StatusErr, VarIntErr};
pub use normalize::RawStatus;
pub use server::{get_server_status, SlpServer};
pub use share::{strip_formatting, DEFAULT_SERVER_PORT};
pub use status::{Players, ServerStatus, Source, DEFAULT_ICON, DEFAULT_NAME};

use std::time::Duration;

/// Ping `host:port` directly, following SRV records.
///
/// # Example
///
/// ```no_run
/// # #[tokio::main]
/// # async fn main() -> Result<(), mcstat::StatusErr> {
/// let status = mcstat::query_direct("mc.hypixel.net", 25565, 5000).await?;
/// println!("{}", status);
/// # Ok(())
/// # }
/// ```
pub async fn query_direct(
    host: &str,
    port: u16,
    timeout_ms: u64,
) -> Result<ServerStatus, StatusErr> {
    Conf::create_with_port(host, port)?
        .with_timeout(Duration::from_millis(timeout_ms))
        .query_direct()
        .await
}

/// Ask provider `provider` of `querier` about `host`, retrying once on the next provider.
///
/// `Ok(None)` is only returned by a querier using [ExhaustPolicy::Empty].
pub async fn query_via_api(
    querier: &ApiQuerier,
    host: &str,
    port: Option<u16>,
    provider: usize,
    allow_retry: bool,
) -> Result<Option<ServerStatus>, StatusErr> {
    match querier.query(host, port, provider, allow_retry).await? {
        Some(value) => Ok(Some(RawStatus::Provider(value).normalize()?)),
        None => Ok(None),
    }
}

/// Query `target` the way `config` asks for.
pub async fn query_with_strategy(
    config: &Config,
    target: &Conf,
) -> Result<Option<ServerStatus>, StatusErr> {
    match config.query.strategy {
        Strategy::Direct => target.query_direct().await.map(Some),
        Strategy::Api => {
            let querier = config.api.querier(config.query.timeout())?;

            target
                .query_via_api(&querier, config.api.provider, config.api.allow_retry)
                .await
        }
    }
}
