//! mcstat - Minecraft server status from the command line.

use anyhow::Context;
use clap::Parser;
use mcstat::{logging::init_logging, query_with_strategy, Conf, Config, StatusErr, Strategy};
use std::{future::Future, path::PathBuf, time::Duration};
use tracing::{error, info, warn};

const DEFAULT_CONFIG_FILE: &str = "mcstat.toml";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address, `host` or `host:port`. Defaults to the configured server.
    address: Option<String>,

    /// Config file, `mcstat.toml` is used when present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Ask third-party status APIs instead of pinging the server.
    #[arg(long)]
    api: bool,

    /// First status API to ask.
    #[arg(long)]
    provider: Option<usize>,

    /// Do not fall back to the next status API.
    #[arg(long)]
    no_retry: bool,

    /// Send status API requests through the configured proxy.
    #[arg(long)]
    proxy: bool,

    /// Timeout in milliseconds.
    #[arg(long)]
    timeout: Option<u64>,

    /// Connect to the address as given, ignoring SRV records.
    #[arg(long)]
    no_srv: bool,

    /// Query again every N seconds until interrupted.
    #[arg(long, value_name = "SECS")]
    watch: Option<u64>,

    /// More log output, repeat for more.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None if std::path::Path::new(DEFAULT_CONFIG_FILE).exists() => {
            Config::load(DEFAULT_CONFIG_FILE)
                .with_context(|| format!("loading {}", DEFAULT_CONFIG_FILE))?
        }
        None => Config::default(),
    };

    if args.api {
        config.query.strategy = Strategy::Api;
    }
    if let Some(provider) = args.provider {
        config.api.provider = provider;
    }
    if args.no_retry {
        config.api.allow_retry = false;
    }
    if args.proxy {
        config.api.use_proxy = true;
    }
    if let Some(timeout) = args.timeout {
        config.query.timeout_ms = timeout;
    }
    if args.no_srv {
        config.query.srv = false;
    }
    if let Some(secs) = args.watch {
        config.refresh.enabled = true;
        config.refresh.interval_secs = secs;
    }

    config.validate()?;

    Ok(config)
}

async fn run_once(config: &Config, target: &Conf) -> Result<(), StatusErr> {
    match query_with_strategy(config, target).await? {
        Some(status) => println!("{}", status),
        None => warn!("no status provider answered for {}", target),
    }

    Ok(())
}

fn report(err: &StatusErr) {
    if err.is_unreachable() {
        error!("server unreachable: {}", err);
    } else {
        error!("server sent an unusable status: {}", err);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = load_config(&args)?;
    let target = match &args.address {
        Some(address) => Conf::create_from_str(address)?,
        None => Conf::create_with_port(&config.server.host, config.server.port)?,
    }
    .with_timeout(config.query.timeout())
    .with_srv(config.query.srv);

    if !config.refresh.enabled {
        return run_once(&config, &target).await.map_err(|err| {
            report(&err);
            err.into()
        });
    }

    info!(
        "polling {} every {}s",
        target, config.refresh.interval_secs
    );

    watch(&config, &target, async {
        tokio::signal::ctrl_c().await.ok();
    })
    .await;
    info!("interrupted");

    Ok(())
}

/// Query `target` on every refresh tick until `shutdown` completes,
/// including while a query is still waiting on the server.
async fn watch(config: &Config, target: &Conf, shutdown: impl Future<Output = ()>) {
    let mut interval = tokio::time::interval(Duration::from_secs(config.refresh.interval_secs));
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => return,
            _ = interval.tick() => {}
        }

        tokio::select! {
            _ = &mut shutdown => return,
            result = run_once(config, target) => {
                if let Err(err) = result {
                    report(&err);
                }
            }
        }
    }
}
