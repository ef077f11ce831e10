use crate::{
    api::ApiQuerier,
    normalize::RawStatus,
    server::{self, SlpServer},
    share::{is_valid_port, DEFAULT_SERVER_PORT},
    srv::{NoSrv, SrvResolve, SystemResolver},
    status::ServerStatus,
    QueryErr, StatusErr,
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Target of a query.
///
/// By default, the port number for Java Edition is 25565.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conf {
    /// Server IP address or a domain name.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Deadline for a direct query, covering SRV lookup, connect and exchange.
    pub timeout: Duration,
    /// Follow `_minecraft._tcp` SRV records before connecting.
    pub srv: bool,
}

impl Conf {
    /// Create a query target using the default port.
    ///
    /// # Examples
    ///
    /// ```
    /// # use mcstat::Conf;
    /// #
    /// let conf = Conf::create("www.example.com");
    /// #
    /// # assert_eq!(conf.host, "www.example.com");
    /// # assert_eq!(conf.port, 25565);
    /// ```
    pub fn create(host: &str) -> Self {
        Self {
            host: host.trim().into(),
            port: DEFAULT_SERVER_PORT,
            timeout: DEFAULT_TIMEOUT,
            srv: true,
        }
    }

    /// Create a query target using the specified port.
    ///
    /// # Example
    ///
    /// ```
    /// # use mcstat::{Conf, QueryErr};
    /// #
    /// # fn main() -> Result<(), QueryErr> {
    /// let conf = Conf::create_with_port("www.example.com", 25566)?;
    /// #
    /// # assert_eq!(conf.port, 25566);
    /// # assert!(Conf::create_with_port("www.example.com", 0).is_err());
    /// # Ok(())
    /// # }
    /// ```
    pub fn create_with_port(host: &str, port: u16) -> Result<Self, QueryErr> {
        if !is_valid_port(port) {
            return Err(QueryErr::InvalidTarget {
                target: format!("{}:{}", host.trim(), port),
                reason: "port must be between 1 and 65535".into(),
            });
        }

        Ok(Self {
            port,
            ..Self::create(host)
        })
    }

    /// Create a query target from `host` or `host:port`.
    ///
    /// A bracketed IPv6 literal such as `[::1]:25565` is accepted as well.
    ///
    /// # Example
    ///
    /// ```
    /// # use mcstat::{Conf, QueryErr};
    /// #
    /// # fn main() -> Result<(), QueryErr> {
    /// let conf = Conf::create_from_str("www.example.com:25566")?;
    /// #
    /// # assert_eq!(conf.host, "www.example.com");
    /// # assert_eq!(conf.port, 25566);
    /// # assert_eq!(Conf::create_from_str("www.example.com")?.port, 25565);
    /// # assert!(Conf::create_from_str("www.example.com:-1").is_err());
    /// # Ok(())
    /// # }
    /// ```
    pub fn create_from_str(addr: &str) -> Result<Self, QueryErr> {
        let addr = addr.trim();
        let invalid = |reason: String| QueryErr::InvalidTarget {
            target: addr.to_string(),
            reason,
        };

        let (host, port) = if let Some(rest) = addr.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| invalid("unterminated IPv6 literal".into()))?;
            (host, tail.strip_prefix(':'))
        } else {
            match addr.rsplit_once(':') {
                // more than one colon is a bare IPv6 address
                Some((host, port)) if !host.contains(':') => (host, Some(port)),
                _ => (addr, None),
            }
        };

        if host.is_empty() {
            return Err(invalid("missing host".into()));
        }

        match port {
            Some(port) => match port.trim().parse::<u16>() {
                Ok(port) => Self::create_with_port(host, port),
                Err(_) => Err(invalid(format!("invalid port: {}", port))),
            },
            None => Ok(Self::create(host)),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_srv(mut self, srv: bool) -> Self {
        self.srv = srv;
        self
    }

    /// Ping the server directly, returning the raw [SlpServer].
    ///
    /// # Example
    ///
    /// ```no_run
    /// use mcstat::{Conf, QueryErr};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), QueryErr> {
    /// let server = Conf::create("www.example.com");
    /// let info = server.get_server_status().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_server_status(&self) -> Result<SlpServer, QueryErr> {
        self.get_server_status_with(&CancellationToken::new()).await
    }

    /// Like [Conf::get_server_status], aborting with [QueryErr::Cancelled] once `cancel` fires.
    pub async fn get_server_status_with(
        &self,
        cancel: &CancellationToken,
    ) -> Result<SlpServer, QueryErr> {
        if self.srv {
            server::get_server_status(self, &SystemResolver::new(), cancel).await
        } else {
            server::get_server_status(self, &NoSrv, cancel).await
        }
    }

    /// Ping through a caller supplied SRV resolver.
    pub async fn get_server_status_via<R>(
        &self,
        resolver: &R,
        cancel: &CancellationToken,
    ) -> Result<SlpServer, QueryErr>
    where
        R: SrvResolve + ?Sized,
    {
        server::get_server_status(self, resolver, cancel).await
    }

    /// Ping the server directly and normalize the result.
    pub async fn query_direct(&self) -> Result<ServerStatus, StatusErr> {
        let server = self.get_server_status().await?;

        Ok(RawStatus::Slp(server).normalize()?)
    }

    /// Ask a status API about the server and normalize the result.
    ///
    /// The port is passed on only when it differs from the default, so providers
    /// keep their own handling of plain hostnames.
    pub async fn query_via_api(
        &self,
        querier: &ApiQuerier,
        provider: usize,
        allow_retry: bool,
    ) -> Result<Option<ServerStatus>, StatusErr> {
        let port = (self.port != DEFAULT_SERVER_PORT).then_some(self.port);

        match querier.query(&self.host, port, provider, allow_retry).await? {
            Some(value) => Ok(Some(RawStatus::Provider(value).normalize()?)),
            None => Ok(None),
        }
    }
}

impl std::fmt::Display for Conf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
