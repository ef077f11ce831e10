use async_trait::async_trait;
use hickory_resolver::{
    config::{ResolverConfig, ResolverOpts},
    TokioAsyncResolver,
};
use std::net::IpAddr;
use tracing::debug;

/// Looks up `_minecraft._tcp` SRV records.
///
/// Resolution is best effort: `None` means "connect to the address as given",
/// whatever the reason.
#[async_trait]
pub trait SrvResolve: Send + Sync {
    /// Resolve `name` to the first `(target, port)` pair it advertises.
    async fn lookup_srv(&self, name: &str) -> Option<(String, u16)>;
}

/// Resolver backed by the system DNS configuration.
pub struct SystemResolver {
    inner: TokioAsyncResolver,
}

impl SystemResolver {
    pub fn new() -> Self {
        let inner = TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|err| {
            debug!("system resolver config unavailable ({}), using defaults", err);
            TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
        });

        Self { inner }
    }
}

impl Default for SystemResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SrvResolve for SystemResolver {
    async fn lookup_srv(&self, name: &str) -> Option<(String, u16)> {
        let lookup = match self.inner.srv_lookup(name).await {
            Ok(lookup) => lookup,
            Err(err) => {
                debug!("no SRV record for {}: {}", name, err);
                return None;
            }
        };

        lookup.iter().find_map(|srv| {
            let target = srv.target().to_utf8();
            let target = target.trim_end_matches('.');

            // "." with port 0 means the service is deliberately unavailable
            if target.is_empty() || srv.port() == 0 {
                None
            } else {
                Some((target.to_string(), srv.port()))
            }
        })
    }
}

/// Resolver that never redirects.
pub struct NoSrv;

#[async_trait]
impl SrvResolve for NoSrv {
    async fn lookup_srv(&self, _name: &str) -> Option<(String, u16)> {
        None
    }
}

/// Apply SRV redirection to a target, keeping it unchanged when there is nothing to follow.
pub async fn resolve_target<R>(resolver: &R, host: &str, port: u16) -> (String, u16)
where
    R: SrvResolve + ?Sized,
{
    if host.parse::<IpAddr>().is_ok() {
        return (host.to_string(), port);
    }

    match resolver
        .lookup_srv(&format!("_minecraft._tcp.{}", host))
        .await
    {
        Some((target, srv_port)) => {
            debug!("{}:{} redirected by SRV to {}:{}", host, port, target, srv_port);
            (target, srv_port)
        }
        None => (host.to_string(), port),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SrvResolve for Fixed {
        async fn lookup_srv(&self, name: &str) -> Option<(String, u16)> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (name == "_minecraft._tcp.example.com").then(|| ("mc.example.net".to_string(), 25570))
        }
    }

    #[tokio::test]
    async fn follows_redirect() {
        let resolver = Fixed {
            calls: AtomicUsize::new(0),
        };

        assert_eq!(
            resolve_target(&resolver, "example.com", 25565).await,
            ("mc.example.net".to_string(), 25570)
        );
        assert_eq!(
            resolve_target(&resolver, "other.com", 25565).await,
            ("other.com".to_string(), 25565)
        );
    }

    #[tokio::test]
    async fn skips_ip_literals() {
        let resolver = Fixed {
            calls: AtomicUsize::new(0),
        };

        assert_eq!(
            resolve_target(&resolver, "127.0.0.1", 1234).await,
            ("127.0.0.1".to_string(), 1234)
        );
        assert_eq!(
            resolve_target(&resolver, "::1", 1234).await,
            ("::1".to_string(), 1234)
        );
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn no_srv_keeps_target() {
        assert_eq!(
            resolve_target(&NoSrv, "example.com", 25565).await,
            ("example.com".to_string(), 25565)
        );
    }
}
