use super::packet::{
    build_handshake_packet, build_status_request_packet, parse_status_frame, Frame, MAX_PACKET_LEN,
};
use crate::{
    share::{create_tcp_socket, strip_formatting},
    srv::{resolve_target, SrvResolve},
    status::Players,
    varint::MAX_VARINT_LEN,
    Conf, QueryErr,
};
use serde::{Deserialize, Serialize};
use std::{io::ErrorKind, time::Instant};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

const READ_CHUNK_SIZE: usize = 4096;
/// Largest packet plus its length prefix and one more read.
const MAX_BUFFERED: usize = MAX_PACKET_LEN + MAX_VARINT_LEN + READ_CHUNK_SIZE;

/// Server List Ping result.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SlpServer {
    /// Address actually queried, after SRV redirection.
    pub host: String,
    pub port: u16,
    /// Server version name, e.g. `1.20.1`.
    pub version: String,
    /// Protocol number of the server version.
    pub protocol: i32,
    /// Description with formatting codes removed.
    pub motd: String,
    pub players: Players,
    /// Server icon, base64 data URL.
    pub favicon: Option<String>,
    /// Whether the server enables enforces secure chat, default is false.
    pub enforces_secure_chat: bool,
    /// Milliseconds from connecting until the status arrived.
    pub latency: u64,
}

impl std::fmt::Display for SlpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            serde_json::to_string_pretty(self).map_err(|_| std::fmt::Error)?
        )
    }
}

#[derive(Deserialize, Debug)]
struct StatusJson {
    version: Version,
    players: PlayersJson,
    description: Description,
    #[serde(default)]
    favicon: Option<String>,
    #[serde(alias = "enforcesSecureChat", default)]
    enforces_secure_chat: Option<bool>,
}

#[derive(Deserialize, Debug)]
struct Version {
    name: String,
    protocol: i32,
}

#[derive(Deserialize, Debug)]
struct PlayersJson {
    #[serde(default)]
    max: i64,
    #[serde(default)]
    online: i64,
    #[serde(default)]
    sample: Option<Vec<Player>>,
}

#[derive(Deserialize, Debug)]
struct Player {
    #[serde(default)]
    name: String,
}

/// Server description, either a plain string or a chat component.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum Description {
    Text(String),
    Component {
        #[serde(default)]
        text: String,
        #[serde(default)]
        extra: Vec<Description>,
    },
}

impl Description {
    fn flatten(&self, out: &mut String) {
        match self {
            Description::Text(text) => out.push_str(text),
            Description::Component { text, extra } => {
                out.push_str(text);
                for part in extra {
                    part.flatten(out);
                }
            }
        }
    }
}

/// Query a Java Edition server (1.7+) with the
/// [Server List Ping](https://wiki.vg/Server_List_Ping#Current_.281.7.2B.29) protocol.
///
/// The target is redirected through SRV first when `resolver` finds a record.
/// Cancelling `cancel` aborts whichever step is in flight.
pub async fn get_server_status<R>(
    conf: &Conf,
    resolver: &R,
    cancel: &CancellationToken,
) -> Result<SlpServer, QueryErr>
where
    R: SrvResolve + ?Sized,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(QueryErr::Cancelled),
        result = ping(conf, resolver) => result,
    }
}

async fn ping<R>(conf: &Conf, resolver: &R) -> Result<SlpServer, QueryErr>
where
    R: SrvResolve + ?Sized,
{
    let deadline = Instant::now() + conf.timeout;
    let timed_out = || QueryErr::Timeout(conf.timeout.as_millis() as u64);

    let (host, port) =
        match tokio::time::timeout(conf.timeout, resolve_target(resolver, &conf.host, conf.port))
            .await
        {
            Ok(target) => target,
            // the lookup used up the whole budget, no time is left to connect
            Err(_) => {
                debug!("SRV lookup for {} outlived the deadline", conf.host);
                return Err(timed_out());
            }
        };

    let remaining = deadline.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        return Err(timed_out());
    }

    let started = Instant::now();
    let mut socket = create_tcp_socket(&host, port, remaining).await?;
    let remaining = deadline.saturating_duration_since(Instant::now());

    let body = match tokio::time::timeout(remaining, exchange_status(&mut socket, &host, port))
        .await
    {
        Ok(body) => body?,
        Err(_) => return Err(timed_out()),
    };
    let latency = started.elapsed().as_millis() as u64;

    debug!(
        "status from {}:{} ({} bytes, {} ms)",
        host,
        port,
        body.len(),
        latency
    );

    parse_status_body(&body, host, port, latency)
}

/// Send handshake and status request, then read until a full response has arrived.
async fn exchange_status(
    socket: &mut TcpStream,
    host: &str,
    port: u16,
) -> Result<Vec<u8>, QueryErr> {
    socket
        .write_all(&build_handshake_packet(host, port))
        .await
        .map_err(|err| stream_err(host, port, err))?;
    socket
        .write_all(&build_status_request_packet())
        .await
        .map_err(|err| stream_err(host, port, err))?;
    socket
        .flush()
        .await
        .map_err(|err| stream_err(host, port, err))?;

    let mut buffer = Vec::<u8>::new();
    let mut chunk = [0u8; READ_CHUNK_SIZE];

    loop {
        let read = socket
            .read(&mut chunk)
            .await
            .map_err(|err| stream_err(host, port, err))?;

        if read == 0 {
            return Err(QueryErr::NoResponse);
        }

        buffer.extend_from_slice(&chunk[..read]);

        if buffer.len() > MAX_BUFFERED {
            return Err(QueryErr::InvalidResponse(format!(
                "no status after {} bytes",
                buffer.len()
            )));
        }

        if let Frame::Complete(range) = parse_status_frame(&buffer)? {
            return Ok(buffer[range].to_vec());
        }
    }
}

/// A peer hanging up mid-exchange has simply not answered.
fn stream_err(host: &str, port: u16, err: std::io::Error) -> QueryErr {
    match err.kind() {
        ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::BrokenPipe
        | ErrorKind::UnexpectedEof => QueryErr::NoResponse,
        _ => QueryErr::ConnectionFailed {
            target: format!("{}:{}", host, port),
            reason: err.to_string(),
        },
    }
}

fn parse_status_body(
    body: &[u8],
    host: String,
    port: u16,
    latency: u64,
) -> Result<SlpServer, QueryErr> {
    let status = serde_json::from_slice::<StatusJson>(body)
        .map_err(|err| QueryErr::InvalidResponse(err.to_string()))?;

    let mut description = String::new();
    status.description.flatten(&mut description);

    Ok(SlpServer {
        host,
        port,
        version: status.version.name,
        protocol: status.version.protocol,
        motd: strip_formatting(&description),
        players: Players {
            online: status.players.online,
            max: status.players.max,
            list: status
                .players
                .sample
                .unwrap_or_default()
                .into_iter()
                .map(|player| player.name)
                .filter(|name| !name.is_empty())
                .collect(),
        },
        favicon: status.favicon,
        enforces_secure_chat: status.enforces_secure_chat.unwrap_or(false),
        latency,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<SlpServer, QueryErr> {
        parse_status_body(json.as_bytes(), "localhost".into(), 25565, 7)
    }

    #[test]
    fn parses_component_description() {
        let server = parse(
            r#"{"version":{"name":"1.20.1","protocol":763},"description":{"text":"A §aColorful§r Server"},"players":{"online":2,"max":20,"sample":[{"name":"Alice","id":"0"},{"name":"Bob","id":"1"}]}}"#,
        )
        .unwrap();

        assert_eq!(server.motd, "A Colorful Server");
        assert_eq!(server.version, "1.20.1");
        assert_eq!(server.protocol, 763);
        assert_eq!(server.players.online, 2);
        assert_eq!(server.players.max, 20);
        assert_eq!(server.players.list, vec!["Alice", "Bob"]);
        assert_eq!(server.latency, 7);
        assert!(server.favicon.is_none());
    }

    #[test]
    fn parses_string_description_and_flattens_extra() {
        let server = parse(
            r#"{"version":{"name":"Paper 1.21","protocol":767},"description":"§6Hello\n§7World","players":{"online":0,"max":100}}"#,
        )
        .unwrap();
        assert_eq!(server.motd, "Hello World");
        assert!(server.players.list.is_empty());

        let server = parse(
            r#"{"version":{"name":"1.21","protocol":767},"description":{"text":"","extra":[{"text":"Big ","color":"gold"},"Network",{"text":"","extra":[{"text":"!"}]}]},"players":{"online":1,"max":5,"sample":null},"enforcesSecureChat":true,"favicon":"data:image/png;base64,AAAA"}"#,
        )
        .unwrap();
        assert_eq!(server.motd, "Big Network!");
        assert!(server.enforces_secure_chat);
        assert_eq!(server.favicon.as_deref(), Some("data:image/png;base64,AAAA"));
    }

    #[test]
    fn missing_required_fields() {
        for json in [
            r#"{"description":"x","players":{"online":0,"max":0}}"#,
            r#"{"version":{"name":"1.20","protocol":763},"players":{"online":0,"max":0}}"#,
            r#"{"version":{"name":"1.20","protocol":763},"description":"x"}"#,
            "not json",
        ] {
            assert!(
                matches!(parse(json), Err(QueryErr::InvalidResponse(_))),
                "{}",
                json
            );
        }
    }
}
