//! Mapping of query results onto [ServerStatus].
//!
//! Each recognised input shape owns its field fallbacks, so the rest of the
//! crate never probes raw JSON.

use crate::{
    share::strip_formatting,
    status::{Players, ServerStatus, Source, DEFAULT_ICON, DEFAULT_NAME},
    NormalizeErr, SlpServer,
};
use serde::Deserialize;
use serde_json::Value;

const UNKNOWN_VERSION: &str = "unknown";

/// A status payload in one of the recognised shapes.
#[derive(Debug, Clone)]
pub enum RawStatus {
    /// Result of a direct Server List Ping.
    Slp(SlpServer),
    /// JSON body returned by a third-party status API.
    Provider(Value),
}

impl RawStatus {
    pub fn normalize(self) -> Result<ServerStatus, NormalizeErr> {
        match self {
            RawStatus::Slp(server) => Ok(from_slp(server)),
            RawStatus::Provider(value) => from_provider(serde_json::from_value(value)?),
        }
    }
}

fn from_slp(server: SlpServer) -> ServerStatus {
    ServerStatus {
        online: true,
        banned: false,
        icon: server.favicon.unwrap_or_else(|| DEFAULT_ICON.to_string()),
        name: server.host,
        port: Some(server.port),
        motd: server.motd,
        version: format!("{} ({})", server.version, server.protocol),
        players: server.players,
        latency: Some(server.latency),
        source: Source::Direct,
    }
}

/// One string, or one string per line as mcsrvstat returns them.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum Lines {
    One(String),
    Many(Vec<String>),
}

impl Lines {
    fn join(self) -> String {
        match self {
            Lines::One(line) => line,
            Lines::Many(lines) => lines.join(" "),
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum ProviderMotd {
    Plain(String),
    Formatted {
        html: Option<Lines>,
        clean: Option<Lines>,
        raw: Option<Lines>,
    },
}

impl ProviderMotd {
    /// HTML is kept as-is, clean text is already stripped, raw text still carries codes.
    fn text(self) -> Option<String> {
        match self {
            ProviderMotd::Plain(text) => Some(strip_formatting(&text)),
            ProviderMotd::Formatted { html, clean, raw } => html
                .map(Lines::join)
                .or_else(|| clean.map(Lines::join))
                .or_else(|| raw.map(|raw| strip_formatting(&raw.join()))),
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum ProviderVersion {
    Name(String),
    Detailed {
        name_html: Option<String>,
        name_clean: Option<String>,
        name: Option<String>,
        name_raw: Option<String>,
        protocol: Option<i32>,
    },
}

#[derive(Deserialize, Debug)]
struct ProviderProtocol {
    version: Option<i32>,
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum ProviderPlayer {
    Name(String),
    Entry {
        name: Option<String>,
        name_clean: Option<String>,
        name_raw: Option<String>,
    },
}

impl ProviderPlayer {
    fn name(self) -> Option<String> {
        match self {
            ProviderPlayer::Name(name) => Some(name),
            ProviderPlayer::Entry {
                name,
                name_clean,
                name_raw,
            } => name
                .or(name_clean)
                .or_else(|| name_raw.map(|raw| strip_formatting(&raw))),
        }
    }
}

#[derive(Deserialize, Debug)]
struct ProviderPlayers {
    online: Option<i64>,
    max: Option<i64>,
    #[serde(alias = "list")]
    sample: Option<Vec<ProviderPlayer>>,
}

#[derive(Deserialize, Debug)]
struct ProviderStatus {
    online: Option<bool>,
    eula_blocked: Option<bool>,
    host: Option<String>,
    hostname: Option<String>,
    port: Option<u16>,
    icon: Option<String>,
    favicon: Option<String>,
    motd: Option<ProviderMotd>,
    version: Option<ProviderVersion>,
    protocol: Option<ProviderProtocol>,
    players: Option<ProviderPlayers>,
}

fn from_provider(status: ProviderStatus) -> Result<ServerStatus, NormalizeErr> {
    let online = status.online.unwrap_or(true);
    let name = status
        .host
        .or(status.hostname)
        .unwrap_or_else(|| DEFAULT_NAME.to_string());
    let icon = status
        .icon
        .or(status.favicon)
        .unwrap_or_else(|| DEFAULT_ICON.to_string());

    let motd = match status.motd.and_then(ProviderMotd::text) {
        Some(motd) => motd,
        // offline servers come back without any details
        None if !online => String::new(),
        None => return Err(NormalizeErr::MissingField("motd")),
    };

    let (label, protocol) = match status.version {
        Some(ProviderVersion::Name(name)) => (Some(name), None),
        Some(ProviderVersion::Detailed {
            name_html,
            name_clean,
            name,
            name_raw,
            protocol,
        }) => (
            name_html
                .or(name_clean)
                .or(name)
                .or_else(|| name_raw.map(|raw| strip_formatting(&raw))),
            protocol,
        ),
        None => (None, None),
    };
    let protocol = protocol.or(status.protocol.and_then(|p| p.version));
    let label = label.unwrap_or_else(|| UNKNOWN_VERSION.to_string());
    let version = match protocol {
        Some(protocol) => format!("{} ({})", label, protocol),
        None => label,
    };

    let players = match status.players {
        Some(players) => Players {
            online: players.online.unwrap_or(0),
            max: players.max.unwrap_or(0),
            list: players
                .sample
                .unwrap_or_default()
                .into_iter()
                .filter_map(ProviderPlayer::name)
                .collect(),
        },
        None => Players::default(),
    };

    Ok(ServerStatus {
        online,
        banned: status.eula_blocked.unwrap_or(false),
        icon,
        name,
        port: status.port,
        motd,
        version,
        players,
        latency: None,
        source: Source::Api,
    })
}
