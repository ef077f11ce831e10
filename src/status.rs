use serde::Serialize;

/// Icon shown when a server does not advertise a favicon.
pub const DEFAULT_ICON: &str = "/assets/default.png";
/// Label used when neither the query nor the provider names the server.
pub const DEFAULT_NAME: &str = "A Minecraft Server";

/// Player counts and the names the server chose to share.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Players {
    pub online: i64,
    pub max: i64,
    pub list: Vec<String>,
}

/// Which query path produced a [ServerStatus].
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Direct,
    Api,
}

/// Canonical server status, identical in shape for both query paths.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ServerStatus {
    pub online: bool,
    /// The server is blocked by Mojang for violating the EULA.
    pub banned: bool,
    pub icon: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub motd: String,
    pub version: String,
    pub players: Players,
    /// Round trip in milliseconds, only known for direct queries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency: Option<u64>,
    pub source: Source,
}

impl std::fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            serde_json::to_string_pretty(self).map_err(|_| std::fmt::Error)?
        )
    }
}
