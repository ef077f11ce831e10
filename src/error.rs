/// Errors produced by the VarInt codec.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VarIntErr {
    /// The value cannot be represented, or the input never terminates.
    #[error("invalid VarInt: {0}")]
    Encoding(String),
    /// The buffer ended before a terminating byte was found.
    #[error("VarInt starting at offset {offset} is truncated")]
    Truncated { offset: usize },
}

/// Failures reaching a server, either directly or through a status API.
#[derive(Debug, thiserror::Error)]
pub enum QueryErr {
    #[error("invalid target {target}: {reason}")]
    InvalidTarget { target: String, reason: String },
    #[error("failed to connect to {target}: {reason}")]
    ConnectionFailed { target: String, reason: String },
    #[error("server did not answer within {0} ms")]
    Timeout(u64),
    #[error("connection closed before a status response arrived")]
    NoResponse,
    #[error("invalid status response: {0}")]
    InvalidResponse(String),
    /// Every provider tried during the call failed.
    #[error("all status providers failed (tried {attempted:?}): {last_error}")]
    AllProvidersFailed {
        attempted: Vec<usize>,
        last_error: String,
    },
    #[error("no status provider at index {0}")]
    UnknownProvider(usize),
    #[error("query cancelled")]
    Cancelled,
}

/// The upstream payload was reachable but could not be mapped to a [ServerStatus](crate::ServerStatus).
#[derive(Debug, thiserror::Error)]
pub enum NormalizeErr {
    #[error("status payload has no {0}")]
    MissingField(&'static str),
    #[error("malformed status payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Error returned by the public query entrypoints.
#[derive(Debug, thiserror::Error)]
pub enum StatusErr {
    #[error(transparent)]
    Query(#[from] QueryErr),
    #[error(transparent)]
    Normalize(#[from] NormalizeErr),
}

impl StatusErr {
    /// Whether the server could not be reached at all, as opposed to answering with garbage.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, StatusErr::Query(_))
    }
}

/// Problems loading a [Config](crate::Config).
#[derive(Debug, thiserror::Error)]
pub enum ConfigErr {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
