use crate::QueryErr;
use regex::Regex;
use std::{sync::LazyLock, time::Duration};
use tokio::net::TcpStream;

pub const DEFAULT_SERVER_PORT: u16 = 25565;

static FORMAT_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("§[0-9a-fk-or]").expect("format code pattern is valid"));

/// Open a TCP connection, giving up after `timeout`.
///
/// Both a refused connection and an expired connect timeout are reported as
/// [QueryErr::ConnectionFailed].
pub async fn create_tcp_socket(
    host: &str,
    port: u16,
    timeout: Duration,
) -> Result<TcpStream, QueryErr> {
    let target = format!("{}:{}", host, port);

    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(socket)) => {
            socket.set_nodelay(true).ok();
            Ok(socket)
        }
        Ok(Err(err)) => Err(QueryErr::ConnectionFailed {
            target,
            reason: err.to_string(),
        }),
        Err(_) => Err(QueryErr::ConnectionFailed {
            target,
            reason: format!("connect timed out after {} ms", timeout.as_millis()),
        }),
    }
}

pub fn is_valid_port(port: u16) -> bool {
    port != 0
}

/// Remove `§` formatting codes and put each line break on a single space.
///
/// Stripping runs until nothing changes, so input such as `§§aa` cannot leave a
/// new code behind and the result is stable when stripped again.
pub fn strip_formatting(text: &str) -> String {
    let mut current = text.replace("\r\n", "\n");

    loop {
        let stripped = FORMAT_CODE.replace_all(&current, "");

        if stripped.len() == current.len() {
            break;
        }
        current = stripped.into_owned();
    }

    current.replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_color_and_style_codes() {
        assert_eq!(strip_formatting("A §aColorful§r Server"), "A Colorful Server");
        assert_eq!(
            strip_formatting("§0§1§2§3§4§5§6§7§8§9§a§b§c§d§e§f§k§l§m§n§o§rplain"),
            "plain"
        );
    }

    #[test]
    fn keeps_unknown_codes() {
        assert_eq!(strip_formatting("§zkeep §Xthis"), "§zkeep §Xthis");
    }

    #[test]
    fn collapses_newlines() {
        assert_eq!(strip_formatting("line one\nline two"), "line one line two");
        assert_eq!(strip_formatting("§6top\r\n§7bottom"), "top bottom");
    }

    #[test]
    fn stripping_is_idempotent() {
        for input in ["A §aColorful§r Server", "§§aa", "§§§aaa\n§", "nothing here"] {
            let once = strip_formatting(input);
            assert_eq!(strip_formatting(&once), once, "input {:?}", input);
        }
        assert_eq!(strip_formatting("§§aa"), "");
    }

    #[test]
    fn port_zero_is_invalid() {
        assert!(!is_valid_port(0));
        assert!(is_valid_port(1));
        assert!(is_valid_port(DEFAULT_SERVER_PORT));
    }
}
