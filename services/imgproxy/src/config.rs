//! Service configuration from flags and environment.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Pull-through image cache server.
#[derive(Debug, Clone, Parser)]
#[command(name = "imgproxy")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Address to listen on, `host:port` or `:port` for all interfaces.
    #[arg(long, env = "IMGPROXY_ADDRESS", default_value = ":8081", value_parser = parse_listen_addr)]
    pub address: SocketAddr,

    /// Directory holding the cache shards.
    #[arg(long, env = "IMGPROXY_CACHE_DIR", default_value = ".")]
    pub cache_dir: PathBuf,

    /// Deadline for a single origin fetch, in seconds.
    #[arg(long, env = "IMGPROXY_FETCH_TIMEOUT_SECS", default_value_t = 10)]
    pub fetch_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    #[arg(long, env = "IMGPROXY_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// Parse a listen address, accepting the `:port` shorthand.
fn parse_listen_addr(s: &str) -> Result<SocketAddr, String> {
    if let Some(port) = s.strip_prefix(':') {
        let port: u16 = port
            .parse()
            .map_err(|e| format!("invalid port in {s:?}: {e}"))?;
        return Ok(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)));
    }

    s.parse()
        .map_err(|e| format!("invalid listen address {s:?}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(":8081", "0.0.0.0:8081")]
    #[case("127.0.0.1:9000", "127.0.0.1:9000")]
    #[case("[::1]:8081", "[::1]:8081")]
    fn test_parse_listen_addr(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(
            parse_listen_addr(input).unwrap(),
            expected.parse::<SocketAddr>().unwrap()
        );
    }

    #[rstest]
    #[case("")]
    #[case(":")]
    #[case(":http")]
    #[case(":70000")]
    #[case("localhost")]
    fn test_parse_listen_addr_invalid(#[case] input: &str) {
        assert!(parse_listen_addr(input).is_err());
    }

    #[test]
    fn test_flags() {
        let config = Config::try_parse_from([
            "imgproxy",
            "--address",
            ":9090",
            "--cache-dir",
            "/var/cache/img",
            "--fetch-timeout-secs",
            "3",
        ])
        .unwrap();

        assert_eq!(config.address, "0.0.0.0:9090".parse::<SocketAddr>().unwrap());
        assert_eq!(config.cache_dir, PathBuf::from("/var/cache/img"));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_rejects_bad_address() {
        assert!(Config::try_parse_from(["imgproxy", "--address", "nope"]).is_err());
    }
}
