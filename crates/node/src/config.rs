use std::{
    net::{Ipv4Addr, SocketAddr},
    time::Duration,
};

use ledger::{GenesisAnchored, LongestChain, ReplacementPolicy};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Longest candidate chain `POST /chain` will consider.
pub const MAX_CANDIDATE_BLOCKS: usize = 10_000;
/// Bound on one block's JSON encoding, pretty printed as an array element.
pub const MAX_ENCODED_BLOCK_BYTES: usize = 512;
/// Large enough for a candidate chain of [`MAX_CANDIDATE_BLOCKS`] blocks.
pub const DEFAULT_MAX_BODY_BYTES: usize = MAX_CANDIDATE_BLOCKS * MAX_ENCODED_BLOCK_BYTES;

/// Node configuration
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// HTTP listen address
    pub listen_addr: SocketAddr,

    /// Upper bound on the time spent serving one request
    pub request_timeout: Duration,

    /// Largest accepted request body
    pub max_body_bytes: usize,

    /// Only adopt candidate chains that share our genesis block
    pub anchor_genesis: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            anchor_genesis: false,
        }
    }
}

impl NodeConfig {
    pub fn replacement_policy(&self) -> Box<dyn ReplacementPolicy> {
        if self.anchor_genesis {
            Box::new(GenesisAnchored::new(LongestChain))
        } else {
            Box::new(LongestChain)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid listen address {0:?}: expected `port`, `:port` or `host:port`")]
    ListenAddr(String),
}

/// Parse a listen address.
///
/// A bare port (`8080` or `:8080`) listens on all interfaces.
pub fn parse_listen_addr(s: &str) -> Result<SocketAddr, ConfigError> {
    let s = s.trim();
    let port = s.strip_prefix(':').unwrap_or(s);
    if let Ok(port) = port.parse::<u16>() {
        return Ok(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)));
    }
    s.parse()
        .map_err(|_| ConfigError::ListenAddr(s.to_owned()))
}
