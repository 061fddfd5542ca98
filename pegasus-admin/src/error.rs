//! Error types for transport and executor operations

use crate::types::MetaFunctionLevel;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the RPC transport and the remote service.
///
/// Serializable so a remote peer can return it through tarpc.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum ClusterError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Node unavailable: {0}")]
    NodeUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Remote error: {0}")]
    Remote(String),
}

impl ClusterError {
    /// Get the error type as a string for metrics labeling
    pub fn error_type(&self) -> &'static str {
        match self {
            ClusterError::Connection(_) => "connection",
            ClusterError::Transport(_) => "transport",
            ClusterError::Tls(_) => "tls",
            ClusterError::Timeout(_) => "timeout",
            ClusterError::NodeUnavailable(_) => "node_unavailable",
            ClusterError::Config(_) => "config",
            ClusterError::Remote(_) => "remote",
        }
    }

    /// Whether the error means the peer did not answer in time
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClusterError::Timeout(_))
    }

    /// Connection-level failure: the peer is unreachable or the link broke
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            ClusterError::Connection(_)
                | ClusterError::Transport(_)
                | ClusterError::NodeUnavailable(_)
        )
    }
}

impl From<tarpc::client::RpcError> for ClusterError {
    fn from(err: tarpc::client::RpcError) -> Self {
        match err {
            tarpc::client::RpcError::DeadlineExceeded => {
                ClusterError::Timeout("request deadline exceeded".to_string())
            }
            tarpc::client::RpcError::Shutdown => {
                ClusterError::Connection("client dispatch shut down".to_string())
            }
            other => ClusterError::Transport(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClusterError>;

/// Errors surfaced by the admin executors to their caller.
#[derive(Error, Debug)]
pub enum AdminError {
    /// Operator input is not a known meta function level. No RPC was issued.
    #[error(
        "Invalid meta function level '{0}', \
         expected one of: stopped, blind, freezed, steady, lively"
    )]
    InvalidLevel(String),

    #[error("{operation} timed out after {}ms", .timeout.as_millis())]
    RpcTimeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("{operation} failed: {reason}")]
    RpcFailure {
        operation: &'static str,
        reason: String,
    },

    /// The outcome of a level change is unknown to the client.
    #[error(
        "Failed to change meta function level to {target}: {source}. \
         The current level is unknown, re-read it with get_level"
    )]
    LevelChangeFailed {
        target: MetaFunctionLevel,
        source: Box<AdminError>,
    },

    #[error("Node discovery failed: {0}")]
    DiscoveryFailure(String),

    #[error("Meta server reported no data nodes")]
    NoNodesFound,

    #[error("All {total} nodes failed to report perf counters")]
    AllNodesFailed { total: usize },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AdminError {
    /// Get the error type as a string for metrics labeling
    pub fn error_type(&self) -> &'static str {
        match self {
            AdminError::InvalidLevel(_) => "invalid_level",
            AdminError::RpcTimeout { .. } => "rpc_timeout",
            AdminError::RpcFailure { .. } => "rpc_failure",
            AdminError::LevelChangeFailed { source, .. } => source.error_type(),
            AdminError::DiscoveryFailure(_) => "discovery_failure",
            AdminError::NoNodesFound => "no_nodes_found",
            AdminError::AllNodesFailed { .. } => "all_nodes_failed",
            AdminError::Config(_) => "config",
        }
    }
}
