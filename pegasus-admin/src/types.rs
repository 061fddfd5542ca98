//! Shared types for cluster administration
//!
//! Wire types are plain serde structs, carried over tarpc with bincode.
//! Meta function levels travel as their thrift-compatible numeric codes so
//! that the read-only sentinel never has to exist as an enum member.

use crate::error::AdminError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Wire code the meta server interprets as "report the level, change nothing".
pub const LEVEL_INVALID_CODE: u32 = 10000;

/// Cluster-wide operating mode held by the meta server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetaFunctionLevel {
    /// Meta server is stopped and serves nothing
    Stopped,
    /// Meta server answers queries but takes no action on the cluster
    Blind,
    /// Replica config changes are frozen, no node failure handling
    Freezed,
    /// Failure handling only, no load balancing
    Steady,
    /// Failure handling and load balancing
    Lively,
}

impl MetaFunctionLevel {
    /// Every valid level, ordered by wire code
    pub const ALL: [MetaFunctionLevel; 5] = [
        MetaFunctionLevel::Stopped,
        MetaFunctionLevel::Blind,
        MetaFunctionLevel::Freezed,
        MetaFunctionLevel::Steady,
        MetaFunctionLevel::Lively,
    ];

    pub fn code(&self) -> u32 {
        match self {
            MetaFunctionLevel::Stopped => 100,
            MetaFunctionLevel::Blind => 200,
            MetaFunctionLevel::Freezed => 300,
            MetaFunctionLevel::Steady => 400,
            MetaFunctionLevel::Lively => 500,
        }
    }

    /// Decode a wire code. The invalid sentinel and unknown codes yield `None`.
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.code() == code)
    }

    /// Canonical name as printed by the cluster tools (`fl_steady`)
    pub fn as_str(&self) -> &'static str {
        match self {
            MetaFunctionLevel::Stopped => "fl_stopped",
            MetaFunctionLevel::Blind => "fl_blind",
            MetaFunctionLevel::Freezed => "fl_freezed",
            MetaFunctionLevel::Steady => "fl_steady",
            MetaFunctionLevel::Lively => "fl_lively",
        }
    }
}

impl fmt::Display for MetaFunctionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetaFunctionLevel {
    type Err = AdminError;

    /// Case-insensitive, `fl_` prefix optional, `freeze` accepted for `freezed`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let name = normalized.strip_prefix("fl_").unwrap_or(&normalized);
        match name {
            "stopped" => Ok(MetaFunctionLevel::Stopped),
            "blind" => Ok(MetaFunctionLevel::Blind),
            "freezed" | "freeze" => Ok(MetaFunctionLevel::Freezed),
            "steady" => Ok(MetaFunctionLevel::Steady),
            "lively" => Ok(MetaFunctionLevel::Lively),
            _ => Err(AdminError::InvalidLevel(s.to_string())),
        }
    }
}

/// Request for the meta server's `meta_control` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaControlRequest {
    pub level: u32,
}

impl MetaControlRequest {
    /// Read-only query: carries the invalid sentinel
    pub fn query() -> Self {
        Self {
            level: LEVEL_INVALID_CODE,
        }
    }

    pub fn transition(level: MetaFunctionLevel) -> Self {
        Self { level: level.code() }
    }

    pub fn is_query(&self) -> bool {
        self.level == LEVEL_INVALID_CODE
    }
}

/// Response of `meta_control`: the level before and after the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaControlResponse {
    pub old_level: u32,
    pub new_level: u32,
}

/// Old and new level of a transition, as reported by the meta server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelTransition {
    pub old_level: MetaFunctionLevel,
    pub new_level: MetaFunctionLevel,
}

impl LevelTransition {
    pub fn is_noop(&self) -> bool {
        self.old_level == self.new_level
    }
}

/// Role a node plays in the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    #[default]
    Replica,
    Meta,
}

/// Liveness as last observed by the meta server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Alive,
    Unalive,
}

/// Identity of a data node, as returned by `list_nodes`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    /// Node address (host:port)
    pub address: String,
    #[serde(default)]
    pub role: NodeRole,
    #[serde(default)]
    pub status: NodeStatus,
}

impl NodeDescriptor {
    /// Create an alive replica node descriptor
    pub fn replica(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            role: NodeRole::Replica,
            status: NodeStatus::Alive,
        }
    }
}

/// Counters requested from a node's `perf-counters` remote command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerfCounterQuery {
    /// Counter names; empty means every counter the node exposes
    pub names: Vec<String>,
}

impl PerfCounterQuery {
    pub const COMMAND: &'static str = "perf-counters";

    pub fn all() -> Self {
        Self::default()
    }

    pub fn names<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parse_case_insensitive() {
        assert_eq!("steady".parse::<MetaFunctionLevel>().unwrap(), MetaFunctionLevel::Steady);
        assert_eq!("LIVELY".parse::<MetaFunctionLevel>().unwrap(), MetaFunctionLevel::Lively);
        assert_eq!("Fl_Blind".parse::<MetaFunctionLevel>().unwrap(), MetaFunctionLevel::Blind);
        assert_eq!(" stopped ".parse::<MetaFunctionLevel>().unwrap(), MetaFunctionLevel::Stopped);
    }

    #[test]
    fn test_level_parse_freeze_alias() {
        assert_eq!("freeze".parse::<MetaFunctionLevel>().unwrap(), MetaFunctionLevel::Freezed);
        assert_eq!("fl_freezed".parse::<MetaFunctionLevel>().unwrap(), MetaFunctionLevel::Freezed);
    }

    #[test]
    fn test_level_parse_rejects_unknown() {
        for bad in ["", "invalid", "fl_invalid", "not-a-real-level", "fl_", "steadyy"] {
            let err = bad.parse::<MetaFunctionLevel>().unwrap_err();
            assert!(matches!(err, AdminError::InvalidLevel(ref s) if s == bad), "{bad}");
        }
    }

    #[test]
    fn test_level_display_parses_back() {
        for level in MetaFunctionLevel::ALL {
            assert_eq!(level.to_string().parse::<MetaFunctionLevel>().unwrap(), level);
        }
    }

    #[test]
    fn test_level_codes() {
        assert_eq!(MetaFunctionLevel::Steady.code(), 400);
        assert_eq!(MetaFunctionLevel::from_code(500), Some(MetaFunctionLevel::Lively));
        assert_eq!(MetaFunctionLevel::from_code(LEVEL_INVALID_CODE), None);
        assert_eq!(MetaFunctionLevel::from_code(7), None);
    }

    #[test]
    fn test_meta_control_request() {
        assert!(MetaControlRequest::query().is_query());
        let req = MetaControlRequest::transition(MetaFunctionLevel::Freezed);
        assert!(!req.is_query());
        assert_eq!(req.level, 300);
    }

    #[test]
    fn test_node_descriptor_serde_defaults() {
        let node: NodeDescriptor = serde_json::from_str(r#"{"address":"10.0.0.1:34801"}"#).unwrap();
        assert_eq!(node, NodeDescriptor::replica("10.0.0.1:34801"));

        let json = serde_json::to_string(&NodeDescriptor {
            address: "10.0.0.2:34601".into(),
            role: NodeRole::Meta,
            status: NodeStatus::Unalive,
        })
        .unwrap();
        assert!(json.contains(r#""role":"meta""#));
        assert!(json.contains(r#""status":"unalive""#));
    }
}
