//! Per-node perf samples and payload parsing

use crate::error::ClusterError;
use crate::rpc::CallError;
use crate::types::NodeDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Outcome of one node's perf counter query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeHealth {
    Ok,
    Timeout,
    Unreachable,
    Malformed,
}

impl NodeHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeHealth::Ok => "ok",
            NodeHealth::Timeout => "timeout",
            NodeHealth::Unreachable => "unreachable",
            NodeHealth::Malformed => "malformed",
        }
    }

    /// Tag for a failed call
    pub fn from_call_error(err: &CallError) -> Self {
        if err.is_timeout() {
            return NodeHealth::Timeout;
        }
        match err {
            // A node that answered with an error still produced no usable counters.
            CallError::Failed(ClusterError::Remote(_)) => NodeHealth::Malformed,
            _ => NodeHealth::Unreachable,
        }
    }
}

/// Perf snapshot of one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeStatSample {
    pub node: NodeDescriptor,
    pub health: NodeHealth,
    /// Counter values; empty unless `health` is `ok`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub counters: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Time spent on the query, excluding time waiting for a concurrency slot
    pub elapsed_ms: u64,
}

impl NodeStatSample {
    pub fn ok(node: NodeDescriptor, counters: BTreeMap<String, f64>, elapsed_ms: u64) -> Self {
        Self {
            node,
            health: NodeHealth::Ok,
            counters,
            error: None,
            elapsed_ms,
        }
    }

    pub fn failed(
        node: NodeDescriptor,
        health: NodeHealth,
        error: impl Into<String>,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            node,
            health,
            counters: BTreeMap::new(),
            error: Some(error.into()),
            elapsed_ms,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.health == NodeHealth::Ok
    }
}

/// Reason a perf counter payload was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed perf counter payload: {0}")]
pub struct MalformedPayload(pub String);

#[derive(Deserialize)]
struct RawPayload {
    #[serde(default)]
    result: Option<String>,
    counters: Vec<RawCounter>,
}

#[derive(Deserialize)]
struct RawCounter {
    name: String,
    value: serde_json::Value,
}

/// Parse the JSON output of a node's `perf-counters` command
pub fn parse_perf_counters(payload: &str) -> Result<BTreeMap<String, f64>, MalformedPayload> {
    let raw: RawPayload =
        serde_json::from_str(payload).map_err(|e| MalformedPayload(e.to_string()))?;

    if let Some(result) = raw.result.as_deref() {
        if !result.eq_ignore_ascii_case("ok") {
            return Err(MalformedPayload(format!("node reported result '{}'", result)));
        }
    }

    let mut counters = BTreeMap::new();
    for counter in raw.counters {
        let value = counter
            .value
            .as_f64()
            .filter(|v| v.is_finite())
            .ok_or_else(|| {
                MalformedPayload(format!(
                    "counter '{}' has non-numeric value {}",
                    counter.name, counter.value
                ))
            })?;
        if counters.insert(counter.name.clone(), value).is_some() {
            return Err(MalformedPayload(format!("duplicate counter '{}'", counter.name)));
        }
    }

    Ok(counters)
}
