//! Cluster-wide perf counter aggregation
//!
//! Fan-out over every data node, tolerant of partial failure:
//!
//! ```text
//! list_nodes → [node 1, node 2, ...] → parse → reduce → NodesStat
//!                      ↓
//!     at most max_in_flight queries, each with its own deadline
//!                      ↓
//!     failures tagged per node (timeout / unreachable / malformed)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use pegasus_admin::stats::NodeStatsAggregator;
//!
//! let aggregator = NodeStatsAggregator::from_config(handle, &config);
//! let stat = aggregator.summarize(true).await?;
//!
//! if stat.aggregate.unhealthy > 0 {
//!     warn!("Excluded nodes: {:?}", stat.aggregate.excluded);
//! }
//! ```

mod reducer;
mod sample;

pub use reducer::{Reducer, ReducerTable};
pub use sample::{parse_perf_counters, MalformedPayload, NodeHealth, NodeStatSample};

use crate::config::AdminConfig;
use crate::error::AdminError;
use crate::handle::ClusterHandle;
use crate::metrics;
use crate::rpc::{with_deadline, CallError};
use crate::types::{NodeDescriptor, PerfCounterQuery};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Aggregation settings
#[derive(Debug, Clone)]
pub struct StatsOptions {
    /// Deadline for `list_nodes`
    pub discovery_timeout: Duration,
    /// Deadline for each node's query, started once it holds a slot
    pub node_timeout: Duration,
    /// Maximum simultaneous node queries
    pub max_in_flight: usize,
    /// Counters requested from each node
    pub query: PerfCounterQuery,
    pub reducers: ReducerTable,
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self::from_config(&AdminConfig::default())
    }
}

impl StatsOptions {
    pub fn from_config(config: &AdminConfig) -> Self {
        Self {
            discovery_timeout: config.discovery_timeout(),
            node_timeout: config.node_timeout(),
            max_in_flight: config.max_in_flight.max(1),
            query: PerfCounterQuery::names(config.stats.counters.iter().cloned()),
            reducers: ReducerTable::with_overrides(
                &config.stats.reducers,
                config.stats.default_reducer,
            ),
        }
    }
}

/// A node left out of the aggregate, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeExclusion {
    pub address: String,
    pub health: NodeHealth,
}

/// Cluster-wide reduction over the nodes that answered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedStats {
    /// Reduced counter values over healthy nodes only
    pub counters: BTreeMap<String, f64>,
    /// Number of healthy nodes that reported each counter
    pub coverage: BTreeMap<String, usize>,
    pub total_nodes: usize,
    pub healthy_nodes: usize,
    pub unhealthy: usize,
    /// Nodes whose counters are not part of `counters`
    pub excluded: Vec<NodeExclusion>,
}

impl AggregatedStats {
    /// Reduce samples; non-`ok` samples are excluded and listed
    pub fn from_samples(samples: &[NodeStatSample], reducers: &ReducerTable) -> Self {
        let (counters, coverage) = reducers.reduce(
            samples
                .iter()
                .filter(|s| s.is_ok())
                .map(|s| &s.counters),
        );
        let excluded: Vec<NodeExclusion> = samples
            .iter()
            .filter(|s| !s.is_ok())
            .map(|s| NodeExclusion {
                address: s.node.address.clone(),
                health: s.health,
            })
            .collect();

        Self {
            counters,
            coverage,
            total_nodes: samples.len(),
            healthy_nodes: samples.len() - excluded.len(),
            unhealthy: excluded.len(),
            excluded,
        }
    }
}

/// Result of a summary: aggregate plus per-node detail when requested
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodesStat {
    pub aggregate: AggregatedStats,
    /// Per-node samples in discovery order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<NodeStatSample>>,
}

/// Fan-out perf counter collector
pub struct NodeStatsAggregator {
    handle: Arc<dyn ClusterHandle>,
    options: StatsOptions,
    semaphore: Arc<Semaphore>,
}

impl NodeStatsAggregator {
    pub fn new(handle: Arc<dyn ClusterHandle>, options: StatsOptions) -> Self {
        let semaphore = Arc::new(Semaphore::new(options.max_in_flight.max(1)));
        Self {
            handle,
            options,
            semaphore,
        }
    }

    pub fn from_config(handle: Arc<dyn ClusterHandle>, config: &AdminConfig) -> Self {
        Self::new(handle, StatsOptions::from_config(config))
    }

    /// Summarize perf counters across every data node
    pub async fn summarize(&self, detail: bool) -> Result<NodesStat, AdminError> {
        self.collect(detail)
            .await
            .inspect_err(|e| metrics::record_command_error("nodes_stat", e.error_type()))
    }

    async fn collect(&self, detail: bool) -> Result<NodesStat, AdminError> {
        let start = Instant::now();

        let nodes = with_deadline(self.options.discovery_timeout, self.handle.list_nodes())
            .await
            .map_err(|e| match e {
                CallError::Elapsed => AdminError::DiscoveryFailure(format!(
                    "list_nodes timed out after {}ms",
                    self.options.discovery_timeout.as_millis()
                )),
                CallError::Failed(e) => AdminError::DiscoveryFailure(e.to_string()),
            })?;

        if nodes.is_empty() {
            return Err(AdminError::NoNodesFound);
        }
        debug!("Querying perf counters on {} nodes", nodes.len());

        let samples = self.scatter_gather(&nodes).await;
        let aggregate = AggregatedStats::from_samples(&samples, &self.options.reducers);
        metrics::record_summarize(aggregate.total_nodes, aggregate.healthy_nodes, start.elapsed());

        if aggregate.healthy_nodes == 0 {
            return Err(AdminError::AllNodesFailed {
                total: aggregate.total_nodes,
            });
        }

        if aggregate.unhealthy > 0 {
            warn!(
                "Perf summary is partial: {}/{} nodes excluded",
                aggregate.unhealthy, aggregate.total_nodes
            );
        }

        Ok(NodesStat {
            aggregate,
            nodes: detail.then_some(samples),
        })
    }

    /// Query every node with bounded concurrency.
    ///
    /// `join_all` yields results in input order, so the returned samples
    /// follow discovery order whatever order the queries finish in.
    async fn scatter_gather(&self, nodes: &[NodeDescriptor]) -> Vec<NodeStatSample> {
        let futures: Vec<_> = nodes
            .iter()
            .map(|node| {
                let semaphore = Arc::clone(&self.semaphore);
                async move {
                    let _permit = semaphore.acquire().await.ok();
                    self.query_node(node).await
                }
            })
            .collect();

        futures::future::join_all(futures).await
    }

    async fn query_node(&self, node: &NodeDescriptor) -> NodeStatSample {
        let start = Instant::now();
        let result = with_deadline(
            self.options.node_timeout,
            self.handle.query_perf_counters(node, &self.options.query),
        )
        .await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let sample = match result {
            Ok(payload) => match parse_perf_counters(&payload) {
                Ok(counters) => NodeStatSample::ok(node.clone(), counters, elapsed_ms),
                Err(e) => NodeStatSample::failed(
                    node.clone(),
                    NodeHealth::Malformed,
                    e.to_string(),
                    elapsed_ms,
                ),
            },
            Err(e) => {
                let health = NodeHealth::from_call_error(&e);
                let reason = match e {
                    CallError::Elapsed => format!(
                        "no response within {}ms",
                        self.options.node_timeout.as_millis()
                    ),
                    CallError::Failed(e) => e.to_string(),
                };
                NodeStatSample::failed(node.clone(), health, reason, elapsed_ms)
            }
        };

        match sample.health {
            NodeHealth::Ok => debug!(
                node = %node.address,
                counters = sample.counters.len(),
                elapsed_ms,
                "Node perf query succeeded"
            ),
            health => warn!(
                node = %node.address,
                health = health.as_str(),
                error = sample.error.as_deref().unwrap_or_default(),
                "Node perf query failed"
            ),
        }
        metrics::record_node_query(sample.health);
        sample
    }
}
