//! Pegasus Admin - executor layer for administering a Pegasus cluster
//!
//! Turns a small set of operator intents into deadline-bounded RPCs against
//! the meta server and the replica nodes, using tarpc over QUIC transport
//! with TLS encryption.
//!
//! # Architecture
//!
//! - **Handle**: `ClusterHandle` trait, the executors' only view of the cluster
//! - **Client**: Connection-pooled tarpc client with meta server failover
//! - **Meta level**: Read and change the cluster's meta function level
//! - **Stats**: Bounded fan-out of perf counter queries, reduced into one summary
//!
//! # Key Operations
//!
//! - `MetaLevelController::get_level` / `set_level`
//! - `NodeStatsAggregator::summarize`

pub mod config;
pub mod error;
pub mod handle;
pub mod meta_level;
pub mod metrics;
pub mod rpc;
pub mod service;
pub mod stats;
pub mod transport;
pub mod types;

mod client;

pub use client::ClusterClient;
pub use config::{AdminConfig, ClusterTlsConfig, StatsConfig};
pub use error::{AdminError, ClusterError};
pub use handle::{ClusterHandle, RpcClusterHandle};
pub use meta_level::MetaLevelController;
pub use service::PegasusAdminClient;
pub use stats::{
    AggregatedStats, NodeExclusion, NodeHealth, NodeStatSample, NodeStatsAggregator, NodesStat,
    Reducer, ReducerTable, StatsOptions,
};
pub use types::*;
