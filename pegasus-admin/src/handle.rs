//! Cluster handle: the executors' only view of the cluster
//!
//! [`ClusterHandle`] is the seam between the executor layer and the
//! transport. [`RpcClusterHandle`] implements it over [`ClusterClient`],
//! failing over between the configured meta servers.

use crate::client::ClusterClient;
use crate::config::AdminConfig;
use crate::error::ClusterError;
use crate::types::*;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Operations the executors need from the cluster.
///
/// Implementations own all connections and must be safe for concurrent use
/// by multiple in-flight calls.
#[async_trait]
pub trait ClusterHandle: Send + Sync {
    /// Send one `meta_control` request to the meta server
    async fn meta_control(&self, request: MetaControlRequest)
        -> Result<MetaControlResponse, ClusterError>;

    /// Enumerate the current data nodes
    async fn list_nodes(&self) -> Result<Vec<NodeDescriptor>, ClusterError>;

    /// Fetch the raw perf counter payload of one node
    async fn query_perf_counters(
        &self,
        node: &NodeDescriptor,
        query: &PerfCounterQuery,
    ) -> Result<String, ClusterError>;
}

/// [`ClusterHandle`] backed by the pooled tarpc client
pub struct RpcClusterHandle {
    client: Arc<ClusterClient>,
    meta_servers: Vec<String>,
}

impl RpcClusterHandle {
    /// Create a handle with a fresh client built from `config`
    pub fn connect(config: &AdminConfig) -> Result<Self, ClusterError> {
        let client = Arc::new(ClusterClient::new(config)?);
        Ok(Self::new(client, config.meta_servers.clone()))
    }

    pub fn new(client: Arc<ClusterClient>, meta_servers: Vec<String>) -> Self {
        Self {
            client,
            meta_servers,
        }
    }

    /// Run `call` against each meta server in order until one answers.
    ///
    /// Only connection-level failures move on to the next server. The client
    /// reports a meta server it could not resolve or reach as such, so a dead
    /// first server does not block the rest. A remote error or a request
    /// timeout is final, since the request may already have been applied.
    async fn try_each_meta<T, F, Fut>(&self, mut call: F) -> Result<T, ClusterError>
    where
        F: FnMut(String) -> Fut,
        Fut: std::future::Future<Output = Result<T, ClusterError>>,
    {
        let mut last_error = None;

        for addr in &self.meta_servers {
            match call(addr.clone()).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_unreachable() => {
                    warn!(meta_server = %addr, error = %e, "Meta server unreachable, trying next");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ClusterError::Config("No meta servers configured".to_string())
        }))
    }
}

#[async_trait]
impl ClusterHandle for RpcClusterHandle {
    async fn meta_control(
        &self,
        request: MetaControlRequest,
    ) -> Result<MetaControlResponse, ClusterError> {
        let client = Arc::clone(&self.client);
        self.try_each_meta(|addr| {
            let client = Arc::clone(&client);
            async move { client.meta_control(&addr, request).await }
        })
        .await
    }

    async fn list_nodes(&self) -> Result<Vec<NodeDescriptor>, ClusterError> {
        let client = Arc::clone(&self.client);
        self.try_each_meta(|addr| {
            let client = Arc::clone(&client);
            async move { client.list_nodes(&addr).await }
        })
        .await
    }

    async fn query_perf_counters(
        &self,
        node: &NodeDescriptor,
        query: &PerfCounterQuery,
    ) -> Result<String, ClusterError> {
        debug!(node = %node.address, counters = query.names.len(), "Querying perf counters");
        self.client
            .remote_command(&node.address, PerfCounterQuery::COMMAND, query.names.clone())
            .await
    }
}
