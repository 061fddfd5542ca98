//! In-process fake cluster for executor tests

#![allow(dead_code)]

use async_trait::async_trait;
use pegasus_admin::{
    ClusterError, ClusterHandle, MetaControlRequest, MetaControlResponse, MetaFunctionLevel,
    NodeDescriptor, PerfCounterQuery,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// How a fake node answers a perf query
#[derive(Clone)]
pub enum NodeBehaviour {
    Respond { delay: Duration, payload: String },
    Fail(ClusterError),
}

impl NodeBehaviour {
    /// Answer `{"counters":[...]}` after `delay`
    pub fn counters(delay: Duration, pairs: &[(&str, f64)]) -> Self {
        let counters: Vec<String> = pairs
            .iter()
            .map(|(name, value)| format!(r#"{{"name":"{}","value":{}}}"#, name, value))
            .collect();
        NodeBehaviour::Respond {
            delay,
            payload: format!(r#"{{"result":"OK","counters":[{}]}}"#, counters.join(",")),
        }
    }

    pub fn raw(payload: &str) -> Self {
        NodeBehaviour::Respond {
            delay: Duration::ZERO,
            payload: payload.to_string(),
        }
    }
}

pub enum Discovery {
    Nodes(Vec<NodeDescriptor>),
    Fail(ClusterError),
    Hang,
}

pub struct FakeCluster {
    level: Mutex<MetaFunctionLevel>,
    meta_delay: Duration,
    meta_failure: Option<ClusterError>,
    reported_new_level: Option<u32>,
    discovery: Discovery,
    nodes: HashMap<String, NodeBehaviour>,
    pub meta_calls: AtomicUsize,
    pub node_calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeCluster {
    pub fn new(level: MetaFunctionLevel) -> Self {
        Self {
            level: Mutex::new(level),
            meta_delay: Duration::ZERO,
            meta_failure: None,
            reported_new_level: None,
            discovery: Discovery::Nodes(Vec::new()),
            nodes: HashMap::new(),
            meta_calls: AtomicUsize::new(0),
            node_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Cluster whose nodes are listed in the given (discovery) order
    pub fn with_nodes(nodes: Vec<(&str, NodeBehaviour)>) -> Self {
        let mut cluster = Self::new(MetaFunctionLevel::Steady);
        cluster.discovery = Discovery::Nodes(
            nodes
                .iter()
                .map(|(addr, _)| NodeDescriptor::replica(*addr))
                .collect(),
        );
        cluster.nodes = nodes
            .into_iter()
            .map(|(addr, behaviour)| (addr.to_string(), behaviour))
            .collect();
        cluster
    }

    pub fn discovery(mut self, discovery: Discovery) -> Self {
        self.discovery = discovery;
        self
    }

    pub fn meta_delay(mut self, delay: Duration) -> Self {
        self.meta_delay = delay;
        self
    }

    pub fn meta_failure(mut self, err: ClusterError) -> Self {
        self.meta_failure = Some(err);
        self
    }

    /// Make the meta server report this code as the new level
    pub fn reported_new_level(mut self, code: u32) -> Self {
        self.reported_new_level = Some(code);
        self
    }

    pub fn meta_calls(&self) -> usize {
        self.meta_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ClusterHandle for FakeCluster {
    async fn meta_control(
        &self,
        request: MetaControlRequest,
    ) -> Result<MetaControlResponse, ClusterError> {
        self.meta_calls.fetch_add(1, Ordering::SeqCst);
        if !self.meta_delay.is_zero() {
            tokio::time::sleep(self.meta_delay).await;
        }
        if let Some(ref err) = self.meta_failure {
            return Err(err.clone());
        }

        let mut level = self.level.lock().unwrap();
        let old_level = level.code();
        if let Some(target) = MetaFunctionLevel::from_code(request.level) {
            *level = target;
        }
        Ok(MetaControlResponse {
            old_level,
            new_level: self.reported_new_level.unwrap_or(level.code()),
        })
    }

    async fn list_nodes(&self) -> Result<Vec<NodeDescriptor>, ClusterError> {
        match &self.discovery {
            Discovery::Nodes(nodes) => Ok(nodes.clone()),
            Discovery::Fail(err) => Err(err.clone()),
            Discovery::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }

    async fn query_perf_counters(
        &self,
        node: &NodeDescriptor,
        _query: &PerfCounterQuery,
    ) -> Result<String, ClusterError> {
        self.node_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlightGuard(&self.in_flight);
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        match self.nodes.get(&node.address) {
            Some(NodeBehaviour::Respond { delay, payload }) => {
                tokio::time::sleep(*delay).await;
                Ok(payload.clone())
            }
            Some(NodeBehaviour::Fail(err)) => Err(err.clone()),
            None => Err(ClusterError::NodeUnavailable(node.address.clone())),
        }
    }
}
