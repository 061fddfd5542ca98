//! Cluster RPC client with connection pooling
//!
//! Provides a client for connecting to meta servers and replica nodes.
//!
//! Anything that goes wrong before a request is written (resolving the
//! address, the QUIC handshake, opening the stream) is reported as
//! `NodeUnavailable` or `Connection`, so callers know the peer never saw
//! the request. A `Timeout` only ever means the request was sent and no
//! answer arrived in time.

use crate::config::AdminConfig;
use crate::error::{ClusterError, Result};
use crate::metrics::{
    record_connection_established, record_connection_failed, record_connection_pool_size, RpcTimer,
};
use crate::service::PegasusAdminClient;
use crate::transport::{make_client_endpoint, QuicBiStream};
use crate::types::*;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tarpc::client::Config as TarpcConfig;
use tarpc::context;
use tracing::{debug, info};

/// Cluster RPC client with connection pooling
pub struct ClusterClient {
    endpoint: quinn::Endpoint,
    server_name: String,
    connect_timeout: Duration,
    request_timeout: Duration,
    connections: Arc<RwLock<HashMap<SocketAddr, PegasusAdminClient>>>,
}

impl ClusterClient {
    /// Create a new cluster client
    pub fn new(config: &AdminConfig) -> Result<Self> {
        let endpoint = make_client_endpoint(&config.tls)?;

        Ok(Self {
            endpoint,
            server_name: config.tls.server_name.clone(),
            connect_timeout: config.connect_timeout(),
            // Executors apply their own per-call deadlines on top of this.
            request_timeout: config
                .call_timeout()
                .max(config.node_timeout())
                .max(config.discovery_timeout()),
            connections: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Register an already established client for an address
    pub fn insert_connection(&self, addr: SocketAddr, client: PegasusAdminClient) {
        let mut connections = self.connections.write();
        connections.insert(addr, client);
        record_connection_pool_size(connections.len());
    }

    /// Get or create a connection to the specified node
    async fn get_client(&self, addr: SocketAddr) -> Result<PegasusAdminClient> {
        {
            let connections = self.connections.read();
            if let Some(client) = connections.get(&addr) {
                return Ok(client.clone());
            }
        }

        let client = self.create_connection(addr).await?;
        self.insert_connection(addr, client.clone());
        Ok(client)
    }

    /// Create a new connection to the specified node
    async fn create_connection(&self, addr: SocketAddr) -> Result<PegasusAdminClient> {
        let addr_str = addr.to_string();
        debug!("Connecting to cluster node at {}", addr);

        let connecting = self
            .endpoint
            .connect(addr, &self.server_name)
            .map_err(|e| {
                record_connection_failed(&addr_str, "connect_error");
                ClusterError::Connection(format!("Failed to connect to {}: {}", addr, e))
            })?;

        let connection = tokio::time::timeout(self.connect_timeout, connecting)
            .await
            .map_err(|_| {
                record_connection_failed(&addr_str, "timeout");
                ClusterError::Connection(format!(
                    "Connection to {} timed out after {}ms",
                    addr,
                    self.connect_timeout.as_millis()
                ))
            })?
            .map_err(|e| {
                record_connection_failed(&addr_str, "handshake_error");
                ClusterError::Connection(format!(
                    "Connection handshake failed with {}: {}",
                    addr, e
                ))
            })?;

        let (send, recv) = connection.open_bi().await.map_err(|e| {
            record_connection_failed(&addr_str, "stream_error");
            ClusterError::Connection(format!("Failed to open stream to {}: {}", addr, e))
        })?;

        let transport = tarpc::serde_transport::new(
            tokio_util::codec::Framed::new(
                QuicBiStream { send, recv },
                tarpc::tokio_util::codec::LengthDelimitedCodec::new(),
            ),
            tarpc::tokio_serde::formats::Bincode::default(),
        );

        let client = PegasusAdminClient::new(TarpcConfig::default(), transport).spawn();

        info!("Connected to cluster node at {}", addr);
        record_connection_established(&addr_str);
        Ok(client)
    }

    /// Create a context with the configured request timeout
    fn context(&self) -> context::Context {
        let mut ctx = context::current();
        ctx.deadline = Instant::now() + self.request_timeout;
        ctx
    }

    /// Resolve a `host:port` string to a socket address
    async fn resolve(addr: &str) -> Result<SocketAddr> {
        if let Ok(sock_addr) = addr.parse() {
            return Ok(sock_addr);
        }
        tokio::net::lookup_host(addr)
            .await
            .map_err(|e| {
                ClusterError::NodeUnavailable(format!("Cannot resolve '{}': {}", addr, e))
            })?
            .next()
            .ok_or_else(|| {
                ClusterError::NodeUnavailable(format!("Address '{}' resolved to nothing", addr))
            })
    }

    /// Drop pooled connections that failed at the transport level
    fn evict_on_failure(&self, addr: SocketAddr, err: &ClusterError) {
        if matches!(err, ClusterError::Connection(_) | ClusterError::Transport(_)) {
            let mut connections = self.connections.write();
            if connections.remove(&addr).is_some() {
                debug!("Evicted pooled connection to {}", addr);
            }
            record_connection_pool_size(connections.len());
        }
    }

    // ========================================
    // Public API
    // ========================================

    /// Read or change the meta function level on a meta server
    pub async fn meta_control(
        &self,
        addr: &str,
        request: MetaControlRequest,
    ) -> Result<MetaControlResponse> {
        let timer = RpcTimer::new("meta_control", addr);
        let sock_addr = Self::resolve(addr).await?;
        let client = self.get_client(sock_addr).await?;
        let result = match client.meta_control(self.context(), request).await {
            Ok(inner) => inner,
            Err(e) => Err(ClusterError::from(e)),
        };
        match result {
            Ok(response) => {
                timer.success();
                Ok(response)
            }
            Err(e) => {
                timer.error(e.error_type());
                self.evict_on_failure(sock_addr, &e);
                Err(e)
            }
        }
    }

    /// List data nodes known to a meta server
    pub async fn list_nodes(&self, addr: &str) -> Result<Vec<NodeDescriptor>> {
        let timer = RpcTimer::new("list_nodes", addr);
        let sock_addr = Self::resolve(addr).await?;
        let client = self.get_client(sock_addr).await?;
        let result = match client.list_nodes(self.context()).await {
            Ok(inner) => inner,
            Err(e) => Err(ClusterError::from(e)),
        };
        match result {
            Ok(nodes) => {
                timer.success();
                Ok(nodes)
            }
            Err(e) => {
                timer.error(e.error_type());
                self.evict_on_failure(sock_addr, &e);
                Err(e)
            }
        }
    }

    /// Run a remote command on a node
    pub async fn remote_command(
        &self,
        addr: &str,
        command: &str,
        args: Vec<String>,
    ) -> Result<String> {
        let timer = RpcTimer::new("remote_command", addr);
        let sock_addr = Self::resolve(addr).await?;
        let client = self.get_client(sock_addr).await?;
        let result = match client
            .remote_command(self.context(), command.to_string(), args)
            .await
        {
            Ok(inner) => inner,
            Err(e) => Err(ClusterError::from(e)),
        };
        match result {
            Ok(output) => {
                timer.success();
                Ok(output)
            }
            Err(e) => {
                timer.error(e.error_type());
                self.evict_on_failure(sock_addr, &e);
                Err(e)
            }
        }
    }
}
