//! tarpc service definition for cluster administration RPC
//!
//! Meta servers answer `meta_control` and `list_nodes`; replica nodes answer
//! `remote_command`, which carries text commands such as `perf-counters`.

use crate::error::ClusterError;
use crate::types::*;

/// Pegasus administration RPC service definition.
#[tarpc::service]
pub trait PegasusAdmin {
    /// Read (sentinel level) or change the meta function level
    async fn meta_control(request: MetaControlRequest) -> Result<MetaControlResponse, ClusterError>;

    /// List the data nodes known to the meta server
    async fn list_nodes() -> Result<Vec<NodeDescriptor>, ClusterError>;

    /// Run a named remote command on a node and return its text output
    async fn remote_command(command: String, args: Vec<String>) -> Result<String, ClusterError>;
}
