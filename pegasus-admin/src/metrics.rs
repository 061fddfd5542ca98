//! Admin client observability metrics
//!
//! Emitted through the `metrics` facade; nothing is recorded unless the
//! embedding process installs a recorder.

use crate::stats::NodeHealth;
use std::time::{Duration, Instant};

/// Record RPC call duration
pub fn record_rpc_duration(method: &str, target_node: &str, duration: Duration) {
    metrics::histogram!(
        "pegasus_admin_rpc_duration_seconds",
        "method" => method.to_string(),
        "target_node" => target_node.to_string(),
    )
    .record(duration.as_secs_f64());
}

/// Record RPC call success
pub fn record_rpc_success(method: &str, target_node: &str) {
    metrics::counter!(
        "pegasus_admin_rpc_requests_total",
        "method" => method.to_string(),
        "target_node" => target_node.to_string(),
        "status" => "ok",
    )
    .increment(1);
}

/// Record RPC call error
pub fn record_rpc_error(method: &str, target_node: &str, error_type: &str) {
    metrics::counter!(
        "pegasus_admin_rpc_requests_total",
        "method" => method.to_string(),
        "target_node" => target_node.to_string(),
        "status" => "error",
    )
    .increment(1);

    metrics::counter!(
        "pegasus_admin_rpc_errors_total",
        "method" => method.to_string(),
        "error_type" => error_type.to_string(),
    )
    .increment(1);
}

/// Record connection pool metrics
pub fn record_connection_pool_size(size: usize) {
    metrics::gauge!("pegasus_admin_connections_active").set(size as f64);
}

/// Record connection establishment
pub fn record_connection_established(target_node: &str) {
    metrics::counter!(
        "pegasus_admin_connections_established_total",
        "target_node" => target_node.to_string(),
    )
    .increment(1);
}

/// Record connection failure
pub fn record_connection_failed(target_node: &str, error_type: &str) {
    metrics::counter!(
        "pegasus_admin_connections_failed_total",
        "target_node" => target_node.to_string(),
        "error_type" => error_type.to_string(),
    )
    .increment(1);
}

/// Record the outcome of one per-node perf counter query
pub fn record_node_query(health: NodeHealth) {
    metrics::counter!(
        "pegasus_admin_node_queries_total",
        "health" => health.as_str(),
    )
    .increment(1);
}

/// Record a completed fan-out summary
pub fn record_summarize(total_nodes: usize, healthy_nodes: usize, duration: Duration) {
    metrics::histogram!("pegasus_admin_summarize_duration_seconds").record(duration.as_secs_f64());
    metrics::gauge!("pegasus_admin_cluster_nodes_total").set(total_nodes as f64);
    metrics::gauge!("pegasus_admin_cluster_nodes_unhealthy")
        .set(total_nodes.saturating_sub(healthy_nodes) as f64);
}

/// Record a meta level transition request
pub fn record_level_transition(from: &str, to: &str) {
    metrics::counter!(
        "pegasus_admin_meta_level_transitions_total",
        "from" => from.to_string(),
        "to" => to.to_string(),
    )
    .increment(1);
}

/// Record an executor operation that failed
pub fn record_command_error(command: &str, error_type: &str) {
    metrics::counter!(
        "pegasus_admin_command_errors_total",
        "command" => command.to_string(),
        "error_type" => error_type.to_string(),
    )
    .increment(1);
}

/// Guard for timing RPC operations
pub struct RpcTimer {
    method: String,
    target_node: String,
    start: Instant,
}

impl RpcTimer {
    /// Start timing an RPC operation
    pub fn new(method: &str, target_node: &str) -> Self {
        Self {
            method: method.to_string(),
            target_node: target_node.to_string(),
            start: Instant::now(),
        }
    }

    /// Record success and duration
    pub fn success(self) {
        let duration = self.start.elapsed();
        record_rpc_duration(&self.method, &self.target_node, duration);
        record_rpc_success(&self.method, &self.target_node);
    }

    /// Record error and duration
    pub fn error(self, error_type: &str) {
        let duration = self.start.elapsed();
        record_rpc_duration(&self.method, &self.target_node, duration);
        record_rpc_error(&self.method, &self.target_node, error_type);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_timer() {
        let timer = RpcTimer::new("meta_control", "127.0.0.1:34601");
        std::thread::sleep(Duration::from_millis(1));
        timer.success();

        let timer = RpcTimer::new("remote_command", "127.0.0.1:34801");
        timer.error("timeout");
    }

    #[test]
    fn test_fan_out_metrics_without_recorder() {
        // Should not panic
        record_node_query(NodeHealth::Malformed);
        record_summarize(3, 2, Duration::from_millis(5));
        record_level_transition("fl_steady", "fl_lively");
        record_command_error("nodes_stat", "all_nodes_failed");
    }
}
