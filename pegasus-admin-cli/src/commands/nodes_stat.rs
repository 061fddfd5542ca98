use anyhow::Result;
use pegasus_admin::{AdminConfig, ClusterHandle, NodeStatsAggregator, NodesStat};
use std::sync::Arc;

/// Print the cluster perf summary, with per-node samples when `detail` is set
pub async fn run_nodes_stat(
    handle: Arc<dyn ClusterHandle>,
    config: &AdminConfig,
    detail: bool,
) -> Result<()> {
    let stat = NodeStatsAggregator::from_config(handle, config)
        .summarize(detail)
        .await?;

    if stat.aggregate.unhealthy > 0 {
        eprintln!(
            "Warning: {} of {} nodes excluded from the summary",
            stat.aggregate.unhealthy, stat.aggregate.total_nodes
        );
    }
    println!("{}", render(&stat)?);
    Ok(())
}

fn render(stat: &NodesStat) -> Result<String> {
    Ok(serde_json::to_string_pretty(stat)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pegasus_admin::{AggregatedStats, NodeDescriptor, NodeHealth, NodeStatSample, ReducerTable};

    fn samples() -> Vec<NodeStatSample> {
        vec![
            NodeStatSample::ok(
                NodeDescriptor::replica("10.0.0.1:34801"),
                [("get_qps".to_string(), 100.0)].into_iter().collect(),
                3,
            ),
            NodeStatSample::failed(
                NodeDescriptor::replica("10.0.0.2:34801"),
                NodeHealth::Timeout,
                "no response within 10000ms",
                10000,
            ),
        ]
    }

    #[test]
    fn test_render_summary_only() {
        let samples = samples();
        let stat = NodesStat {
            aggregate: AggregatedStats::from_samples(&samples, &ReducerTable::default()),
            nodes: None,
        };
        let value: serde_json::Value = serde_json::from_str(&render(&stat).unwrap()).unwrap();

        assert_eq!(value["aggregate"]["counters"]["get_qps"], 100.0);
        assert_eq!(value["aggregate"]["excluded"][0]["health"], "timeout");
        assert!(value.get("nodes").is_none());
    }

    #[test]
    fn test_render_detail_in_order() {
        let samples = samples();
        let stat = NodesStat {
            aggregate: AggregatedStats::from_samples(&samples, &ReducerTable::default()),
            nodes: Some(samples),
        };
        let value: serde_json::Value = serde_json::from_str(&render(&stat).unwrap()).unwrap();

        let nodes = value["nodes"].as_array().unwrap();
        assert_eq!(nodes[0]["node"]["address"], "10.0.0.1:34801");
        assert_eq!(nodes[1]["health"], "timeout");
        assert!(nodes[1].get("counters").is_none());
    }
}
