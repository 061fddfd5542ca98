//! Property tests for partial-failure aggregation.
//!
//! For any mix of healthy, slow, refusing and garbled nodes, the summary must
//! cover exactly the healthy ones and the detail must tag every node in
//! discovery order.

mod common;

use common::{FakeCluster, NodeBehaviour};
use pegasus_admin::{AdminError, ClusterError, NodeHealth, NodeStatsAggregator, StatsOptions};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

const NODE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
enum Outcome {
    Healthy { qps: u32, delay_ms: u64 },
    Slow { delay_ms: u64 },
    Refused,
    Garbled,
}

impl Outcome {
    fn behaviour(&self) -> NodeBehaviour {
        match self {
            Outcome::Healthy { qps, delay_ms } => NodeBehaviour::counters(
                Duration::from_millis(*delay_ms),
                &[("get_qps", *qps as f64)],
            ),
            Outcome::Slow { delay_ms } => {
                NodeBehaviour::counters(Duration::from_millis(*delay_ms), &[("get_qps", 1.0)])
            }
            Outcome::Refused => NodeBehaviour::Fail(ClusterError::Connection("refused".into())),
            Outcome::Garbled => NodeBehaviour::raw("{\"counters\": [oops"),
        }
    }

    fn expected_health(&self) -> NodeHealth {
        match self {
            Outcome::Healthy { .. } => NodeHealth::Ok,
            Outcome::Slow { .. } => NodeHealth::Timeout,
            Outcome::Refused => NodeHealth::Unreachable,
            Outcome::Garbled => NodeHealth::Malformed,
        }
    }
}

fn outcome() -> impl Strategy<Value = Outcome> {
    prop_oneof![
        3 => (0u32..10_000, 0u64..1_500)
            .prop_map(|(qps, delay_ms)| Outcome::Healthy { qps, delay_ms }),
        1 => (2_500u64..6_000).prop_map(|delay_ms| Outcome::Slow { delay_ms }),
        1 => Just(Outcome::Refused),
        1 => Just(Outcome::Garbled),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_summary_covers_exactly_healthy_nodes(
        outcomes in prop::collection::vec(outcome(), 1..24),
        max_in_flight in 1usize..6,
    ) {
        let addresses: Vec<String> = (0..outcomes.len())
            .map(|i| format!("10.1.0.{}:34801", i))
            .collect();
        let cluster = Arc::new(FakeCluster::with_nodes(
            addresses
                .iter()
                .zip(&outcomes)
                .map(|(addr, outcome)| (addr.as_str(), outcome.behaviour()))
                .collect(),
        ));
        let aggregator = NodeStatsAggregator::new(
            cluster.clone(),
            StatsOptions {
                node_timeout: NODE_TIMEOUT,
                max_in_flight,
                ..StatsOptions::default()
            },
        );

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .start_paused(true)
            .build()
            .unwrap();
        let result = rt.block_on(aggregator.summarize(true));

        let healthy: Vec<u32> = outcomes
            .iter()
            .filter_map(|o| match o {
                Outcome::Healthy { qps, .. } => Some(*qps),
                _ => None,
            })
            .collect();

        prop_assert!(cluster.max_in_flight() <= max_in_flight);

        if healthy.is_empty() {
            let is_all_failed = matches!(
                result,
                Err(AdminError::AllNodesFailed { total }) if total == outcomes.len()
            );
            prop_assert!(is_all_failed);
            return Ok(());
        }

        let stat = result.unwrap();
        prop_assert_eq!(stat.aggregate.healthy_nodes, healthy.len());
        prop_assert_eq!(stat.aggregate.unhealthy, outcomes.len() - healthy.len());
        prop_assert_eq!(stat.aggregate.coverage["get_qps"], healthy.len());
        let expected_qps: f64 = healthy.iter().map(|q| *q as f64).sum();
        prop_assert_eq!(stat.aggregate.counters["get_qps"], expected_qps);

        let nodes = stat.nodes.unwrap();
        prop_assert_eq!(nodes.len(), outcomes.len());
        for ((sample, outcome), addr) in nodes.iter().zip(&outcomes).zip(&addresses) {
            prop_assert_eq!(&sample.node.address, addr);
            prop_assert_eq!(sample.health, outcome.expected_health());
        }
    }
}
