//! Per-counter reduction rules
//!
//! Throughput counters and rates add up across nodes. Latency percentiles
//! cannot be averaged, so the cluster value is the worst node's value.
//! Queue lengths also take the maximum. Free-space ratios take the minimum.
//! Any counter not listed falls back to `sum`.
//!
//! The table is fixed at construction time. Config overrides replace entries
//! by exact name; nothing is inferred from counter values.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// How one counter is combined across nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reducer {
    #[default]
    Sum,
    Max,
    Min,
}

impl Reducer {
    /// Fold `value` into the running `acc`
    pub fn combine(&self, acc: f64, value: f64) -> f64 {
        match self {
            Reducer::Sum => acc + value,
            Reducer::Max => acc.max(value),
            Reducer::Min => acc.min(value),
        }
    }
}

const SUMMED: &[&str] = &[
    "get_qps",
    "multi_get_qps",
    "put_qps",
    "multi_put_qps",
    "remove_qps",
    "multi_remove_qps",
    "incr_qps",
    "check_and_set_qps",
    "check_and_mutate_qps",
    "scan_qps",
    "read_bytes",
    "write_bytes",
    "recent_read_cu",
    "recent_write_cu",
    "replica_count",
];

const MAXED: &[&str] = &[
    "get_p99_ns",
    "multi_get_p99_ns",
    "put_p99_ns",
    "multi_put_p99_ns",
    "remove_p99_ns",
    "incr_p99_ns",
    "check_and_set_p99_ns",
    "scan_p99_ns",
    "rdb_write_queue_len",
    "shared_log_queue_len",
];

const MINNED: &[&str] = &["disk_available_ratio"];

/// Resolved reducer for every counter name
#[derive(Debug, Clone)]
pub struct ReducerTable {
    reducers: HashMap<String, Reducer>,
    fallback: Reducer,
}

impl Default for ReducerTable {
    fn default() -> Self {
        let mut reducers = HashMap::new();
        for (names, reducer) in [
            (SUMMED, Reducer::Sum),
            (MAXED, Reducer::Max),
            (MINNED, Reducer::Min),
        ] {
            for name in names {
                reducers.insert(name.to_string(), reducer);
            }
        }
        Self {
            reducers,
            fallback: Reducer::Sum,
        }
    }
}

impl ReducerTable {
    /// Built-in table with per-name overrides and an optional new fallback
    pub fn with_overrides(overrides: &HashMap<String, Reducer>, fallback: Option<Reducer>) -> Self {
        let mut table = Self::default();
        for (name, reducer) in overrides {
            table.reducers.insert(name.clone(), *reducer);
        }
        if let Some(fallback) = fallback {
            table.fallback = fallback;
        }
        table
    }

    pub fn reducer_for(&self, name: &str) -> Reducer {
        self.reducers.get(name).copied().unwrap_or(self.fallback)
    }

    /// Reduce counter maps into cluster values plus how many maps had each counter
    pub fn reduce<'a>(
        &self,
        samples: impl IntoIterator<Item = &'a BTreeMap<String, f64>>,
    ) -> (BTreeMap<String, f64>, BTreeMap<String, usize>) {
        let mut reduced: BTreeMap<String, f64> = BTreeMap::new();
        let mut coverage: BTreeMap<String, usize> = BTreeMap::new();

        for counters in samples {
            for (name, value) in counters {
                let reducer = self.reducer_for(name);
                reduced
                    .entry(name.clone())
                    .and_modify(|acc| *acc = reducer.combine(*acc, *value))
                    .or_insert(*value);
                *coverage.entry(name.clone()).or_default() += 1;
            }
        }

        (reduced, coverage)
    }
}
