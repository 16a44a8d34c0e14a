//! Metric records and per-tick batches

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single observed hardware metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Dotted metric name, e.g. `cpu.usage_pct`
    pub name: String,
    pub value: f64,
    pub unit: String,
}

/// All metrics collected during one sampling tick.
///
/// Batches are ephemeral: built per tick, handed to the delivery queue and
/// never retained by the sampler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsBatch {
    pub id: Uuid,
    pub collected_at: DateTime<Utc>,
    pub metrics: Vec<Metric>,
    /// Probes that produced no reading this tick
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_probes: Vec<String>,
}

impl MetricsBatch {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            collected_at: Utc::now(),
            metrics: Vec::new(),
            failed_probes: Vec::new(),
        }
    }

    /// Record a metric. Non-finite values are dropped.
    pub fn push(&mut self, name: impl Into<String>, value: f64, unit: &str) {
        if !value.is_finite() {
            return;
        }
        self.metrics.push(Metric {
            name: name.into(),
            value,
            unit: unit.to_string(),
        });
    }

    pub fn record_failure(&mut self, probe: &str) {
        self.failed_probes.push(probe.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&Metric> {
        self.metrics.iter().find(|m| m.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }
}

impl Default for MetricsBatch {
    fn default() -> Self {
        Self::new()
    }
}
