use std::collections::HashMap;
use std::fmt::Write;
use std::sync::{PoisonError, RwLock};

use crate::DurationSample;

pub const DEFAULT_NAMESPACE: &str = "hf";
pub const DEFAULT_SUBSYSTEM: &str = "github_actions";

const LABELS: [&str; 4] = ["job_id", "workflow_name", "job_name", "conclusion"];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesKey {
    pub job_id: u64,
    pub workflow_name: String,
    pub job_name: String,
    pub conclusion: String,
}

impl From<&DurationSample> for SeriesKey {
    fn from(sample: &DurationSample) -> Self {
        Self {
            job_id: sample.job_id.0,
            workflow_name: sample.workflow_name.clone(),
            job_name: sample.job_name.clone(),
            conclusion: sample.conclusion.clone(),
        }
    }
}

impl SeriesKey {
    fn label_values(&self) -> [String; 4] {
        [
            self.job_id.to_string(),
            self.workflow_name.clone(),
            self.job_name.clone(),
            self.conclusion.clone(),
        ]
    }
}

pub trait MetricSink: Send + Sync {
    fn set(&self, key: SeriesKey, seconds: f64);

    fn snapshot(&self) -> Vec<(SeriesKey, f64)>;
}

// Series are never evicted.
pub struct GaugeRegistry {
    name: String,
    series: RwLock<HashMap<SeriesKey, f64>>,
}

impl Default for GaugeRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE, DEFAULT_SUBSYSTEM)
    }
}

impl GaugeRegistry {
    pub fn new(namespace: &str, subsystem: &str) -> Self {
        let name = [namespace, subsystem, "job_duration"]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("_");
        Self {
            name,
            series: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &SeriesKey) -> Option<f64> {
        self.series
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied()
    }

    /// Prometheus text exposition of the whole family.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "# HELP {} Duration of completed GitHub Actions jobs in seconds.",
            self.name
        );
        let _ = writeln!(out, "# TYPE {} gauge", self.name);
        for (key, value) in self.snapshot() {
            let labels = LABELS
                .iter()
                .zip(key.label_values())
                .map(|(label, value)| format!("{label}=\"{}\"", escape_label(&value)))
                .collect::<Vec<_>>()
                .join(",");
            let _ = writeln!(out, "{}{{{labels}}} {value}", self.name);
        }
        out
    }
}

impl MetricSink for GaugeRegistry {
    fn set(&self, key: SeriesKey, seconds: f64) {
        self.series
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, seconds);
    }

    fn snapshot(&self) -> Vec<(SeriesKey, f64)> {
        let mut series: Vec<_> = self
            .series
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(key, value)| (key.clone(), *value))
            .collect();
        series.sort_by(|a, b| a.0.cmp(&b.0));
        series
    }
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', r"\\")
        .replace('"', "\\\"")
        .replace('\n', r"\n")
}
