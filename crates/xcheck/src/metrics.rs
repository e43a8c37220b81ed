//! Instrumentation metrics using metrics-rs.
//!
//! The engine bumps counters as it works; the CLI installs [`CliRecorder`]
//! to collect them and prints a summary when asked to.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
use parking_lot::RwLock;

pub use xcheck_synth::metrics::{CHECKS_EMITTED, DIAGNOSTICS, ROUTINES_SYNTHESIZED};

/// Register metric descriptions. Call once at startup.
pub fn init() {
    xcheck_synth::metrics::describe();
}

#[derive(Default)]
struct CounterStorage {
    values: RwLock<HashMap<String, u64>>,
}

struct CliCounter {
    key: String,
    storage: Arc<CounterStorage>,
}

impl metrics::CounterFn for CliCounter {
    fn increment(&self, value: u64) {
        let mut values = self.storage.values.write();
        *values.entry(self.key.clone()).or_insert(0) += value;
    }

    fn absolute(&self, value: u64) {
        let mut values = self.storage.values.write();
        values.insert(self.key.clone(), value);
    }
}

/// Recorder keeping counters in memory for terminal output.
///
/// The engine only records counters; gauges and histograms are accepted
/// and dropped.
#[derive(Default)]
pub struct CliRecorder {
    counters: Arc<CounterStorage>,
}

impl CliRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install this recorder as the global metrics recorder.
    ///
    /// Returns `None` if a recorder is already installed.
    #[must_use]
    pub fn install(self) -> Option<CliRecorderHandle> {
        let counters = Arc::clone(&self.counters);
        metrics::set_global_recorder(self).ok()?;
        Some(CliRecorderHandle { counters })
    }
}

fn key_to_string(key: &Key) -> String {
    let name = key.name();
    let labels: Vec<String> = key
        .labels()
        .map(|l| format!("{}={}", l.key(), l.value()))
        .collect();
    if labels.is_empty() {
        name.to_string()
    } else {
        format!("{name}{{{}}}", labels.join(","))
    }
}

impl Recorder for CliRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        Counter::from_arc(Arc::new(CliCounter {
            key: key_to_string(key),
            storage: Arc::clone(&self.counters),
        }))
    }

    fn register_gauge(&self, _key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::noop()
    }

    fn register_histogram(&self, _key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::noop()
    }
}

/// Access to the counters collected by an installed [`CliRecorder`].
pub struct CliRecorderHandle {
    counters: Arc<CounterStorage>,
}

impl CliRecorderHandle {
    #[must_use]
    pub fn get_counter(&self, key: &str) -> Option<u64> {
        self.counters.values.read().get(key).copied()
    }

    #[must_use]
    pub fn all_counters(&self) -> HashMap<String, u64> {
        self.counters.values.read().clone()
    }

    /// Print all collected counters.
    pub fn print_summary(&self) {
        let counters = self.counters.values.read();
        if counters.is_empty() {
            println!("No metrics collected.");
            return;
        }

        println!();
        println!("## Metrics Summary");
        println!();
        let mut keys: Vec<_> = counters.keys().collect();
        keys.sort();
        for key in keys {
            println!("  {key}: {}", counters[key]);
        }
        println!();
    }
}
