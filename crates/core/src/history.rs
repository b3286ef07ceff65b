//! Bounded per-key sample history backing behavioral baselines.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

/// Default number of samples retained per key.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Key-value store of bounded FIFO sample series.
///
/// Implementations must make `observe` atomic per key: the returned baseline
/// and the append happen under the same critical section.
pub trait HistoryStore: Send + Sync {
    /// Append `value` to the series at `key` and return the samples recorded
    /// before it, oldest first. The oldest sample is evicted at capacity.
    fn observe(&self, key: &str, value: f64) -> Vec<f64>;

    /// Current samples at `key`, oldest first.
    fn samples(&self, key: &str) -> Vec<f64>;

    /// Drop every series.
    fn clear(&self);
}

/// In-process store guarded by a single mutex.
#[derive(Debug)]
pub struct InMemoryHistory {
    capacity: usize,
    series: Mutex<HashMap<String, VecDeque<f64>>>,
}

impl InMemoryHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            series: Mutex::new(HashMap::new()),
        }
    }

    pub fn shared(capacity: usize) -> Arc<dyn HistoryStore> {
        Arc::new(Self::new(capacity))
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl HistoryStore for InMemoryHistory {
    fn observe(&self, key: &str, value: f64) -> Vec<f64> {
        let mut series = self.series.lock();
        let window = series.entry(key.to_string()).or_default();
        let baseline: Vec<f64> = window.iter().copied().collect();
        window.push_back(value);
        while window.len() > self.capacity {
            window.pop_front();
        }
        baseline
    }

    fn samples(&self, key: &str) -> Vec<f64> {
        self.series
            .lock()
            .get(key)
            .map(|w| w.iter().copied().collect())
            .unwrap_or_default()
    }

    fn clear(&self) {
        self.series.lock().clear();
    }
}

/// Arithmetic mean; 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation; 0 for fewer than two samples.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}
