//! Results recorded by trade decision runs, read by their dependents

use std::collections::HashMap;
use tokio::sync::RwLock;

/// Released actual and its forecast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordedResult {
    pub actual: f64,
    pub forecast: f64,
}

/// currency → label → result, shared by every engine run in the process
///
/// Entries are never removed: one per released tradeable event for the
/// lifetime of the process.
#[derive(Debug, Default)]
pub struct PendingResultRegistry {
    results: RwLock<HashMap<String, HashMap<String, RecordedResult>>>,
}

impl PendingResultRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or overwrite) the result for `label` under `currency`
    pub async fn record(&self, currency: &str, label: &str, result: RecordedResult) {
        let mut results = self.results.write().await;
        results
            .entry(currency.to_string())
            .or_default()
            .insert(label.to_string(), result);
    }

    pub async fn get(&self, currency: &str, label: &str) -> Option<RecordedResult> {
        let results = self.results.read().await;
        results.get(currency).and_then(|labels| labels.get(label)).copied()
    }

    /// Whether any of `labels` has a result under `currency`
    pub async fn contains_any<S: AsRef<str>>(&self, currency: &str, labels: &[S]) -> bool {
        let results = self.results.read().await;
        results
            .get(currency)
            .map(|recorded| labels.iter().any(|l| recorded.contains_key(l.as_ref())))
            .unwrap_or(false)
    }

    /// Snapshot of every result under `currency`
    pub async fn for_currency(&self, currency: &str) -> HashMap<String, RecordedResult> {
        let results = self.results.read().await;
        results.get(currency).cloned().unwrap_or_default()
    }

    /// Total number of recorded results
    pub async fn len(&self) -> usize {
        let results = self.results.read().await;
        results.values().map(HashMap::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
