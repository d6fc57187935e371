//! Monotonic counters keyed by one optional label.
//!
//! Series are created lazily on first increment. The map lock is only
//! taken for writing when a new label value shows up; increments on an
//! existing series are atomic adds under a read lock.

use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

/// A named counter with zero or one label dimension.
pub struct CounterFamily {
    name: &'static str,
    help: &'static str,
    label: Option<&'static str>,
    series: RwLock<BTreeMap<String, AtomicU64>>,
}

impl CounterFamily {
    /// A counter family split by `label` (e.g. `outcome`).
    pub fn labeled(name: &'static str, help: &'static str, label: &'static str) -> Self {
        Self {
            name,
            help,
            label: Some(label),
            series: RwLock::new(BTreeMap::new()),
        }
    }

    /// A single unlabeled counter.
    pub fn plain(name: &'static str, help: &'static str) -> Self {
        Self {
            name,
            help,
            label: None,
            series: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn help(&self) -> &'static str {
        self.help
    }

    pub fn label(&self) -> Option<&'static str> {
        self.label
    }

    /// Increment the series for `value`. Unlabeled families ignore `value`.
    pub fn inc(&self, value: &str) {
        let key = if self.label.is_some() { value } else { "" };
        {
            let series = self.series.read().expect("counter lock");
            if let Some(counter) = series.get(key) {
                counter.fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
        let mut series = self.series.write().expect("counter lock");
        series
            .entry(key.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
        trace!(counter = self.name, label = key, "new counter series");
    }

    /// Increment an unlabeled family.
    pub fn inc_plain(&self) {
        self.inc("");
    }

    pub fn get(&self, value: &str) -> u64 {
        let key = if self.label.is_some() { value } else { "" };
        let series = self.series.read().expect("counter lock");
        series
            .get(key)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Current values sorted by label value.
    pub fn series(&self) -> Vec<(String, u64)> {
        let series = self.series.read().expect("counter lock");
        series
            .iter()
            .map(|(k, v)| (k.clone(), v.load(Ordering::Relaxed)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn labeled_series_are_independent() {
        let family = CounterFamily::labeled("medea_test_total", "Test.", "outcome");
        family.inc("ok");
        family.inc("ok");
        family.inc("error");

        assert_eq!(family.get("ok"), 2);
        assert_eq!(family.get("error"), 1);
        assert_eq!(family.get("unseen"), 0);
        assert_eq!(
            family.series(),
            vec![("error".to_string(), 1), ("ok".to_string(), 2)]
        );
    }

    #[test]
    fn plain_family_has_one_series() {
        let family = CounterFamily::plain("medea_plain_total", "Plain.");
        family.inc_plain();
        family.inc("ignored");

        assert_eq!(family.get(""), 2);
        assert_eq!(family.series().len(), 1);
    }

    #[test]
    fn concurrent_increments_are_counted() {
        let family = Arc::new(CounterFamily::labeled("medea_par_total", "Par.", "k"));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let family = Arc::clone(&family);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        family.inc(if i % 2 == 0 { "even" } else { "odd" });
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(family.get("even") + family.get("odd"), 8000);
    }
}
