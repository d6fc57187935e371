//! Point-in-time available capacity per cluster.

use std::collections::BTreeMap;
use std::fmt;

/// Resource tracked by a [`CapacitySnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// CPU cores.
    Cpu,
    /// RAM in gigabytes.
    Memory,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Cpu => f.write_str("cpu"),
            ResourceKind::Memory => f.write_str("memory"),
        }
    }
}

/// Available amount of one resource, keyed by cluster address.
///
/// A cluster absent from the map has unknown capacity, which is not the
/// same as zero: it can never be selected. Ordered so that a seeded
/// selection is reproducible.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapacitySnapshot {
    kind: Option<ResourceKind>,
    available: BTreeMap<String, f64>,
}

impl CapacitySnapshot {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind: Some(kind),
            available: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> Option<ResourceKind> {
        self.kind
    }

    /// Record availability for a cluster. A later value replaces an earlier one.
    pub fn insert(&mut self, cluster: impl Into<String>, available: f64) {
        self.available.insert(cluster.into(), available);
    }

    pub fn get(&self, cluster: &str) -> Option<f64> {
        self.available.get(cluster).copied()
    }

    pub fn len(&self) -> usize {
        self.available.len()
    }

    pub fn is_empty(&self) -> bool {
        self.available.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.available.iter().map(|(c, v)| (c.as_str(), *v))
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for CapacitySnapshot {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut snapshot = CapacitySnapshot::default();
        for (cluster, value) in iter {
            snapshot.insert(cluster, value);
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_cluster_is_unknown() {
        let mut snap = CapacitySnapshot::new(ResourceKind::Cpu);
        snap.insert("http://c1", 0.0);

        assert_eq!(snap.get("http://c1"), Some(0.0));
        assert_eq!(snap.get("http://c2"), None);
        assert_eq!(snap.kind(), Some(ResourceKind::Cpu));
    }

    #[test]
    fn iteration_is_ordered() {
        let snap: CapacitySnapshot = [("http://b", 1.0), ("http://a", 2.0)].into_iter().collect();
        let clusters: Vec<_> = snap.iter().map(|(c, _)| c).collect();
        assert_eq!(clusters, vec!["http://a", "http://b"]);
    }

    #[test]
    fn kind_displays_lowercase() {
        assert_eq!(ResourceKind::Memory.to_string(), "memory");
    }
}
