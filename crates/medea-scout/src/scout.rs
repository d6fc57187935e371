//! Placement decisions: probe both resources, then pick a cluster.

use std::sync::{Arc, Mutex};

use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;
use tracing::{debug, info, warn};

use medea_placement::{ResourceKind, ResourceRequirement, select_cluster};

use crate::prober::{CapacitySource, ProbeError};

#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("{kind} capacity unavailable: {source}")]
    Upstream {
        kind: ResourceKind,
        #[source]
        source: ProbeError,
    },

    #[error("no cluster in namespace {namespace} can host cpu={cpu} ram={ram}g")]
    NotFound {
        namespace: String,
        cpu: f64,
        ram: f64,
    },
}

/// Chooses a cluster for a resource requirement.
pub struct Scout {
    source: Arc<dyn CapacitySource>,
    rng: Mutex<StdRng>,
}

impl Scout {
    /// Seeded scouts make reproducible choices for identical snapshots.
    pub fn new(source: Arc<dyn CapacitySource>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => {
                info!(seed, "cluster selection seeded");
                StdRng::seed_from_u64(seed)
            }
            None => StdRng::from_entropy(),
        };
        Self {
            source,
            rng: Mutex::new(rng),
        }
    }

    pub async fn place(
        &self,
        namespace: &str,
        req: &ResourceRequirement,
    ) -> Result<String, ScoutError> {
        let (cpu, ram) = tokio::join!(
            self.source.available(namespace, ResourceKind::Cpu),
            self.source.available(namespace, ResourceKind::Memory),
        );
        let cpu = cpu.map_err(|source| probe_failed(namespace, ResourceKind::Cpu, source))?;
        let ram = ram.map_err(|source| probe_failed(namespace, ResourceKind::Memory, source))?;
        debug!(
            namespace,
            cpu_clusters = cpu.len(),
            ram_clusters = ram.len(),
            "capacity snapshots ready"
        );

        let selected = {
            let mut rng = self.rng.lock().expect("rng lock");
            select_cluster(req, &cpu, &ram, &mut *rng)
        };

        selected.ok_or_else(|| ScoutError::NotFound {
            namespace: namespace.to_string(),
            cpu: req.cpu_cores,
            ram: req.ram_gigabytes,
        })
    }
}

fn probe_failed(namespace: &str, kind: ResourceKind, source: ProbeError) -> ScoutError {
    warn!(namespace, %kind, error = %source, "capacity probe failed");
    ScoutError::Upstream { kind, source }
}


#[cfg(test)]
mod tests {
    use super::testing::StaticSource;
    use super::*;

    fn req(cpu: f64, ram: f64) -> ResourceRequirement {
        ResourceRequirement {
            cpu_cores: cpu,
            ram_gigabytes: ram,
        }
    }

    #[tokio::test]
    async fn places_on_the_only_fitting_cluster() {
        let source = StaticSource::default()
            .with(ResourceKind::Cpu, &[("http://c1", 2.0), ("http://c2", 8.0)])
            .with(ResourceKind::Memory, &[("http://c1", 64.0), ("http://c2", 32.0)]);
        let scout = Scout::new(Arc::new(source), Some(1));

        let cluster = scout.place("ns1", &req(4.0, 16.0)).await.unwrap();
        assert_eq!(cluster, "http://c2");
    }

    #[tokio::test]
    async fn no_fit_is_not_found() {
        let source = StaticSource::default()
            .with(ResourceKind::Cpu, &[("http://c1", 2.0)])
            .with(ResourceKind::Memory, &[("http://c1", 2.0)]);
        let scout = Scout::new(Arc::new(source), Some(1));

        let err = scout.place("ns1", &req(4.0, 1.0)).await.unwrap_err();
        assert!(matches!(err, ScoutError::NotFound { ref namespace, .. } if namespace == "ns1"));
    }

    #[tokio::test]
    async fn failed_probe_is_upstream_error() {
        let source = StaticSource::default().with(ResourceKind::Cpu, &[("http://c1", 8.0)]);
        let scout = Scout::new(Arc::new(source), None);

        let err = scout.place("ns1", &req(1.0, 1.0)).await.unwrap_err();
        assert!(matches!(
            err,
            ScoutError::Upstream {
                kind: ResourceKind::Memory,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn seeded_scouts_agree() {
        let entries = [("http://a", 8.0), ("http://b", 8.0), ("http://c", 8.0)];
        let build = || {
            let source = StaticSource::default()
                .with(ResourceKind::Cpu, &entries)
                .with(ResourceKind::Memory, &entries);
            Scout::new(Arc::new(source), Some(2024))
        };
        let (first, second) = (build(), build());

        for _ in 0..10 {
            let a = first.place("ns1", &req(1.0, 1.0)).await.unwrap();
            let b = second.place("ns1", &req(1.0, 1.0)).await.unwrap();
            assert_eq!(a, b);
        }
    }
}
