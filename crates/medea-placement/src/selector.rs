//! Capacity-aware cluster selection.
//!
//! A cluster is a candidate when both snapshots know it and both report
//! at least the required amount. The choice among candidates is uniform
//! random: no weighting by slack, no ordering preference, no affinity.
//! The random source is a parameter so callers can seed it.

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::calculator::ResourceRequirement;
use crate::snapshot::CapacitySnapshot;

/// Clusters able to host the requirement, in snapshot order.
pub fn candidates<'a>(
    req: &ResourceRequirement,
    cpu: &'a CapacitySnapshot,
    ram: &CapacitySnapshot,
) -> Vec<&'a str> {
    cpu.iter()
        .filter(|(cluster, available_cpu)| {
            let Some(available_ram) = ram.get(cluster) else {
                debug!(cluster, "no memory capacity reported, skipping");
                return false;
            };
            *available_cpu >= req.cpu_cores && available_ram >= req.ram_gigabytes
        })
        .map(|(cluster, _)| cluster)
        .collect()
}

/// Pick one candidate uniformly at random, or `None` when nothing fits.
pub fn select_cluster<R: Rng + ?Sized>(
    req: &ResourceRequirement,
    cpu: &CapacitySnapshot,
    ram: &CapacitySnapshot,
    rng: &mut R,
) -> Option<String> {
    let suitable = candidates(req, cpu, ram);
    let selected = suitable.choose(rng).map(|c| c.to_string());
    debug!(
        cpu = req.cpu_cores,
        ram = req.ram_gigabytes,
        candidates = suitable.len(),
        selected = selected.as_deref().unwrap_or("-"),
        "cluster selection"
    );
    selected
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn req(cpu: f64, ram: f64) -> ResourceRequirement {
        ResourceRequirement {
            cpu_cores: cpu,
            ram_gigabytes: ram,
        }
    }

    fn snap(entries: &[(&str, f64)]) -> CapacitySnapshot {
        entries.iter().map(|(c, v)| (*c, *v)).collect()
    }

    #[test]
    fn only_clusters_satisfying_both_resources() {
        let cpu = snap(&[("http://c1", 8.0), ("http://c2", 2.0), ("http://c3", 16.0)]);
        let ram = snap(&[("http://c1", 4.0), ("http://c2", 64.0), ("http://c3", 32.0)]);

        let found = candidates(&req(4.0, 16.0), &cpu, &ram);
        assert_eq!(found, vec!["http://c3"]);
    }

    #[test]
    fn exact_fit_is_a_candidate() {
        let cpu = snap(&[("http://c1", 3.0)]);
        let ram = snap(&[("http://c1", 12.25)]);
        assert_eq!(candidates(&req(3.0, 12.25), &cpu, &ram), vec!["http://c1"]);
    }

    #[test]
    fn cluster_missing_from_one_snapshot_is_never_selected() {
        // c2 has plenty of CPU but unknown RAM; c3 has RAM but unknown CPU.
        let cpu = snap(&[("http://c2", 100.0)]);
        let ram = snap(&[("http://c3", 100.0)]);
        let mut rng = StdRng::seed_from_u64(1);

        assert!(candidates(&req(0.0, 0.0), &cpu, &ram).is_empty());
        assert_eq!(select_cluster(&req(0.0, 0.0), &cpu, &ram, &mut rng), None);
    }

    #[test]
    fn nothing_fits_means_no_placement() {
        let cpu = snap(&[("http://c1", 1.0)]);
        let ram = snap(&[("http://c1", 1.0)]);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(select_cluster(&req(2.0, 0.5), &cpu, &ram, &mut rng), None);
    }

    #[test]
    fn selection_always_satisfies_requirement() {
        let cpu = snap(&[
            ("http://a", 1.0),
            ("http://b", 4.0),
            ("http://c", 8.0),
            ("http://d", 8.0),
        ]);
        let ram = snap(&[
            ("http://a", 64.0),
            ("http://b", 2.0),
            ("http://c", 16.0),
            ("http://d", 32.0),
        ]);
        let requirement = req(3.0, 12.0);
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..200 {
            let chosen = select_cluster(&requirement, &cpu, &ram, &mut rng).unwrap();
            assert!(cpu.get(&chosen).unwrap() >= requirement.cpu_cores);
            assert!(ram.get(&chosen).unwrap() >= requirement.ram_gigabytes);
        }
    }

    #[test]
    fn selection_spreads_over_all_candidates() {
        let cpu = snap(&[("http://a", 8.0), ("http://b", 8.0), ("http://c", 8.0)]);
        let ram = snap(&[("http://a", 8.0), ("http://b", 8.0), ("http://c", 8.0)]);
        let mut rng = StdRng::seed_from_u64(7);

        let seen: HashSet<String> = (0..300)
            .filter_map(|_| select_cluster(&req(1.0, 1.0), &cpu, &ram, &mut rng))
            .collect();
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn same_seed_same_choices() {
        let cpu = snap(&[("http://a", 8.0), ("http://b", 8.0), ("http://c", 8.0)]);
        let ram = snap(&[("http://a", 8.0), ("http://b", 8.0), ("http://c", 8.0)]);

        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..20)
                .map(|_| select_cluster(&req(1.0, 1.0), &cpu, &ram, &mut rng).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(run(99), run(99));
    }
}
