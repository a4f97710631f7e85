use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;

use crate::engine::capacity::{compare_fiber_names, parse_capacity};
use crate::engine::normalize::normalize_station;
use crate::engine::topology::TopologyIndex;
use crate::models::FiberRecord;

/// How a candidate edge target was inferred for a record with no explicit
/// destination. Strategies are evaluated in this priority order; the
/// physical fiber-name match is always unioned in on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceStrategy {
    /// The record itself names its destination
    ExplicitDestination,
    /// Another record at the same station maps this fiber to a destination
    LocalFiberMatch,
    /// The fiber reaches this destination somewhere in the plant, and the
    /// destination is a physical neighbor (prevents skipping intermediate
    /// stations)
    GlobalFiberMatch,
    /// A physical neighbor carries the same fiber name
    PhysicalFiberNameMatch,
}

#[derive(Debug, Clone)]
pub struct InferredTarget {
    pub station: String,
    pub strategy: InferenceStrategy,
}

/// Candidate edge targets for one routable record.
///
/// An explicit destination is authoritative and sole. Otherwise the local
/// per-station fiber-destination map wins over the global one (the global
/// map is additionally constrained to physical neighbors), and shared cable
/// identity with a neighbor is unioned in as the weakest signal.
pub fn infer_targets(record: &FiberRecord, topo: &TopologyIndex) -> Vec<InferredTarget> {
    let station = normalize_station(&record.station_name);
    if station.is_empty() {
        return Vec::new();
    }

    if !record.destination.trim().is_empty() {
        let dest = normalize_station(&record.destination);
        if dest.is_empty() || dest == station {
            return Vec::new();
        }
        return vec![InferredTarget {
            station: dest,
            strategy: InferenceStrategy::ExplicitDestination,
        }];
    }

    let fiber = record.fiber_name.trim();
    if fiber.is_empty() {
        return Vec::new();
    }

    let mut targets: Vec<InferredTarget> = Vec::new();
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut push = |station: String, strategy: InferenceStrategy| {
        if !station.is_empty() && seen.insert(station.clone()) {
            targets.push(InferredTarget { station, strategy });
        }
    };

    let local = topo
        .station_fiber_dests
        .get(&station)
        .and_then(|fibers| fibers.get(fiber))
        .filter(|dests| !dests.is_empty());

    if let Some(dests) = local {
        for d in dests {
            push(d.clone(), InferenceStrategy::LocalFiberMatch);
        }
    } else if let Some(dests) = topo.fiber_dests.get(fiber) {
        for d in dests {
            if topo.is_adjacent(&station, d) {
                push(d.clone(), InferenceStrategy::GlobalFiberMatch);
            }
        }
    }

    if let Some(neighbors) = topo.neighbors(&station) {
        for v in neighbors {
            let carries_fiber = topo
                .station_fibers
                .get(v)
                .is_some_and(|fibers| fibers.contains(fiber));
            if carries_fiber {
                push(v.clone(), InferenceStrategy::PhysicalFiberNameMatch);
            }
        }
    }

    targets.retain(|t| t.station != station);
    targets
}

/// Drop rows whose explicit core number exceeds their own fiber's parsed
/// capacity, then order the pool by the gap-filling rule: numbered rows
/// first in ascending numeric order (reuse real cores before inventing
/// virtual ones), ties broken by numeric-aware fiber-name compare.
pub fn refine_pool(rows: &[FiberRecord]) -> Vec<FiberRecord> {
    let mut pool: Vec<FiberRecord> = rows
        .iter()
        .filter(|r| match (parse_capacity(&r.fiber_name), r.core_num()) {
            (Some(cap), Some(core)) => core <= cap,
            _ => true,
        })
        .cloned()
        .collect();

    pool.sort_by(|a, b| match (a.core_num(), b.core_num()) {
        (Some(na), Some(nb)) => na
            .cmp(&nb)
            .then_with(|| compare_fiber_names(&a.fiber_name, &b.fiber_name)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => compare_fiber_names(&a.fiber_name, &b.fiber_name),
    });

    pool
}

/// AvailabilityGraph holds the directed usable-edge candidate pools:
/// `edges[u][v]` is the list of free records that could carry a hop from
/// `u` to `v`. Keys are normalized station names.
#[derive(Debug, Default)]
pub struct AvailabilityGraph {
    pub edges: BTreeMap<String, BTreeMap<String, Vec<FiberRecord>>>,
}

impl AvailabilityGraph {
    /// Build the directed graph from a live snapshot: every routable record
    /// contributes its explicit or inferred targets, and each per-edge pool
    /// is capacity-filtered and gap-fill sorted.
    pub fn build(records: &[FiberRecord], topo: &TopologyIndex) -> Self {
        let mut graph = Self::default();

        for r in records {
            if !r.is_routable() {
                continue;
            }
            let u = normalize_station(&r.station_name);
            if u.is_empty() {
                continue;
            }
            for target in infer_targets(r, topo) {
                graph
                    .edges
                    .entry(u.clone())
                    .or_default()
                    .entry(target.station)
                    .or_default()
                    .push(r.clone());
            }
        }

        for pools in graph.edges.values_mut() {
            for pool in pools.values_mut() {
                *pool = refine_pool(pool);
            }
        }

        graph
    }

    pub fn pool(&self, from: &str, to: &str) -> Option<&Vec<FiberRecord>> {
        self.edges.get(from).and_then(|pools| pools.get(to))
    }

    /// Mirror every edge whose reverse direction has no candidates of its
    /// own. Traversing backward consumes the identical physical cable, so
    /// reusing the same rows is correct and prevents false dead-ends.
    /// Per-direction data, where it exists, takes precedence.
    pub fn symmetrize(&mut self) {
        let forward: Vec<(String, String)> = self
            .edges
            .iter()
            .flat_map(|(u, pools)| {
                pools
                    .iter()
                    .filter(|(_, pool)| !pool.is_empty())
                    .map(move |(v, _)| (u.clone(), v.clone()))
            })
            .collect();

        for (u, v) in forward {
            let reverse_empty = self.pool(&v, &u).map_or(true, |p| p.is_empty());
            if reverse_empty {
                if let Some(pool) = self.pool(&u, &v).cloned() {
                    self.edges.entry(v).or_default().insert(u, pool);
                }
            }
        }
    }

    /// Synthesize virtual rows for fibers known (or presumed) to continue
    /// between physically adjacent stations but lacking concrete rows at
    /// the hop, until each such pool can satisfy `required_cores`. A fiber
    /// with observed destinations continues only toward those; a fiber with
    /// none recorded anywhere is presumed to continue toward every physical
    /// neighbor. Injection never outruns the fiber's parsed capacity: slots
    /// already numbered (anywhere in the plant) or claimed by unassigned
    /// pool rows are not available for virtual rows. The synthesized rows
    /// are materialized as real records only on commit.
    pub fn inject_passthrough(&mut self, topo: &TopologyIndex, required_cores: usize) {
        let stations: Vec<String> = topo.station_fibers.keys().cloned().collect();

        for u in stations {
            let fibers: Vec<String> = topo.station_fibers[&u].iter().cloned().collect();
            let neighbors: Vec<String> = topo
                .neighbors(&u)
                .map(|n| n.iter().cloned().collect())
                .unwrap_or_default();

            for fiber in fibers {
                let known_dests = topo.fiber_dests.get(&fiber).filter(|d| !d.is_empty());
                let continues_to: Vec<&String> = neighbors
                    .iter()
                    .filter(|v| **v != u)
                    .filter(|v| known_dests.map_or(true, |dests| dests.contains(*v)))
                    .collect();

                let headroom = fiber_headroom(topo, &fiber);

                for v in continues_to {
                    let pool = self
                        .edges
                        .entry(u.clone())
                        .or_default()
                        .entry(v.clone())
                        .or_default();
                    let same_fiber = pool
                        .iter()
                        .filter(|r| r.fiber_name.trim() == fiber)
                        .count();
                    let unassigned = pool
                        .iter()
                        .filter(|r| r.fiber_name.trim() == fiber && r.core_num().is_none())
                        .count();

                    let want = required_cores.saturating_sub(same_fiber);
                    let allowed = headroom
                        .map(|h| h.saturating_sub(unassigned))
                        .unwrap_or(usize::MAX);
                    for _ in 0..want.min(allowed) {
                        pool.push(virtual_record(topo, &u, v, &fiber));
                    }
                }
            }
        }
    }
}

/// Core-number slots still open on a fiber: parsed capacity minus the
/// numbers already assigned within it. None means uncapacitated.
fn fiber_headroom(topo: &TopologyIndex, fiber: &str) -> Option<usize> {
    let cap = parse_capacity(fiber)?;
    let taken = topo
        .fiber_used_cores
        .get(fiber)
        .map(|used| used.iter().filter(|&&n| n >= 1 && n <= cap).count())
        .unwrap_or(0);
    Some((cap as usize).saturating_sub(taken))
}

/// A generated pass-through row: no id, no core number yet, endpoints under
/// their best-known original labels
fn virtual_record(topo: &TopologyIndex, from: &str, to: &str, fiber: &str) -> FiberRecord {
    let now = Utc::now();
    FiberRecord {
        id: None,
        partition_hint: String::new(),
        station_name: topo.display_name(from),
        destination: topo.display_name(to),
        fiber_name: fiber.to_string(),
        core_number: String::new(),
        usage: String::new(),
        department: String::new(),
        contact: String::new(),
        phone: String::new(),
        notes: String::new(),
        net_start: String::new(),
        net_end: String::new(),
        port: String::new(),
        source: String::new(),
        connection_line: String::new(),
        path_id: None,
        generated: true,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{record, used_record, with_core};

    fn build_all(records: &[FiberRecord], required: usize) -> AvailabilityGraph {
        let topo = TopologyIndex::build(records);
        let mut graph = AvailabilityGraph::build(records, &topo);
        graph.symmetrize();
        graph.inject_passthrough(&topo, required);
        graph
    }

    #[test]
    fn test_explicit_destination_edge() {
        let records = vec![record("A", "B", "F1", "")];
        let topo = TopologyIndex::build(&records);
        let graph = AvailabilityGraph::build(&records, &topo);
        assert_eq!(graph.pool("A", "B").map(Vec::len), Some(1));
    }

    #[test]
    fn test_used_records_excluded() {
        let records = vec![used_record("A", "B", "F1", "1")];
        let topo = TopologyIndex::build(&records);
        let graph = AvailabilityGraph::build(&records, &topo);
        assert!(graph.pool("A", "B").is_none());
    }

    #[test]
    fn test_no_self_loops() {
        let records = vec![
            record("A", "A (annex)", "F1", ""),
            record("A", "B", "F2", ""),
            record("A", "", "F2", ""),
        ];
        let graph = build_all(&records, 1);
        for (u, pools) in &graph.edges {
            assert!(!pools.contains_key(u), "self-loop at {}", u);
        }
    }

    #[test]
    fn test_local_fiber_inference() {
        // The destination-less record at A inherits F1's locally observed
        // destination B.
        let records = vec![used_record("A", "B", "F1", "1"), record("A", "", "F1", "2")];
        let topo = TopologyIndex::build(&records);

        let targets = infer_targets(&records[1], &topo);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].station, "B");
        assert_eq!(targets[0].strategy, InferenceStrategy::LocalFiberMatch);
    }

    #[test]
    fn test_global_inference_requires_physical_adjacency() {
        // F1 is observed reaching C from B, but A is not adjacent to C, so
        // A's destination-less F1 row must not produce an A->C edge.
        let records = vec![
            used_record("B", "C", "F1", "1"),
            record("A", "", "F1", ""),
            used_record("A", "B", "other", "1"),
        ];
        let topo = TopologyIndex::build(&records);
        let targets = infer_targets(&records[1], &topo);
        assert!(targets.iter().all(|t| t.station != "C"));
    }

    #[test]
    fn test_neighbor_fiber_name_inference() {
        // A and B are adjacent via another cable, and B also carries F1,
        // so A's destination-less F1 row may hop to B.
        let records = vec![
            used_record("A", "B", "other", "1"),
            record("A", "", "F1", ""),
            used_record("B", "X", "F1", "1"),
        ];
        let topo = TopologyIndex::build(&records);
        let targets = infer_targets(&records[1], &topo);
        assert!(targets
            .iter()
            .any(|t| t.station == "B" && t.strategy == InferenceStrategy::PhysicalFiberNameMatch));
    }

    #[test]
    fn test_capacity_filter_drops_out_of_range_cores() {
        let records = vec![
            with_core(record("A", "B", "4_link", ""), "3"),
            with_core(record("A", "B", "4_link", ""), "9"),
            record("A", "B", "4_link", ""),
        ];
        let pool = refine_pool(&records);
        assert_eq!(pool.len(), 2);
        assert!(pool.iter().all(|r| r.core_number != "9"));
    }

    #[test]
    fn test_gap_fill_sort_order() {
        let records = vec![
            record("A", "B", "F1", ""),
            with_core(record("A", "B", "F1", ""), "7"),
            with_core(record("A", "B", "F1", ""), "2"),
        ];
        let pool = refine_pool(&records);
        let cores: Vec<&str> = pool.iter().map(|r| r.core_number.as_str()).collect();
        // numbered rows first, ascending; unassigned rows last
        assert_eq!(cores, vec!["2", "7", ""]);
    }

    #[test]
    fn test_symmetrize_mirrors_missing_reverse() {
        let records = vec![record("A", "B", "F1", "1")];
        let topo = TopologyIndex::build(&records);
        let mut graph = AvailabilityGraph::build(&records, &topo);
        assert!(graph.pool("B", "A").is_none());

        let forward = graph.pool("A", "B").cloned().unwrap();
        graph.symmetrize();

        let reverse = graph.pool("B", "A").unwrap();
        assert_eq!(reverse.len(), forward.len());
        assert_eq!(reverse[0].id, forward[0].id);
    }

    #[test]
    fn test_symmetrize_keeps_existing_reverse() {
        let records = vec![record("A", "B", "F1", "1"), record("B", "A", "F2", "1")];
        let topo = TopologyIndex::build(&records);
        let mut graph = AvailabilityGraph::build(&records, &topo);
        graph.symmetrize();
        let reverse = graph.pool("B", "A").unwrap();
        assert_eq!(reverse.len(), 1);
        assert_eq!(reverse[0].fiber_name, "F2");
    }

    #[test]
    fn test_passthrough_injects_virtual_rows() {
        // 48_trunk is present at A and known (globally) to reach B, with A
        // and B physically adjacent via another cable, but B records no row
        // for it. Injection must still make A->B traversable.
        let records = vec![
            used_record("A", "B", "other", "1"),
            used_record("X", "B", "48_trunk", "1"),
            record("A", "", "48_trunk", ""),
        ];
        let graph = build_all(&records, 3);

        let pool = graph.pool("A", "B").unwrap();
        let trunk: Vec<_> = pool.iter().filter(|r| r.fiber_name == "48_trunk").collect();
        assert!(trunk.len() >= 3);
        assert!(trunk.iter().any(|r| r.generated));
        // virtual rows carry no id until committed
        assert!(trunk.iter().filter(|r| r.generated).all(|r| r.id.is_none()));
    }

    #[test]
    fn test_passthrough_tops_up_existing_pool() {
        let records = vec![record("A", "B", "8_ring", "1"), used_record("X", "B", "8_ring", "2")];
        let graph = build_all(&records, 2);
        let pool = graph.pool("A", "B").unwrap();
        let same: Vec<_> = pool.iter().filter(|r| r.fiber_name == "8_ring").collect();
        assert_eq!(same.len(), 2);
        assert_eq!(same.iter().filter(|r| r.generated).count(), 1);
    }
}
