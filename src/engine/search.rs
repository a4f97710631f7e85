use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::engine::graph::{refine_pool, AvailabilityGraph};
use crate::engine::normalize::normalize_station;
use crate::engine::topology::TopologyIndex;
use crate::engine::EngineError;
use crate::models::FiberRecord;

/// Stop after this many complete paths
const MAX_PATHS: usize = 5;
/// Abandon branches longer than this many stations
const MAX_PATH_NODES: usize = 10;
/// Circuit breaker against pathological graphs
const MAX_ITERATIONS: usize = 10_000;

/// One traversed hop with the specific rows locked for it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathHop {
    pub from: String,
    pub to: String,
    pub records: Vec<FiberRecord>,
}

/// PathCandidate is one full, unconfirmed start-to-end route with its
/// per-hop row reservations. In-memory only until committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathCandidate {
    /// Ordered normalized station names, start to end
    pub nodes: Vec<String>,
    pub hops: Vec<PathHop>,
    /// Original (non-normalized) inputs, kept for display and history
    pub start: String,
    pub end: String,
    pub core_count: usize,
}

#[derive(Debug)]
struct SearchState {
    current: String,
    nodes: Vec<String>,
    hops: Vec<PathHop>,
}

/// Discover up to five available multi-hop routes between two stations.
///
/// Breadth-first over the availability graph, never revisiting a station
/// within one branch. Each traversed edge locks (in-memory, per branch) the
/// first `required_cores` rows of its refreshed candidate pool; an edge
/// whose pool cannot cover the request is skipped entirely. The search does
/// not stop at the first hit - it keeps collecting alternatives up to the
/// caps.
pub fn find_paths(
    records: &[FiberRecord],
    start: &str,
    end: &str,
    required_cores: usize,
) -> Result<Vec<PathCandidate>, EngineError> {
    let from = normalize_station(start);
    let to = normalize_station(end);

    if from.is_empty() || to.is_empty() {
        return Err(EngineError::InvalidRequest(
            "start and end stations are required".into(),
        ));
    }
    if from == to {
        return Err(EngineError::InvalidRequest(
            "start and end stations must differ".into(),
        ));
    }
    if required_cores == 0 {
        return Err(EngineError::InvalidRequest(
            "core count must be at least 1".into(),
        ));
    }

    let topo = TopologyIndex::build(records);
    let mut graph = AvailabilityGraph::build(records, &topo);
    graph.symmetrize();
    graph.inject_passthrough(&topo, required_cores);

    let candidates = bfs(&graph, &from, &to, required_cores, start, end);
    tracing::debug!(
        start = %from,
        end = %to,
        cores = required_cores,
        found = candidates.len(),
        "path search finished"
    );

    if candidates.is_empty() {
        return Err(EngineError::NoPathFound {
            start: start.to_string(),
            end: end.to_string(),
        });
    }
    Ok(candidates)
}

fn bfs(
    graph: &AvailabilityGraph,
    from: &str,
    to: &str,
    required_cores: usize,
    raw_start: &str,
    raw_end: &str,
) -> Vec<PathCandidate> {
    let mut found: Vec<PathCandidate> = Vec::new();
    let mut iterations = 0usize;

    let mut queue: VecDeque<SearchState> = VecDeque::new();
    queue.push_back(SearchState {
        current: from.to_string(),
        nodes: vec![from.to_string()],
        hops: Vec::new(),
    });

    while let Some(state) = queue.pop_front() {
        if found.len() >= MAX_PATHS || iterations >= MAX_ITERATIONS {
            break;
        }
        iterations += 1;

        if state.current == to {
            found.push(PathCandidate {
                nodes: state.nodes,
                hops: state.hops,
                start: raw_start.to_string(),
                end: raw_end.to_string(),
                core_count: required_cores,
            });
            continue;
        }

        if state.nodes.len() >= MAX_PATH_NODES {
            continue;
        }

        let Some(pools) = graph.edges.get(&state.current) else {
            continue;
        };

        for (next, pool) in pools {
            if state.nodes.iter().any(|n| n == next) {
                continue;
            }
            // the pool may have grown via passthrough injection, so filter
            // and sort again before locking
            let refined = refine_pool(pool);
            if refined.len() < required_cores {
                let reason = EngineError::InsufficientCapacity {
                    from: state.current.clone(),
                    to: next.clone(),
                    required: required_cores,
                };
                tracing::debug!("edge pruned: {}", reason);
                continue;
            }
            let locked: Vec<FiberRecord> = refined.into_iter().take(required_cores).collect();

            let mut nodes = state.nodes.clone();
            nodes.push(next.clone());
            let mut hops = state.hops.clone();
            hops.push(PathHop {
                from: state.current.clone(),
                to: next.clone(),
                records: locked,
            });
            queue.push_back(SearchState {
                current: next.clone(),
                nodes,
                hops,
            });
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{record, used_record};

    #[test]
    fn test_two_hop_route() {
        // A -> B on F1, B -> C on F2: exactly one path [A, B, C]
        let records = vec![record("A", "B", "F1", "1"), record("B", "C", "F2", "1")];
        let paths = find_paths(&records, "A", "C", 1).unwrap();

        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].nodes, vec!["A", "B", "C"]);
        assert_eq!(paths[0].hops.len(), 2);
        assert_eq!(paths[0].hops[0].records[0].fiber_name, "F1");
        assert_eq!(paths[0].hops[1].records[0].fiber_name, "F2");
    }

    #[test]
    fn test_paths_are_cycle_free() {
        let records = vec![
            record("A", "B", "F1", "1"),
            record("B", "A", "F2", "1"),
            record("B", "C", "F3", "1"),
            record("C", "A", "F4", "1"),
        ];
        let paths = find_paths(&records, "A", "C", 1).unwrap();
        for p in &paths {
            let mut seen = std::collections::HashSet::new();
            for n in &p.nodes {
                assert!(seen.insert(n.clone()), "revisited {} in {:?}", n, p.nodes);
            }
        }
    }

    #[test]
    fn test_insufficient_pool_prunes_edge() {
        // requesting 2 cores over a 1-core cable whose only slot is already
        // numbered: injection has no headroom, the edge is pruned, no route
        let records = vec![record("A", "B", "1_link", "1")];
        let err = find_paths(&records, "A", "B", 2).unwrap_err();
        assert!(matches!(err, EngineError::NoPathFound { .. }));
    }

    #[test]
    fn test_uncapacitated_fiber_tops_up_for_multi_core() {
        // an unprefixed fiber has unlimited headroom, so a 2-core request
        // over a single free row succeeds with an injected virtual row
        let records = vec![record("A", "B", "F1", "1")];
        let paths = find_paths(&records, "A", "B", 2).unwrap();
        assert_eq!(paths[0].nodes, vec!["A", "B"]);
        let hop = &paths[0].hops[0];
        assert_eq!(hop.records.len(), 2);
        assert!(hop.records.iter().any(|r| r.generated));
        assert!(hop.records.iter().any(|r| r.core_number == "1"));
    }

    #[test]
    fn test_exhausted_capacity_yields_no_path() {
        // "4_link" has cores 1..=4 all in use; passthrough injection has no
        // headroom left, so the edge cannot be formed at all
        let records = vec![
            used_record("A", "B", "4_link", "1"),
            used_record("A", "B", "4_link", "2"),
            used_record("A", "B", "4_link", "3"),
            used_record("A", "B", "4_link", "4"),
        ];
        let err = find_paths(&records, "A", "B", 1).unwrap_err();
        assert!(matches!(err, EngineError::NoPathFound { .. }));
    }

    #[test]
    fn test_unrecorded_continuation_is_searchable() {
        // A carries 48_trunk_1 with no destination and the fiber is not
        // recorded anywhere else; it is presumed to continue toward the
        // physically adjacent B
        let records = vec![
            used_record("A", "B", "other", "1"),
            record("A", "", "48_trunk_1", ""),
        ];
        let paths = find_paths(&records, "A", "B", 1).unwrap();
        assert_eq!(paths[0].nodes, vec!["A", "B"]);
        let trunk_hop = &paths[0].hops[0];
        assert!(trunk_hop
            .records
            .iter()
            .any(|r| r.fiber_name == "48_trunk_1" && r.generated));
    }

    #[test]
    fn test_passthrough_route_is_searchable() {
        // A carries 48_trunk with no destination recorded; A and B are
        // adjacent via another (occupied) cable and the trunk is known to
        // reach B. Passthrough injection makes A -> B routable.
        let records = vec![
            used_record("A", "B", "other", "1"),
            used_record("X", "B", "48_trunk", "1"),
            record("A", "", "48_trunk", ""),
        ];
        let paths = find_paths(&records, "A", "B", 1).unwrap();
        assert!(!paths.is_empty());
        assert_eq!(paths[0].nodes, vec!["A", "B"]);
    }

    #[test]
    fn test_reverse_traversal_via_symmetrization() {
        // only a B -> A row exists, but searching A -> B must still succeed
        let records = vec![record("B", "A", "F1", "1")];
        let paths = find_paths(&records, "A", "B", 1).unwrap();
        assert_eq!(paths[0].nodes, vec!["A", "B"]);
    }

    #[test]
    fn test_at_most_five_paths() {
        // dense mesh with many distinct routes
        let mut records = Vec::new();
        for mid in ["M1", "M2", "M3", "M4", "M5", "M6", "M7"] {
            records.push(record("A", mid, format!("f_{}", mid).as_str(), "1"));
            records.push(record(mid, "Z", format!("g_{}", mid).as_str(), "1"));
        }
        let paths = find_paths(&records, "A", "Z", 1).unwrap();
        assert!(paths.len() <= 5);
    }

    #[test]
    fn test_validation_errors() {
        let records = vec![record("A", "B", "F1", "1")];
        assert!(matches!(
            find_paths(&records, "", "B", 1),
            Err(EngineError::InvalidRequest(_))
        ));
        assert!(matches!(
            find_paths(&records, "A (main)", "a", 1),
            Err(EngineError::InvalidRequest(_))
        ));
        assert!(matches!(
            find_paths(&records, "A", "B", 0),
            Err(EngineError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_original_labels_annotated() {
        let records = vec![record("Alpha (hq)", "Beta", "F1", "1")];
        let paths = find_paths(&records, "alpha (hq)", "beta", 1).unwrap();
        assert_eq!(paths[0].start, "alpha (hq)");
        assert_eq!(paths[0].end, "beta");
        assert_eq!(paths[0].nodes, vec!["ALPHA", "BETA"]);
    }
}
