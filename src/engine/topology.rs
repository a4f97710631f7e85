use std::collections::{BTreeMap, BTreeSet};

use crate::engine::normalize::normalize_station;
use crate::models::FiberRecord;

/// TopologyIndex is a one-pass summary of the physical cable plant, keyed by
/// normalized station names. It depends only on which cables exist, not on
/// current occupancy, and is rebuilt once per path-generation request.
#[derive(Debug, Default)]
pub struct TopologyIndex {
    /// Undirected physical adjacency between stations
    pub adjacency: BTreeMap<String, BTreeSet<String>>,
    /// Fiber names physically present at each station
    pub station_fibers: BTreeMap<String, BTreeSet<String>>,
    /// Destinations observed per station per fiber name
    pub station_fiber_dests: BTreeMap<String, BTreeMap<String, BTreeSet<String>>>,
    /// Destinations observed for a fiber name anywhere in the plant
    pub fiber_dests: BTreeMap<String, BTreeSet<String>>,
    /// Core numbers already assigned per fiber name, anywhere in the plant.
    /// A fiber name is one logical cable regardless of which station
    /// recorded it, so these numbers are globally taken.
    pub fiber_used_cores: BTreeMap<String, BTreeSet<u32>>,
    /// Normalized name -> best original label (longest observed spelling),
    /// used for human-readable history and generated records
    display_names: BTreeMap<String, String>,
}

impl TopologyIndex {
    pub fn build(records: &[FiberRecord]) -> Self {
        let mut idx = Self::default();

        for r in records {
            let station = normalize_station(&r.station_name);
            let dest = normalize_station(&r.destination);
            let fiber = r.fiber_name.trim().to_string();

            if !station.is_empty() {
                idx.note_display_name(&station, &r.station_name);
            }
            if !dest.is_empty() {
                idx.note_display_name(&dest, &r.destination);
            }

            if !station.is_empty() && !dest.is_empty() && station != dest {
                idx.adjacency
                    .entry(station.clone())
                    .or_default()
                    .insert(dest.clone());
                idx.adjacency
                    .entry(dest.clone())
                    .or_default()
                    .insert(station.clone());
            }

            if !station.is_empty() && !fiber.is_empty() {
                idx.station_fibers
                    .entry(station.clone())
                    .or_default()
                    .insert(fiber.clone());
            }

            if !fiber.is_empty() && !dest.is_empty() {
                if !station.is_empty() {
                    idx.station_fiber_dests
                        .entry(station.clone())
                        .or_default()
                        .entry(fiber.clone())
                        .or_default()
                        .insert(dest.clone());
                }
                idx.fiber_dests
                    .entry(fiber.clone())
                    .or_default()
                    .insert(dest);
            }

            if !fiber.is_empty() {
                if let Some(core) = r.core_num() {
                    idx.fiber_used_cores.entry(fiber).or_default().insert(core);
                }
            }
        }

        idx
    }

    fn note_display_name(&mut self, normalized: &str, original: &str) {
        let original = original.trim();
        match self.display_names.get(normalized) {
            Some(existing) if existing.len() >= original.len() => {}
            _ => {
                self.display_names
                    .insert(normalized.to_string(), original.to_string());
            }
        }
    }

    /// Best-known original label for a normalized station name
    pub fn display_name(&self, normalized: &str) -> String {
        self.display_names
            .get(normalized)
            .cloned()
            .unwrap_or_else(|| normalized.to_string())
    }

    pub fn neighbors(&self, station: &str) -> Option<&BTreeSet<String>> {
        self.adjacency.get(station)
    }

    pub fn is_adjacent(&self, a: &str, b: &str) -> bool {
        self.adjacency.get(a).is_some_and(|n| n.contains(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::record;

    #[test]
    fn test_adjacency_is_bidirectional() {
        let records = vec![record("A", "B", "F1", "")];
        let idx = TopologyIndex::build(&records);
        assert!(idx.is_adjacent("A", "B"));
        assert!(idx.is_adjacent("B", "A"));
    }

    #[test]
    fn test_no_self_adjacency_for_normalized_duplicates() {
        // "A (main)" and "A" normalize to the same station
        let records = vec![record("A (main)", "A", "F1", "")];
        let idx = TopologyIndex::build(&records);
        assert!(!idx.is_adjacent("A", "A"));
    }

    #[test]
    fn test_fiber_maps() {
        let records = vec![
            record("A", "B", "48_trunk", ""),
            record("B", "C", "48_trunk", ""),
            record("C", "", "48_trunk", ""),
        ];
        let idx = TopologyIndex::build(&records);

        assert!(idx.station_fibers["A"].contains("48_trunk"));
        assert!(idx.station_fibers["C"].contains("48_trunk"));
        assert!(idx.station_fiber_dests["A"]["48_trunk"].contains("B"));
        // global map unions destinations regardless of observing station
        assert!(idx.fiber_dests["48_trunk"].contains("B"));
        assert!(idx.fiber_dests["48_trunk"].contains("C"));
        // station C observed no destination for the fiber
        assert!(!idx.station_fiber_dests.contains_key("C"));
    }

    #[test]
    fn test_display_name_prefers_longer_original() {
        let records = vec![record("TPE", "B", "F1", ""), record("TPE (main office)", "B", "F1", "")];
        let idx = TopologyIndex::build(&records);
        assert_eq!(idx.display_name("TPE"), "TPE (main office)");
        // unknown stations fall back to the normalized form
        assert_eq!(idx.display_name("XYZ"), "XYZ");
    }
}
