use std::collections::{BTreeSet, HashMap};

use crate::engine::capacity::parse_capacity;
use crate::engine::EngineError;
use crate::models::FiberRecord;

/// Effective capacity when a fiber name carries no parseable prefix
const UNCAPACITATED: u32 = 9999;
/// Hard cap on the allocation scan, against pathological input
const MAX_SCAN: u32 = 1000;

/// CoreAllocator hands out the smallest free core numbers for a fiber.
///
/// Numbers are unique per fiber *name* across the whole plant, not per
/// edge: a fiber name is treated as one logical cable regardless of which
/// station recorded it. Built once per confirmation batch from a fresh
/// snapshot; numbers handed out immediately count as used, and a per-edge
/// cursor lets repeated calls for the same edge continue where the previous
/// one left off.
pub struct CoreAllocator {
    used: HashMap<String, BTreeSet<u32>>,
    cursors: HashMap<String, u32>,
}

impl CoreAllocator {
    pub fn new(snapshot: &[FiberRecord]) -> Self {
        let mut used: HashMap<String, BTreeSet<u32>> = HashMap::new();
        for r in snapshot {
            let fiber = r.fiber_name.trim();
            if fiber.is_empty() {
                continue;
            }
            if let Some(core) = r.core_num() {
                used.entry(fiber.to_string()).or_default().insert(core);
            }
        }
        Self {
            used,
            cursors: HashMap::new(),
        }
    }

    /// Allocate `count` free core numbers for the fiber on the given edge,
    /// gap-filling from 1 upward within the fiber's capacity.
    pub fn allocate(
        &mut self,
        station: &str,
        destination: &str,
        fiber: &str,
        count: usize,
    ) -> Result<Vec<u32>, EngineError> {
        let fiber = fiber.trim();
        let capacity = parse_capacity(fiber).unwrap_or(UNCAPACITATED);
        let cursor_key = format!("{}|{}|{}", station, destination, fiber);
        let start = *self.cursors.get(&cursor_key).unwrap_or(&1);

        let used = self.used.entry(fiber.to_string()).or_default();
        let mut allocated = Vec::with_capacity(count);
        let mut n = start;

        while allocated.len() < count {
            if n > capacity || n > start.saturating_add(MAX_SCAN) {
                return Err(EngineError::CoreExhausted {
                    fiber: fiber.to_string(),
                });
            }
            if used.insert(n) {
                allocated.push(n);
            }
            n += 1;
        }

        self.cursors.insert(cursor_key, n);
        Ok(allocated)
    }
}
