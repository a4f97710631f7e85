use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use uuid::Uuid;

use crate::db::PlantStore;
use crate::engine::allocator::CoreAllocator;
use crate::engine::capacity::parse_capacity;
use crate::engine::search::PathCandidate;
use crate::engine::EngineError;
use crate::models::{FiberRecord, PathHistoryEntry, RecordUpdate, SOURCE_AUTO};

/// Occupancy metadata supplied on confirmation. `usage` is mandatory.
#[derive(Debug, Clone)]
pub struct CommitMeta {
    pub usage: String,
    pub department: String,
    pub contact: String,
    pub notes: String,
}

/// One write planned for the commit, fully decided before anything is
/// applied so a capacity shortfall or conflict aborts with no effect
#[derive(Debug)]
enum PlannedWrite {
    Create {
        template: FiberRecord,
        core: u32,
    },
    Update {
        id: i64,
        partition: String,
        core: Option<u32>,
    },
}

/// ReservationTransaction records every row created during a commit attempt
/// so a failure later in the batch can issue compensating deletes.
#[derive(Debug, Default)]
struct ReservationTransaction {
    created: Vec<(i64, String)>,
}

impl ReservationTransaction {
    async fn rollback(&self, store: &dyn PlantStore) {
        for (id, partition) in &self.created {
            if let Err(e) = store.delete_record(*id, partition).await {
                tracing::warn!(
                    "compensating delete failed for record {} during rollback: {}",
                    id,
                    e
                );
            }
        }
    }
}

/// Confirm a selected path candidate: re-validate every locked row against
/// a fresh snapshot, materialize virtual rows, stamp occupancy metadata and
/// the shared path id onto every touched row, and persist the history
/// entry. Returns the new path id.
pub async fn commit_path(
    store: &dyn PlantStore,
    candidate: &PathCandidate,
    meta: &CommitMeta,
) -> Result<String, EngineError> {
    if meta.usage.trim().is_empty() {
        return Err(EngineError::InvalidRequest("usage is required".into()));
    }
    if candidate.hops.is_empty() {
        return Err(EngineError::InvalidRequest("path has no hops".into()));
    }

    let snapshot = store.all_records().await?;
    let live: HashMap<i64, &FiberRecord> = snapshot
        .iter()
        .filter_map(|r| r.id.map(|id| (id, r)))
        .collect();

    // Plan the whole batch first: every row is validated and every missing
    // core number allocated before the first write is issued.
    let mut allocator = CoreAllocator::new(&snapshot);
    let mut plans: Vec<PlannedWrite> = Vec::new();

    for hop in &candidate.hops {
        let segment = format!("{} -> {}", hop.from, hop.to);
        // rows still needing a core number, grouped by fiber so one
        // allocator call covers each edge+fiber pairing
        let mut unnumbered: BTreeMap<String, Vec<&FiberRecord>> = BTreeMap::new();

        for row in &hop.records {
            if row.is_generated() {
                unnumbered
                    .entry(row.fiber_name.trim().to_string())
                    .or_default()
                    .push(row);
                continue;
            }
            let Some(id) = row.id else {
                continue;
            };
            let Some(live_row) = live.get(&id) else {
                return Err(EngineError::StaleReservation {
                    segment: segment.clone(),
                });
            };
            if !live_row.usage.trim().is_empty() {
                return Err(EngineError::AlreadyOccupied {
                    segment: segment.clone(),
                });
            }
            if live_row.core_number.trim().is_empty() {
                unnumbered
                    .entry(row.fiber_name.trim().to_string())
                    .or_default()
                    .push(row);
            } else {
                plans.push(PlannedWrite::Update {
                    id,
                    partition: live_row.partition_hint.clone(),
                    core: None,
                });
            }
        }

        for (fiber, rows) in unnumbered {
            let cores = allocator.allocate(&hop.from, &hop.to, &fiber, rows.len())?;
            for (row, core) in rows.into_iter().zip(cores) {
                match row.id {
                    Some(id) if !row.generated => plans.push(PlannedWrite::Update {
                        id,
                        partition: row.partition_hint.clone(),
                        core: Some(core),
                    }),
                    _ => plans.push(PlannedWrite::Create {
                        template: row.clone(),
                        core,
                    }),
                }
            }
        }
    }

    let path_id = Uuid::new_v4().to_string();
    let tx = apply_writes(store, &path_id, &plans, meta).await?;

    let now = Utc::now();
    let entry = PathHistoryEntry {
        id: path_id.clone(),
        start_station: candidate.start.clone(),
        end_station: candidate.end.clone(),
        nodes: candidate.nodes.clone(),
        usage: meta.usage.clone(),
        department: meta.department.clone(),
        contact: meta.contact.clone(),
        notes: meta.notes.clone(),
        core_count: candidate.core_count as i64,
        created_at: now,
        updated_at: now,
    };
    if let Err(e) = store.save_history(&entry).await {
        tx.rollback(store).await;
        return Err(EngineError::Storage(e));
    }

    tracing::info!(
        path_id = %path_id,
        hops = candidate.hops.len(),
        cores = candidate.core_count,
        "path reservation committed"
    );
    Ok(path_id)
}

async fn apply_writes(
    store: &dyn PlantStore,
    path_id: &str,
    plans: &[PlannedWrite],
    meta: &CommitMeta,
) -> Result<ReservationTransaction, EngineError> {
    let mut tx = ReservationTransaction::default();

    for plan in plans {
        match plan {
            PlannedWrite::Create { template, core } => {
                let mut rec = template.clone();
                rec.core_number = core.to_string();
                rec.usage = meta.usage.clone();
                rec.department = meta.department.clone();
                rec.contact = meta.contact.clone();
                rec.notes = meta.notes.clone();
                rec.source = SOURCE_AUTO.to_string();
                rec.path_id = Some(path_id.to_string());
                rec.generated = false;

                match store.create_record(&rec).await {
                    Ok(created) => {
                        if let Some(id) = created.id {
                            tx.created.push((id, created.partition_hint.clone()));
                        }
                    }
                    Err(e) => {
                        tx.rollback(store).await;
                        return Err(EngineError::Storage(e));
                    }
                }
            }
            PlannedWrite::Update {
                id,
                partition,
                core,
            } => {
                let update = RecordUpdate {
                    usage: meta.usage.clone(),
                    department: meta.department.clone(),
                    contact: meta.contact.clone(),
                    notes: meta.notes.clone(),
                    path_id: Some(path_id.to_string()),
                    core_number: core.map(|c| c.to_string()),
                };
                if let Err(e) = store.update_record(*id, partition, &update).await {
                    tracing::warn!(
                        "update rejected for record {}: {} - retrying with safe fields",
                        id,
                        e
                    );
                    if let Err(e) = store.update_record_safe(*id, partition, &update).await {
                        tx.rollback(store).await;
                        return Err(EngineError::StorageFieldRejected {
                            id: *id,
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }
    }

    Ok(tx)
}

/// Release a committed path: clear occupancy on its rows, prune generated
/// rows that fall outside their fiber's known capacity, delete the history
/// entry.
///
/// Generated rows whose core number fits the fiber's currently-parsed
/// capacity are kept (cleared, number intact) to preserve the 1..N
/// numbering sequence; an uncapacitated fiber keeps all of its rows.
pub async fn release_path(store: &dyn PlantStore, path_id: &str) -> Result<(), EngineError> {
    let snapshot = store.all_records().await?;
    let mut cleared = 0usize;
    let mut deleted = 0usize;

    for r in &snapshot {
        if r.path_id.as_deref() != Some(path_id) {
            continue;
        }
        let Some(id) = r.id else {
            continue;
        };

        let auto = r.source.trim() == SOURCE_AUTO;
        let out_of_capacity = match (parse_capacity(&r.fiber_name), r.core_num()) {
            (Some(cap), Some(core)) => core > cap,
            _ => false,
        };

        if auto && out_of_capacity {
            store.delete_record(id, &r.partition_hint).await?;
            deleted += 1;
        } else {
            store.clear_occupancy(id, &r.partition_hint).await?;
            cleared += 1;
        }
    }

    store.delete_history(path_id).await?;
    tracing::info!(
        path_id = %path_id,
        cleared,
        deleted,
        "path reservation released"
    );
    Ok(())
}
