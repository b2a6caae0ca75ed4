//! Per-vehicle stream state.
//!
//! Each vehicle carries its last fix and the set of crossings still
//! waiting for a completion, held as one value so the pair can be evicted
//! together.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use log::debug;

use crate::engine::crossing::Crossing;
use crate::GpsFix;

/// State carried for one vehicle.
#[derive(Debug, Clone)]
pub struct VehicleState {
    pub last_fix: GpsFix,
    /// Pending crossings keyed by tripline identity, so a re-crossing of
    /// the same tripline displaces the stale entry instead of piling up.
    pub pending: HashMap<u32, Crossing>,
}

/// All vehicle state, keyed by vehicle id.
///
/// Entries are created lazily on a vehicle's first fix and only removed
/// by [`VehicleStore::evict_older_than`].
#[derive(Debug, Default)]
pub struct VehicleStore {
    vehicles: HashMap<String, VehicleState>,
}

impl VehicleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `fix` as its vehicle's last fix, returning the previous one.
    /// A first-ever fix creates the state and returns `None`.
    pub fn swap_last_fix(&mut self, fix: &GpsFix) -> Option<GpsFix> {
        match self.vehicles.entry(fix.vehicle_id.clone()) {
            Entry::Occupied(mut entry) => {
                Some(std::mem::replace(&mut entry.get_mut().last_fix, fix.clone()))
            }
            Entry::Vacant(entry) => {
                entry.insert(VehicleState {
                    last_fix: fix.clone(),
                    pending: HashMap::new(),
                });
                None
            }
        }
    }

    /// The pending-crossing set of a known vehicle.
    pub fn pending_mut(&mut self, vehicle_id: &str) -> Option<&mut HashMap<u32, Crossing>> {
        self.vehicles.get_mut(vehicle_id).map(|v| &mut v.pending)
    }

    pub fn get(&self, vehicle_id: &str) -> Option<&VehicleState> {
        self.vehicles.get(vehicle_id)
    }

    /// Number of tracked vehicles.
    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// Total pending crossings across all vehicles.
    pub fn pending_count(&self) -> usize {
        self.vehicles.values().map(|v| v.pending.len()).sum()
    }

    /// Drop every vehicle whose last fix is older than `horizon_micros`,
    /// returning how many were removed. Callers decide the horizon; there
    /// is no automatic policy.
    pub fn evict_older_than(&mut self, horizon_micros: i64) -> usize {
        let before = self.vehicles.len();
        self.vehicles.retain(|_, v| v.last_fix.time >= horizon_micros);
        let evicted = before - self.vehicles.len();
        if evicted > 0 {
            debug!("evicted {evicted} stale vehicles");
        }
        evicted
    }
}
