//! # Traffic Engine
//!
//! The streaming core: holds the immutable street data built from a road
//! network and the mutable per-vehicle stream state, and turns GPS fixes
//! into speed samples.
//!
//! ## Architecture
//!
//! The engine is composed of focused modules:
//! - `crossing` - GPS segments, tripline crossings, sample admission
//! - `spatial_index` - R-tree over tripline bounding rectangles
//! - `vehicle_state` - last fix and pending crossings per vehicle
//!
//! ## Threading
//!
//! `update` must be driven by exactly one producer per engine instance.
//! After [`TrafficEngine::set_streets`] returns, the tripline list,
//! cluster map and spatial index never change and may be read from other
//! threads while the single writer keeps feeding fixes. Engines over
//! disjoint vehicle-id shards run in parallel without coordination.

pub mod crossing;
pub mod spatial_index;
pub mod vehicle_state;

pub use crossing::{admissible_speed_sample, Crossing, GpsSegment, SpeedSample};
pub use spatial_index::{IndexedTripline, TriplineIndex};
pub use vehicle_state::{VehicleState, VehicleStore};

use std::collections::BTreeMap;

use geo::Point;
use log::warn;
use serde::Serialize;

use crate::error::Result;
use crate::network::RoadNetwork;
use crate::segments::{street_segments, StreetSegment};
use crate::triplines::{build_triplines, BuildStats, TripLine};
use crate::{Bounds, EngineConfig, GpsFix};

/// The streaming traffic-speed estimation engine.
pub struct TrafficEngine {
    config: EngineConfig,

    // ==== STREET DATA (immutable after set_streets) ====
    triplines: Vec<TripLine>,
    /// Way id -> node indices of the way's tripline clusters.
    clusters: BTreeMap<i64, Vec<usize>>,
    index: TriplineIndex,
    envelope: Option<Bounds>,
    build_stats: Option<BuildStats>,

    // ==== VEHICLE STATE ====
    vehicles: VehicleStore,

    // ==== STATISTICS ====
    /// Crossings observed per tripline, regardless of match outcome.
    trip_events: BTreeMap<u32, u64>,
    /// dropped tripline -> (picked-up tripline -> count).
    drop_offs: BTreeMap<u32, BTreeMap<u32, u64>>,
}

impl Default for TrafficEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TrafficEngine {
    /// Create an engine with the default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with a custom configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            triplines: Vec::new(),
            clusters: BTreeMap::new(),
            index: TriplineIndex::new(),
            envelope: None,
            build_stats: None,
            vehicles: VehicleStore::new(),
            trip_events: BTreeMap::new(),
            drop_offs: BTreeMap::new(),
        }
    }

    // ========================================================================
    // Street Data
    // ========================================================================

    /// Build triplines, clusters and the spatial index from a road
    /// network.
    ///
    /// Replaces any previously built street data; since tripline
    /// identities change with a rebuild, vehicle state and counters are
    /// cleared as well.
    pub fn set_streets(&mut self, network: &RoadNetwork) {
        let build = build_triplines(network, &self.config);

        self.index = TriplineIndex::build(&build.triplines);
        self.triplines = build.triplines;
        self.clusters = build.clusters;
        self.envelope = build.envelope;
        self.build_stats = Some(build.stats);

        self.vehicles = VehicleStore::new();
        self.trip_events.clear();
        self.drop_offs.clear();
    }

    /// All triplines in insertion order; `triplines()[i].tl_index == i`.
    pub fn triplines(&self) -> &[TripLine] {
        &self.triplines
    }

    /// Triplines whose bounding rectangle intersects `bounds`.
    pub fn triplines_in(&self, bounds: &Bounds) -> Vec<&TripLine> {
        let mut hits = self.index.query(bounds);
        hits.sort_unstable();
        hits.into_iter()
            .map(|tl_index| &self.triplines[tl_index as usize])
            .collect()
    }

    /// Center of the engine's bounding envelope, as (longitude, latitude).
    pub fn center_point(&self) -> Option<Point> {
        self.envelope.map(|env| env.center())
    }

    /// Bounding envelope of all triplines.
    pub fn bounds(&self) -> Option<Bounds> {
        self.envelope
    }

    /// Chop the network into street segments at this engine's tripline
    /// clusters.
    pub fn street_segments(&self, network: &RoadNetwork) -> Vec<StreetSegment> {
        street_segments(network, &self.clusters)
    }

    /// Way id -> cluster node indices, as built by `set_streets`.
    pub fn clusters(&self) -> &BTreeMap<i64, Vec<usize>> {
        &self.clusters
    }

    /// Counts of what the last `set_streets` accepted and skipped.
    pub fn build_stats(&self) -> Option<BuildStats> {
        self.build_stats
    }

    // ========================================================================
    // Stream Processing
    // ========================================================================

    /// Feed one GPS fix into the engine.
    ///
    /// Returns the speed samples completed by this fix; a single fix can
    /// complete several. The first fix of a vehicle, a stale pair, and a
    /// stationary pair all return an empty list.
    ///
    /// The only error is [`crate::TrafficError::CrossingOrderViolation`],
    /// which indicates a bug rather than bad input.
    pub fn update(&mut self, fix: GpsFix) -> Result<Vec<SpeedSample>> {
        let Some(p0) = self.vehicles.swap_last_fix(&fix) else {
            return Ok(Vec::new());
        };

        // A chord spanning too long a gap may cross roads the vehicle
        // never drove.
        if fix.time - p0.time > self.config.max_fix_gap_micros {
            return Ok(Vec::new());
        }

        let vehicle_id = fix.vehicle_id.clone();
        let segment = GpsSegment::new(p0, fix);
        if segment.is_still() {
            return Ok(Vec::new());
        }

        let mut samples = Vec::new();
        for crossing in self.crossings_in_order(&segment) {
            *self
                .trip_events
                .entry(crossing.tripline.tl_index)
                .or_insert(0) += 1;

            if let Some(last) = self.complete_pending(&vehicle_id, crossing) {
                if let Some(sample) =
                    admissible_speed_sample(&last, &crossing, self.config.max_speed)?
                {
                    samples.push(sample);
                }
            }
        }

        Ok(samples)
    }

    /// All crossings of a GPS segment, ascending in crossing time.
    pub fn crossings_in_order(&self, segment: &GpsSegment) -> Vec<Crossing> {
        let mut crossings: Vec<Crossing> = self
            .index
            .query(&segment.bounds())
            .into_iter()
            .filter_map(|tl_index| segment.crossing(&self.triplines[tl_index as usize]))
            .collect();

        crossings.sort_by_key(|c| c.time_micros);
        crossings
    }

    /// Match `crossing` against the vehicle's pending set.
    ///
    /// On completion the matched pending crossing is returned, every other
    /// pending crossing stranded on a different way is counted as a
    /// drop-off picked back up at the match, and the pending set collapses
    /// to just the new crossing. Without a completion the crossing simply
    /// joins the pending set, displacing any stale entry for the same
    /// tripline.
    fn complete_pending(&mut self, vehicle_id: &str, crossing: Crossing) -> Option<Crossing> {
        let pending = self.vehicles.pending_mut(vehicle_id)?;

        let completed = pending
            .values()
            .find(|candidate| candidate.completed_by(&crossing))
            .copied();

        if let Some(last) = completed {
            let pick_up = last.tripline;
            for stranded in pending.values() {
                if stranded.tripline.tl_index == pick_up.tl_index {
                    continue;
                }
                if stranded.tripline.way_id == pick_up.way_id {
                    continue;
                }
                *self
                    .drop_offs
                    .entry(stranded.tripline.tl_index)
                    .or_default()
                    .entry(pick_up.tl_index)
                    .or_insert(0) += 1;
            }
            pending.clear();
        }

        pending.insert(crossing.tripline.tl_index, crossing);
        completed
    }

    /// Drop every vehicle whose last fix is older than `horizon_micros`.
    /// Returns the number of vehicles removed.
    pub fn evict_vehicles_older_than(&mut self, horizon_micros: i64) -> usize {
        self.vehicles.evict_older_than(horizon_micros)
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    /// Crossings observed for one tripline so far.
    pub fn n_trip_events(&self, tripline: &TripLine) -> u64 {
        self.trip_events
            .get(&tripline.tl_index)
            .copied()
            .unwrap_or(0)
    }

    /// The drop-off matrix: dropped tripline -> picked-up tripline ->
    /// count. Keys are `tl_index` values.
    pub fn drop_offs(&self) -> &BTreeMap<u32, BTreeMap<u32, u64>> {
        &self.drop_offs
    }

    /// Snapshot of engine-wide counts.
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            tripline_count: self.triplines.len(),
            way_count: self.clusters.len(),
            vehicle_count: self.vehicles.len(),
            pending_crossings: self.vehicles.pending_count(),
            trip_event_total: self.trip_events.values().sum(),
            drop_off_total: self
                .drop_offs
                .values()
                .flat_map(|pickups| pickups.values())
                .sum(),
        }
    }

    /// All triplines as JSON.
    pub fn triplines_json(&self) -> String {
        serde_json::to_string(&self.triplines).unwrap_or_else(|e| {
            warn!("Failed to serialize triplines: {e}");
            "[]".to_string()
        })
    }

    /// The drop-off matrix as JSON.
    pub fn drop_offs_json(&self) -> String {
        serde_json::to_string(&self.drop_offs).unwrap_or_else(|e| {
            warn!("Failed to serialize drop-offs: {e}");
            "{}".to_string()
        })
    }
}

/// Engine statistics for monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EngineStats {
    pub tripline_count: usize,
    /// Ways that received at least one tripline cluster.
    pub way_count: usize,
    pub vehicle_count: usize,
    pub pending_crossings: usize,
    pub trip_event_total: u64,
    pub drop_off_total: u64,
}
