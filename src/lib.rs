//! # trafficflow
//!
//! Streaming traffic-speed estimation from vehicle GPS fixes.
//!
//! The engine consumes a static road network (an OpenStreetMap-style
//! extract) and an unbounded stream of GPS fixes, and emits speed samples
//! attributable to specific stretches of road:
//!
//! - Short *triplines* are laid perpendicular to every road on both sides
//!   of each intersection and indexed in an R-tree.
//! - Each pair of successive fixes from a vehicle forms a segment; its
//!   tripline crossings are ordered in time and matched into completed
//!   pairs, each yielding one speed sample.
//! - Crossings that never complete are counted as *drop-offs*, a useful
//!   signal for map-connectivity problems.
//!
//! ## Quick start
//!
//! ```rust
//! use trafficflow::{GpsFix, Node, RoadNetwork, TrafficEngine, Way};
//!
//! // A 111 m residential street running north from the equator.
//! let mut network = RoadNetwork::new();
//! network.add_node(1, Node::new(0.0, 0.0));
//! network.add_node(2, Node::new(0.0, 0.001));
//! network.add_way(10, Way::new(vec![1, 2]).with_tag("highway", "residential"));
//!
//! let mut engine = TrafficEngine::new();
//! engine.set_streets(&network);
//! assert_eq!(engine.triplines().len(), 2);
//!
//! // The first fix only primes the vehicle; samples come from later pairs.
//! let samples = engine.update(GpsFix::new("bus-7", 0, 0.0, 0.00005)).unwrap();
//! assert!(samples.is_empty());
//! ```

use geo::{Coord, Point};
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{Result, TrafficError};

// Geographic utilities (distance, azimuth, destination points)
pub mod geo_utils;

// Planar linear referencing over polylines
pub mod linear_ref;
pub use linear_ref::IndexedLineString;

// Road network model filled by an external loader
pub mod network;
pub use network::{Node, RoadNetwork, Way};

// Tripline construction
pub mod triplines;
pub use triplines::{BuildStats, TripLine};

// Street segmentation at tripline clusters
pub mod segments;
pub use segments::StreetSegment;

// The crossing engine and its components
pub mod engine;
pub use engine::{
    Crossing, EngineStats, GpsSegment, SpeedSample, TrafficEngine, TriplineIndex,
};

// ============================================================================
// Core Types
// ============================================================================

/// A single GPS fix from a vehicle.
///
/// Times are microseconds since an arbitrary but stream-consistent epoch;
/// coordinates are WGS84 degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsFix {
    pub vehicle_id: String,
    /// Timestamp in microseconds.
    pub time: i64,
    pub longitude: f64,
    pub latitude: f64,
}

impl GpsFix {
    pub fn new(vehicle_id: impl Into<String>, time: i64, longitude: f64, latitude: f64) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            time,
            longitude,
            latitude,
        }
    }

    #[inline]
    pub fn coord(&self) -> Coord {
        Coord { x: self.longitude, y: self.latitude }
    }

    /// Check that the fix has finite, in-range coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// An axis-aligned geographic bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Bounds of a coordinate sequence; `None` when empty.
    pub fn from_coords(coords: &[Coord]) -> Option<Self> {
        let first = coords.first()?;
        let mut bounds = Self {
            min_lat: first.y,
            max_lat: first.y,
            min_lng: first.x,
            max_lng: first.x,
        };
        for c in &coords[1..] {
            bounds.min_lat = bounds.min_lat.min(c.y);
            bounds.max_lat = bounds.max_lat.max(c.y);
            bounds.min_lng = bounds.min_lng.min(c.x);
            bounds.max_lng = bounds.max_lng.max(c.x);
        }
        Some(bounds)
    }

    /// The center of the bounds as a (longitude, latitude) point.
    pub fn center(&self) -> Point {
        Point::new(
            (self.min_lng + self.max_lng) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }

    /// Grow these bounds to cover `other` as well.
    pub fn expand_to_include(&mut self, other: &Bounds) {
        self.min_lat = self.min_lat.min(other.min_lat);
        self.max_lat = self.max_lat.max(other.max_lat);
        self.min_lng = self.min_lng.min(other.min_lng);
        self.max_lng = self.max_lng.max(other.max_lng);
    }
}

/// Configuration for tripline placement and sample admission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Distance from an intersection, measured along the road, at which a
    /// tripline crosses it. Default: 10.0 meters.
    pub intersection_margin_meters: f64,

    /// Distance of a tripline to one side of the street; the tripline is
    /// twice this wide. Default: 10.0 meters.
    pub tripline_radius_meters: f64,

    /// Maximum admissible vehicle speed; anything faster is treated as GPS
    /// noise. Default: 31.0 m/s (~112 km/h).
    pub max_speed: f64,

    /// Maximum time between two successive fixes of one vehicle; the chord
    /// of a longer gap may cross unrelated roads and is discarded.
    /// Default: 20 s, expressed in microseconds.
    pub max_fix_gap_micros: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            intersection_margin_meters: 10.0,
            tripline_radius_meters: 10.0,
            max_speed: 31.0,
            max_fix_gap_micros: 20_000_000,
        }
    }
}

impl EngineConfig {
    /// Minimum length of a way tracked by the engine. Shorter ways would
    /// place triplines out of order along the road.
    #[inline]
    pub fn min_segment_length(&self) -> f64 {
        2.0 * self.intersection_margin_meters
    }
}
