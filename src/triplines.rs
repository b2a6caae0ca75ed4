//! Tripline construction.
//!
//! A tripline is a short line segment laid roughly perpendicular to a
//! road, 10 m before or after an intersection, acting as a detector: a
//! vehicle whose GPS track crosses two triplines of the same road produces
//! a speed sample for the stretch between them.
//!
//! Construction walks every accepted highway way once. Nodes that are way
//! endpoints or intersections become *tripline clusters*: up to two
//! triplines flanking the node along the road, plus an entry in the way's
//! cluster list used later to slice the way into street segments.

use std::collections::{BTreeMap, HashMap, HashSet};

use geo::{Line, Point};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::geo_utils::{clamp_azimuth, destination, forward_azimuth, polyline_length};
use crate::linear_ref::IndexedLineString;
use crate::network::{RoadNetwork, Way};
use crate::{Bounds, EngineConfig};

/// Highway types tracked by the engine. Footpaths, cycleways and the like
/// carry no vehicle traffic worth sampling.
pub const HIGHWAY_TYPES: [&str; 13] = [
    "motorway",
    "trunk",
    "primary",
    "secondary",
    "tertiary",
    "unclassified",
    "residential",
    "service",
    "motorway_link",
    "trunk_link",
    "primary_link",
    "secondary_link",
    "tertiary_link",
];

/// Index-space epsilon (~1 m in degree units) for sampling the local
/// tangent of a way when computing a tripline's orientation.
const BEARING_EPSILON: f64 = 0.000009;

/// A single tripline.
///
/// `tl_index` is globally unique in insertion order and serves as the
/// tripline's identity everywhere (counter keys, pending sets).
/// `cluster_index` numbers the clusters within one way, so the one or two
/// triplines flanking the same node share it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TripLine {
    /// Endpoint to the right of the direction of travel.
    pub right: Point,
    /// Endpoint to the left of the direction of travel.
    pub left: Point,
    pub way_id: i64,
    /// Position of the flanked node within the way's node list.
    pub nd_index: usize,
    /// Global insertion order; the tripline's stable identity.
    pub tl_index: u32,
    /// Per-way cluster sequence number.
    pub cluster_index: u32,
    /// Meters along the way from its start.
    pub dist: f64,
    pub oneway: bool,
}

impl TripLine {
    /// The tripline as a 2-D line segment in lon/lat degree space.
    #[inline]
    pub fn as_line(&self) -> Line {
        Line::new(self.right.0, self.left.0)
    }

    /// Bounding rectangle of the two endpoints.
    pub fn bounds(&self) -> Bounds {
        Bounds {
            min_lat: self.right.y().min(self.left.y()),
            max_lat: self.right.y().max(self.left.y()),
            min_lng: self.right.x().min(self.left.x()),
            max_lng: self.right.x().max(self.left.x()),
        }
    }
}

/// Counts of what construction accepted and skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildStats {
    pub ways_seen: usize,
    pub ways_accepted: usize,
    /// No `highway` tag, or a type outside [`HIGHWAY_TYPES`].
    pub ways_skipped_tag: usize,
    /// Polyline resolution failed (missing nodes).
    pub ways_skipped_geometry: usize,
    /// Shorter than the minimum segment length.
    pub ways_skipped_short: usize,
    /// Nodes too close to the previous cluster on the same way.
    pub nodes_gated: usize,
    /// Triplines dropped because the local tangent was degenerate.
    pub triplines_degenerate: usize,
    pub intersection_nodes: usize,
    pub triplines_built: usize,
}

/// Everything tripline construction produces.
#[derive(Debug, Clone, Default)]
pub struct TriplineBuild {
    pub triplines: Vec<TripLine>,
    /// `way_id` -> strictly increasing node indices of the way's clusters,
    /// always ending with the way's last node index.
    pub clusters: BTreeMap<i64, Vec<usize>>,
    /// Bounding envelope of all triplines.
    pub envelope: Option<Bounds>,
    pub stats: BuildStats,
}

/// Build triplines for every accepted way of the network.
pub fn build_triplines(network: &RoadNetwork, config: &EngineConfig) -> TriplineBuild {
    let intersections = find_intersections(network);

    let mut build = TriplineBuild {
        stats: BuildStats {
            intersection_nodes: intersections.len(),
            ..BuildStats::default()
        },
        ..TriplineBuild::default()
    };

    for (way_id, way) in network.ways() {
        build.stats.ways_seen += 1;

        let accepted = way
            .get_tag("highway")
            .is_some_and(|t| HIGHWAY_TYPES.contains(&t));
        if !accepted {
            build.stats.ways_skipped_tag += 1;
            continue;
        }

        let Some(path) = network.way_polyline(way) else {
            build.stats.ways_skipped_geometry += 1;
            continue;
        };

        let way_len = polyline_length(&path.0);
        if way_len < config.min_segment_length() {
            build.stats.ways_skipped_short += 1;
            continue;
        }

        let indexed = IndexedLineString::new(&path);
        // Index units per meter; the index is planar while way_len is
        // geodetic, so all metric offsets go through this factor.
        let scale = (indexed.end_index() - indexed.start_index()) / way_len;
        let margin_index = config.intersection_margin_meters * scale;

        let oneway = is_oneway(way);

        let mut cluster_index: u32 = 0;
        let mut last_cluster_dist: Option<f64> = None;

        for (i, nd) in way.nodes.iter().enumerate() {
            let endpoint = i == 0 || i == way.nodes.len() - 1;
            if !endpoint && !intersections.contains(nd) {
                continue;
            }

            let pt_index = indexed.project(path.0[i]);
            let pt_dist = pt_index / scale;

            // A cluster closer than the minimum segment length to the
            // previous one would place its triplines out of order.
            if let Some(last) = last_cluster_dist {
                if pt_dist - last < config.min_segment_length() {
                    build.stats.nodes_gated += 1;
                    continue;
                }
            }
            last_cluster_dist = Some(pt_dist);

            build.clusters.entry(way_id).or_default().push(i);

            for offset in [pt_index - margin_index, pt_index + margin_index] {
                if offset < indexed.start_index() || offset > indexed.end_index() {
                    continue;
                }
                let tl_index = build.triplines.len() as u32;
                match gen_tripline(
                    way_id,
                    i,
                    tl_index,
                    cluster_index,
                    &indexed,
                    scale,
                    offset,
                    oneway,
                    config,
                ) {
                    Some(tl) => {
                        let tl_bounds = tl.bounds();
                        build.envelope = Some(match build.envelope {
                            Some(mut env) => {
                                env.expand_to_include(&tl_bounds);
                                env
                            }
                            None => tl_bounds,
                        });
                        build.triplines.push(tl);
                    }
                    None => build.stats.triplines_degenerate += 1,
                }
            }

            cluster_index += 1;
        }

        // Terminate the cluster list with the way's last node index so
        // segmentation always covers the way's tail.
        if let Some(list) = build.clusters.get_mut(&way_id) {
            let terminal = way.nodes.len() - 1;
            if list.last() != Some(&terminal) {
                list.push(terminal);
            }
        }

        build.stats.ways_accepted += 1;
    }

    build.stats.triplines_built = build.triplines.len();
    debug!(
        "tripline build: {} triplines on {}/{} ways ({} intersections, {} nodes gated)",
        build.stats.triplines_built,
        build.stats.ways_accepted,
        build.stats.ways_seen,
        build.stats.intersection_nodes,
        build.stats.nodes_gated,
    );

    build
}

/// Node ids referenced by two or more (way, position) occurrences. A way
/// revisiting one of its own nodes makes that node an intersection too.
pub fn find_intersections(network: &RoadNetwork) -> HashSet<i64> {
    let mut seen: HashMap<i64, u32> = HashMap::new();
    let mut intersections = HashSet::new();

    for (_, way) in network.ways() {
        for nd in &way.nodes {
            let count = seen.entry(*nd).or_insert(0);
            *count += 1;
            if *count > 1 {
                intersections.insert(*nd);
            }
        }
    }

    intersections
}

/// One-way traffic applies to explicit `oneway` tags, motorways and
/// roundabouts.
fn is_oneway(way: &Way) -> bool {
    way.tag_is_true("oneway")
        || way.get_tag("highway") == Some("motorway")
        || way.get_tag("junction") == Some("roundabout")
}

#[allow(clippy::too_many_arguments)]
fn gen_tripline(
    way_id: i64,
    nd_index: usize,
    tl_index: u32,
    cluster_index: u32,
    indexed: &IndexedLineString,
    scale: f64,
    length_index: f64,
    oneway: bool,
    config: &EngineConfig,
) -> Option<TripLine> {
    let bearing = tangent_bearing(indexed, length_index)?;
    let p = indexed.extract_point(length_index);

    let right = destination(p, clamp_azimuth(bearing + 90.0), config.tripline_radius_meters);
    let left = destination(p, clamp_azimuth(bearing - 90.0), config.tripline_radius_meters);

    Some(TripLine {
        right: Point::from(right),
        left: Point::from(left),
        way_id,
        nd_index,
        tl_index,
        cluster_index,
        dist: length_index / scale,
        oneway,
    })
}

/// Tangent bearing of the line at an index, sampled over a small epsilon
/// window clamped to the line's extent. `None` when the window collapses
/// to a single coordinate (degenerate terminal edge), in which case no
/// meaningful tripline orientation exists.
fn tangent_bearing(line: &IndexedLineString, index: f64) -> Option<f64> {
    let (i0, i1) = if index - BEARING_EPSILON <= line.start_index() {
        (line.start_index(), line.start_index() + BEARING_EPSILON)
    } else if index + BEARING_EPSILON >= line.end_index() {
        (line.end_index() - BEARING_EPSILON, line.end_index())
    } else {
        (index - BEARING_EPSILON / 2.0, index + BEARING_EPSILON / 2.0)
    };

    let p0 = line.extract_point(i0);
    let p1 = line.extract_point(i1);
    if p0 == p1 {
        return None;
    }

    Some(forward_azimuth(p0, p1))
}
