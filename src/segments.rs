//! Street segmentation.
//!
//! Slices each highway way at its tripline cluster nodes, yielding the
//! stretches of road that speed samples are attributable to. Pure
//! geometry reporting: segments are derived on demand and not retained.

use std::collections::{BTreeMap, HashMap};

use geo::Coord;
use serde::{Deserialize, Serialize};

use crate::geo_utils::polyline_length;
use crate::network::RoadNetwork;

/// A stretch of one way between two tripline clusters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreetSegment {
    /// The segment's polyline, endpoints inclusive.
    pub points: Vec<Coord>,
    pub way_id: i64,
    /// Tags of the owning way.
    pub tags: HashMap<String, String>,
    /// Node index of the segment's start within the way.
    pub start_nd: usize,
    /// Node index of the segment's end within the way.
    pub end_nd: usize,
}

impl StreetSegment {
    pub fn length_meters(&self) -> f64 {
        polyline_length(&self.points)
    }
}

/// Chop every highway way of the network into segments at its cluster
/// node indices.
///
/// All ways carrying a `highway` tag are segmented, including types the
/// tripline builder rejects; ways without any cluster produce a single
/// whole-way segment. Ways whose geometry cannot be resolved are skipped.
pub fn street_segments(
    network: &RoadNetwork,
    clusters: &BTreeMap<i64, Vec<usize>>,
) -> Vec<StreetSegment> {
    let mut segments = Vec::new();

    for (way_id, way) in network.ways() {
        if !way.has_tag("highway") {
            continue;
        }

        let Some(path) = network.way_polyline(way) else {
            continue;
        };

        let mut nds = clusters.get(&way_id).cloned().unwrap_or_default();
        let terminal = path.0.len() - 1;
        if nds.last() != Some(&terminal) {
            nds.push(terminal);
        }

        let mut last_nd = 0;
        for nd in nds {
            if nd == last_nd {
                continue;
            }

            segments.push(StreetSegment {
                points: path.0[last_nd..=nd].to_vec(),
                way_id,
                tags: way.tags.clone(),
                start_nd: last_nd,
                end_nd: nd,
            });

            last_nd = nd;
        }
    }

    segments
}
