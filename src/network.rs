//! In-memory road network model.
//!
//! Holds the subset of an OpenStreetMap-style extract the engine needs:
//! nodes with WGS84 coordinates and ways as ordered node-id sequences with
//! their tag maps. Decoding a PBF/XML extract into this model is the
//! loader's job, not this crate's.

use std::collections::{BTreeMap, HashMap};

use geo::{Coord, LineString};
use serde::{Deserialize, Serialize};

/// A network node: one WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub longitude: f64,
    pub latitude: f64,
}

impl Node {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self { longitude, latitude }
    }

    #[inline]
    pub fn coord(&self) -> Coord {
        Coord { x: self.longitude, y: self.latitude }
    }
}

/// A way: an ordered sequence of node ids plus its tag map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Way {
    pub nodes: Vec<i64>,
    pub tags: HashMap<String, String>,
}

impl Way {
    pub fn new(nodes: Vec<i64>) -> Self {
        Self { nodes, tags: HashMap::new() }
    }

    /// Attach a tag; convenient for building networks by hand.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn has_tag(&self, key: &str) -> bool {
        self.tags.contains_key(key)
    }

    pub fn get_tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Whether the tag carries an OSM-style truthy value
    /// (`yes`, `true` or `1`).
    pub fn tag_is_true(&self, key: &str) -> bool {
        matches!(self.get_tag(key), Some("yes") | Some("true") | Some("1"))
    }
}

/// The static road network an engine is built from.
///
/// Ways and nodes are keyed by their 64-bit ids. Iteration order is id
/// order, so identical networks always produce identical engines.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoadNetwork {
    nodes: BTreeMap<i64, Node>,
    ways: BTreeMap<i64, Way>,
}

impl RoadNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, id: i64, node: Node) {
        self.nodes.insert(id, node);
    }

    pub fn add_way(&mut self, id: i64, way: Way) {
        self.ways.insert(id, way);
    }

    pub fn node(&self, id: i64) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn way(&self, id: i64) -> Option<&Way> {
        self.ways.get(&id)
    }

    /// Iterate over all ways in ascending id order.
    pub fn ways(&self) -> impl Iterator<Item = (i64, &Way)> {
        self.ways.iter().map(|(id, way)| (*id, way))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn way_count(&self) -> usize {
        self.ways.len()
    }

    /// Resolve a way to its polyline.
    ///
    /// Returns `None` when any referenced node is missing from the extract
    /// or the way has fewer than two nodes; such ways carry no usable
    /// geometry.
    pub fn way_polyline(&self, way: &Way) -> Option<LineString> {
        if way.nodes.len() < 2 {
            return None;
        }
        let coords: Option<Vec<Coord>> = way
            .nodes
            .iter()
            .map(|id| self.nodes.get(id).map(Node::coord))
            .collect();
        coords.map(LineString::new)
    }
}
