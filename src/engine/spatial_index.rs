//! Spatial indexing for tripline queries.
//!
//! An R-tree over tripline bounding rectangles. Built once after tripline
//! construction and read-only thereafter, so concurrent readers need no
//! synchronisation.

use rstar::{RTree, RTreeObject, AABB};

use crate::triplines::TripLine;
use crate::Bounds;

/// Tripline bounds wrapper for R-tree indexing; the payload is the
/// tripline's stable identity.
#[derive(Debug, Clone)]
pub struct IndexedTripline {
    pub tl_index: u32,
    lower: [f64; 2],
    upper: [f64; 2],
}

impl IndexedTripline {
    fn new(tripline: &TripLine) -> Self {
        let b = tripline.bounds();
        Self {
            tl_index: tripline.tl_index,
            lower: [b.min_lng, b.min_lat],
            upper: [b.max_lng, b.max_lat],
        }
    }
}

impl RTreeObject for IndexedTripline {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.lower, self.upper)
    }
}

/// R-tree over all triplines of an engine.
#[derive(Debug, Default)]
pub struct TriplineIndex {
    tree: RTree<IndexedTripline>,
}

impl TriplineIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk-load an index from a tripline list.
    pub fn build(triplines: &[TripLine]) -> Self {
        let entries = triplines.iter().map(IndexedTripline::new).collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Identities of all triplines whose bounding rectangle intersects
    /// `bounds`.
    pub fn query(&self, bounds: &Bounds) -> Vec<u32> {
        let envelope = AABB::from_corners(
            [bounds.min_lng, bounds.min_lat],
            [bounds.max_lng, bounds.max_lat],
        );

        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| entry.tl_index)
            .collect()
    }

    /// Number of indexed triplines.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
