//! Linear referencing over a polyline.
//!
//! [`IndexedLineString`] parameterises a [`LineString`] by its *planar*
//! arc length, i.e. the cumulative cartesian distance between vertices in
//! the polyline's native coordinate units (degrees, for WGS84 input). The
//! index is deliberately not metric: projection onto the line is a planar
//! operation, and callers convert between index units and meters with a
//! single scale factor derived from the line's great-circle length.

use geo::{Coord, LineString};

/// A polyline indexed by planar arc length.
#[derive(Debug, Clone)]
pub struct IndexedLineString {
    coords: Vec<Coord>,
    /// Cumulative planar length at each vertex; `cumulative[0] == 0.0`.
    cumulative: Vec<f64>,
}

impl IndexedLineString {
    pub fn new(line: &LineString) -> Self {
        let coords: Vec<Coord> = line.coords().copied().collect();
        let mut cumulative = Vec::with_capacity(coords.len());
        cumulative.push(0.0);
        for w in coords.windows(2) {
            let prev = *cumulative.last().unwrap();
            cumulative.push(prev + planar_distance(w[0], w[1]));
        }
        Self { coords, cumulative }
    }

    /// Index of the line's first vertex (always 0).
    #[inline]
    pub fn start_index(&self) -> f64 {
        0.0
    }

    /// Index of the line's last vertex (the total planar length).
    #[inline]
    pub fn end_index(&self) -> f64 {
        *self.cumulative.last().unwrap_or(&0.0)
    }

    /// Project a coordinate onto the line, returning the index of the
    /// closest point. Ties resolve to the earliest segment.
    pub fn project(&self, point: Coord) -> f64 {
        let mut best_index = 0.0;
        let mut best_dist2 = f64::INFINITY;

        for (i, w) in self.coords.windows(2).enumerate() {
            let (a, b) = (w[0], w[1]);
            let seg = Coord { x: b.x - a.x, y: b.y - a.y };
            let len2 = seg.x * seg.x + seg.y * seg.y;
            let t = if len2 == 0.0 {
                0.0
            } else {
                (((point.x - a.x) * seg.x + (point.y - a.y) * seg.y) / len2).clamp(0.0, 1.0)
            };
            let closest = Coord { x: a.x + t * seg.x, y: a.y + t * seg.y };
            let dx = point.x - closest.x;
            let dy = point.y - closest.y;
            let dist2 = dx * dx + dy * dy;
            if dist2 < best_dist2 {
                best_dist2 = dist2;
                best_index = self.cumulative[i] + t * (self.cumulative[i + 1] - self.cumulative[i]);
            }
        }

        best_index
    }

    /// The coordinate at a given index, clamped to the line's extent.
    pub fn extract_point(&self, index: f64) -> Coord {
        let index = index.clamp(self.start_index(), self.end_index());

        let seg = match self
            .cumulative
            .binary_search_by(|c| c.partial_cmp(&index).unwrap())
        {
            Ok(i) => return self.coords[i],
            Err(i) => i.saturating_sub(1),
        };

        if seg >= self.coords.len() - 1 {
            return *self.coords.last().unwrap();
        }

        let seg_len = self.cumulative[seg + 1] - self.cumulative[seg];
        if seg_len == 0.0 {
            return self.coords[seg];
        }

        let t = (index - self.cumulative[seg]) / seg_len;
        let a = self.coords[seg];
        let b = self.coords[seg + 1];
        Coord {
            x: a.x + t * (b.x - a.x),
            y: a.y + t * (b.y - a.y),
        }
    }
}

#[inline]
fn planar_distance(a: Coord, b: Coord) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::line_string;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn straight_line() -> IndexedLineString {
        IndexedLineString::new(&line_string![
            (x: 0.0, y: 0.0),
            (x: 0.0, y: 0.001),
            (x: 0.0, y: 0.003),
        ])
    }

    #[test]
    fn test_index_extent() {
        let line = straight_line();
        assert_eq!(line.start_index(), 0.0);
        assert!(approx_eq(line.end_index(), 0.003, 1e-12));
    }

    #[test]
    fn test_extract_point_interpolates() {
        let line = straight_line();
        let p = line.extract_point(0.002);
        assert!(approx_eq(p.x, 0.0, 1e-12));
        assert!(approx_eq(p.y, 0.002, 1e-12));
    }

    #[test]
    fn test_extract_point_clamps() {
        let line = straight_line();
        let before = line.extract_point(-1.0);
        let after = line.extract_point(1.0);
        assert_eq!(before, Coord { x: 0.0, y: 0.0 });
        assert_eq!(after, Coord { x: 0.0, y: 0.003 });
    }

    #[test]
    fn test_project_on_vertex() {
        let line = straight_line();
        let idx = line.project(Coord { x: 0.0, y: 0.001 });
        assert!(approx_eq(idx, 0.001, 1e-12));
    }

    #[test]
    fn test_project_off_line() {
        // A point beside the line projects perpendicularly onto it.
        let line = straight_line();
        let idx = line.project(Coord { x: 0.0005, y: 0.0015 });
        assert!(approx_eq(idx, 0.0015, 1e-12));
    }

    #[test]
    fn test_project_beyond_ends() {
        let line = straight_line();
        assert_eq!(line.project(Coord { x: 0.0, y: -0.5 }), 0.0);
        assert!(approx_eq(
            line.project(Coord { x: 0.0, y: 0.5 }),
            line.end_index(),
            1e-12
        ));
    }

    #[test]
    fn test_project_extract_round_trip() {
        let line = IndexedLineString::new(&line_string![
            (x: 0.0, y: 0.0),
            (x: 0.001, y: 0.001),
            (x: 0.003, y: 0.001),
        ]);
        for frac in [0.0, 0.25, 0.5, 0.75, 1.0] {
            let index = frac * line.end_index();
            let p = line.extract_point(index);
            assert!(approx_eq(line.project(p), index, 1e-12));
        }
    }
}
