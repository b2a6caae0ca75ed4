//! Crossing detection and speed samples.
//!
//! A [`GpsSegment`] is the chord between two successive fixes of one
//! vehicle. Each tripline it properly intersects yields a [`Crossing`]
//! with a timestamp interpolated along the segment; two crossings on the
//! same way complete into a [`SpeedSample`].

use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{Coord, Line};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrafficError};
use crate::triplines::TripLine;
use crate::{Bounds, GpsFix};

/// The chord between two successive GPS fixes, `p0` the earlier.
#[derive(Debug, Clone, PartialEq)]
pub struct GpsSegment {
    pub p0: GpsFix,
    pub p1: GpsFix,
}

impl GpsSegment {
    pub fn new(p0: GpsFix, p1: GpsFix) -> Self {
        Self { p0, p1 }
    }

    /// A segment whose endpoints coincide in space cannot cross anything.
    pub fn is_still(&self) -> bool {
        self.p0.longitude == self.p1.longitude && self.p0.latitude == self.p1.latitude
    }

    /// Bounding rectangle of the two fixes.
    pub fn bounds(&self) -> Bounds {
        Bounds {
            min_lat: self.p0.latitude.min(self.p1.latitude),
            max_lat: self.p0.latitude.max(self.p1.latitude),
            min_lng: self.p0.longitude.min(self.p1.longitude),
            max_lng: self.p0.longitude.max(self.p1.longitude),
        }
    }

    /// The segment as a 2-D line in lon/lat degree space.
    #[inline]
    pub fn as_line(&self) -> Line {
        Line::new(self.p0.coord(), self.p1.coord())
    }

    /// The crossing of this segment with a tripline, if they properly
    /// intersect.
    ///
    /// The crossing time is interpolated linearly between the two fixes
    /// at the intersection's fractional position along the segment.
    pub fn crossing(&self, tripline: &TripLine) -> Option<Crossing> {
        let gps = self.as_line();

        match line_intersection(gps, tripline.as_line()) {
            Some(LineIntersection::SinglePoint {
                intersection,
                is_proper: true,
            }) => {
                let u = fraction_along(&gps, intersection);
                let span = (self.p1.time - self.p0.time) as f64;
                Some(Crossing {
                    tripline: *tripline,
                    time_micros: self.p0.time + (u * span).round() as i64,
                })
            }
            _ => None,
        }
    }
}

/// Fractional position of `point` along `line`, solved on the dominant
/// axis to avoid dividing by a near-zero component.
fn fraction_along(line: &Line, point: Coord) -> f64 {
    let dx = line.end.x - line.start.x;
    let dy = line.end.y - line.start.y;
    if dx.abs() >= dy.abs() {
        (point.x - line.start.x) / dx
    } else {
        (point.y - line.start.y) / dy
    }
}

/// A GPS segment intersecting one tripline at an interpolated time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Crossing {
    pub tripline: TripLine,
    pub time_micros: i64,
}

impl Crossing {
    /// Whether `other` completes this pending crossing: same way, distinct
    /// tripline. The later crossing of such a pair brackets the stretch of
    /// road between the two triplines.
    pub fn completed_by(&self, other: &Crossing) -> bool {
        self.tripline.way_id == other.tripline.way_id
            && self.tripline.tl_index != other.tripline.tl_index
    }
}

/// A speed observation between two completed crossings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedSample {
    pub start: Crossing,
    pub end: Crossing,
    /// Meters per second.
    pub speed: f64,
}

/// Judge a completed pair of crossings and produce a speed sample if it
/// is admissible.
///
/// Rejected silently: wrong-way travel on a one-way road, zero elapsed
/// time, and speeds above `max_speed` (GPS junk). A *negative* elapsed
/// time is a [`TrafficError::CrossingOrderViolation`]: crossings are
/// consumed in ascending time order, so it cannot occur unless that
/// ordering was broken upstream.
pub fn admissible_speed_sample(
    last: &Crossing,
    next: &Crossing,
    max_speed: f64,
) -> Result<Option<SpeedSample>> {
    if next.tripline.nd_index < last.tripline.nd_index && next.tripline.oneway {
        return Ok(None);
    }

    // The displacement sign is redundant; the node-index order of the two
    // triplines carries the direction.
    let ds = (next.tripline.dist - last.tripline.dist).abs();
    let dt = (next.time_micros - last.time_micros) as f64 / 1_000_000.0;

    if dt < 0.0 {
        return Err(TrafficError::CrossingOrderViolation { dt_seconds: dt });
    }
    if dt == 0.0 {
        return Ok(None);
    }

    let speed = ds / dt;
    if speed > max_speed {
        return Ok(None);
    }

    Ok(Some(SpeedSample {
        start: *last,
        end: *next,
        speed,
    }))
}
