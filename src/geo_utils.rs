//! Geographic computation utilities.
//!
//! Thin wrappers over the great-circle primitives in the `geo` crate,
//! shared by the tripline builder and the crossing engine.
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two coordinates |
//! | [`polyline_length`] | Total length of a coordinate sequence in meters |
//! | [`forward_azimuth`] | Initial bearing from one coordinate to another |
//! | [`destination`] | Coordinate reached from a start, azimuth and distance |
//! | [`clamp_azimuth`] | Normalise an angle to the azimuth range (-180°, 180°] |
//! | [`meters_to_degrees`] | Convert meters to approximate degrees at a latitude |
//!
//! All coordinates are WGS84 longitude/latitude degrees (`x` = longitude,
//! `y` = latitude); all distances are meters; all azimuths are degrees with
//! north at 0° and east at 90°.

use geo::{Bearing, Coord, Destination, Distance, Haversine, Point};

/// Great-circle distance between two coordinates in meters.
///
/// Uses the haversine formula on a spherical Earth, the standard choice for
/// GPS work (accurate to ~0.3%).
#[inline]
pub fn haversine_distance(a: Coord, b: Coord) -> f64 {
    Haversine::distance(Point::from(a), Point::from(b))
}

/// Total great-circle length of a coordinate sequence in meters.
///
/// Empty and single-coordinate sequences have length 0.
pub fn polyline_length(coords: &[Coord]) -> f64 {
    if coords.len() < 2 {
        return 0.0;
    }
    coords
        .windows(2)
        .map(|w| haversine_distance(w[0], w[1]))
        .sum()
}

/// Initial great-circle bearing from `a` to `b`, normalised to
/// (-180°, 180°].
#[inline]
pub fn forward_azimuth(a: Coord, b: Coord) -> f64 {
    clamp_azimuth(Haversine::bearing(Point::from(a), Point::from(b)))
}

/// The coordinate reached by travelling `meters` from `start` along the
/// given azimuth (degrees, north = 0°, east = 90°).
#[inline]
pub fn destination(start: Coord, azimuth: f64, meters: f64) -> Coord {
    Haversine::destination(Point::from(start), azimuth, meters).into()
}

/// Normalise an angle in degrees to the azimuth range (-180°, 180°].
pub fn clamp_azimuth(degrees: f64) -> f64 {
    let mut d = degrees % 360.0;
    if d > 180.0 {
        d -= 360.0;
    } else if d <= -180.0 {
        d += 360.0;
    }
    d
}

/// Convert meters to approximate degrees at a given latitude.
///
/// At the equator one degree is ~111,320 m; the longitude scale shrinks
/// with `cos(latitude)`. Suitable for sizing bounding-box queries, not for
/// precise distance work.
#[inline]
pub fn meters_to_degrees(meters: f64, latitude: f64) -> f64 {
    let meters_per_degree = 111_320.0 * latitude.to_radians().cos().max(0.1);
    meters / meters_per_degree
}
