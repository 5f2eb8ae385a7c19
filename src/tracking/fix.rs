//! Position fix definitions

use geo::geometry::Point;
use time::OffsetDateTime;

/// Latitude/longitude pair, in degrees
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// GeoJSON ordering: `[lon, lat]`
    pub fn to_lon_lat(&self) -> [f64; 2] {
        [self.lon, self.lat]
    }

    pub fn to_point(&self) -> Point {
        Point::new(self.lon, self.lat)
    }
}

/// Raw reading delivered by a position source
#[derive(Clone, Debug, PartialEq)]
pub struct Fix {
    pub position: LatLon,
    /// Reported accuracy radius, in meters
    pub accuracy: f64,
    pub captured_at: OffsetDateTime,
}

impl Fix {
    pub fn new(lat: f64, lon: f64, accuracy: f64, captured_at: OffsetDateTime) -> Self {
        Self {
            position: LatLon::new(lat, lon),
            accuracy,
            captured_at,
        }
    }

    /// Build a fix from a unix timestamp in milliseconds, the unit
    /// device positioning APIs report
    pub fn from_millis(lat: f64, lon: f64, accuracy: f64, millis: i64) -> Result<Self, String> {
        let captured_at = OffsetDateTime::from_unix_timestamp_nanos(millis as i128 * 1_000_000)
            .map_err(|e| format!("Invalid fix timestamp {}: {}", millis, e))?;

        Ok(Self::new(lat, lon, accuracy, captured_at))
    }

    pub fn captured_at_millis(&self) -> i64 {
        (self.captured_at.unix_timestamp_nanos() / 1_000_000) as i64
    }
}

/// Accepted fix kept as a permanent point of the session
#[derive(Clone, Debug, PartialEq)]
pub struct TrackPoint {
    pub label: String,
    pub position: LatLon,
    pub accuracy: f64,
    pub recorded_at: OffsetDateTime,
}

impl TrackPoint {
    pub fn from_fix(label: String, fix: &Fix) -> Self {
        Self {
            label,
            position: fix.position,
            accuracy: fix.accuracy,
            recorded_at: fix.captured_at,
        }
    }
}
