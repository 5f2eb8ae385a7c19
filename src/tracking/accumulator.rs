//! Track accumulator: the geometry and statistics of one session

use std::fmt;

use log::{debug, trace};
use serde::Serialize;
use time::Duration;

use super::config::CaptureConfig;
use super::fix::{Fix, LatLon, TrackPoint};
use super::geodesic::{distance, polygon_area};
use super::sampling::should_accept;
use crate::export::geojson::{Feature, FeatureCollection, Geometry, GeometryKind};

/// Line and polygon ring captured between one start and the next stop
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Segment {
    pub line: Vec<LatLon>,
    /// Open ring, closed only on export
    pub polygon: Vec<LatLon>,
}

/// Statistics derived from a session at a given moment
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionAggregates {
    #[serde(with = "seconds")]
    pub elapsed: Duration,
    /// Meters, over every segment
    pub total_distance: f64,
    pub point_count: usize,
    /// Vertices of the active line
    pub line_vertices: usize,
    /// Vertices of the active polygon ring
    pub polygon_vertices: usize,
    pub min_accuracy: Option<f64>,
    pub max_accuracy: Option<f64>,
    /// Square meters enclosed by the active ring
    pub area: f64,
}

impl fmt::Display for SessionAggregates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let accuracy = |a: Option<f64>| match a {
            Some(v) => format!("{:.1}", v),
            None => "—".to_string(),
        };

        write!(
            f,
            "{}s, {:.1}m, {} points, {} line vertices, {} polygon vertices, accuracy {}..{}m, area {:.1}m²",
            self.elapsed.whole_seconds(),
            self.total_distance,
            self.point_count,
            self.line_vertices,
            self.polygon_vertices,
            accuracy(self.min_accuracy),
            accuracy(self.max_accuracy),
            self.area
        )
    }
}

/// Accumulated state of a tracking session
#[derive(Clone, Debug, Default)]
pub struct Session {
    points: Vec<TrackPoint>,
    segments: Vec<Segment>,
    last_accepted: Option<Fix>,
    total_distance: f64,
    min_accuracy: Option<f64>,
    max_accuracy: Option<f64>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new line/polygon pair. Points, distance and accuracy
    /// bounds carry over.
    pub fn begin_segment(&mut self) {
        self.segments.push(Segment::default());
    }

    /// Forget the last accepted fix so the next one bootstraps a segment
    pub fn forget_last_fix(&mut self) {
        self.last_accepted = None;
    }

    /// Feed one fix through the sampling policy. Returns whether it became
    /// a vertex.
    pub fn apply_fix(&mut self, fix: &Fix, conf: &CaptureConfig) -> bool {
        self.observe_accuracy(fix.accuracy);

        if !should_accept(self.last_accepted.as_ref(), fix, conf.mode, conf.threshold) {
            trace!(
                "Fix at {},{} rejected ({} {})",
                fix.position.lat,
                fix.position.lon,
                conf.mode,
                conf.threshold
            );
            return false;
        }

        if conf.capture_points {
            self.points.push(TrackPoint::from_fix(conf.label.clone(), fix));
        }

        let segment = self.current_segment_mut();
        if conf.capture_line {
            segment.line.push(fix.position);
        }
        if conf.capture_polygon {
            segment.polygon.push(fix.position);
        }

        if let Some(prev) = &self.last_accepted {
            self.total_distance += distance(&prev.position, &fix.position);
        }
        self.last_accepted = Some(fix.clone());

        debug!(
            "Fix at {},{} accepted, {:.1}m so far",
            fix.position.lat, fix.position.lon, self.total_distance
        );

        true
    }

    fn observe_accuracy(&mut self, accuracy: f64) {
        if !accuracy.is_finite() {
            return;
        }

        self.min_accuracy = Some(match self.min_accuracy {
            Some(min) if min <= accuracy => min,
            _ => accuracy,
        });
        self.max_accuracy = Some(match self.max_accuracy {
            Some(max) if max >= accuracy => max,
            _ => accuracy,
        });
    }

    fn current_segment_mut(&mut self) -> &mut Segment {
        if self.segments.is_empty() {
            self.segments.push(Segment::default());
        }

        let last = self.segments.len() - 1;
        &mut self.segments[last]
    }

    pub fn current_segment(&self) -> Option<&Segment> {
        self.segments.last()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    pub fn last_accepted(&self) -> Option<&Fix> {
        self.last_accepted.as_ref()
    }

    pub fn total_distance(&self) -> f64 {
        self.total_distance
    }

    pub fn accuracy_bounds(&self) -> Option<(f64, f64)> {
        Some((self.min_accuracy?, self.max_accuracy?))
    }

    pub fn snapshot(&self, elapsed: Duration) -> SessionAggregates {
        let (line_vertices, polygon_vertices, area) = match self.current_segment() {
            Some(seg) => (seg.line.len(), seg.polygon.len(), polygon_area(&seg.polygon)),
            None => (0, 0, 0.0),
        };

        SessionAggregates {
            elapsed,
            total_distance: self.total_distance,
            point_count: self.points.len(),
            line_vertices,
            polygon_vertices,
            min_accuracy: self.min_accuracy,
            max_accuracy: self.max_accuracy,
            area,
        }
    }

    /// Accumulated geometry of `kind` as GeoJSON features. Lines under 2
    /// vertices and rings under 3 are left out.
    pub fn export_geometry(&self, kind: GeometryKind) -> FeatureCollection {
        let features = match kind {
            GeometryKind::Points => self.points.iter().map(point_feature).collect(),
            GeometryKind::Lines => self
                .segments
                .iter()
                .filter(|s| s.line.len() >= 2)
                .map(|s| Feature::new(Geometry::line(&s.line)))
                .collect(),
            GeometryKind::Polygons => self
                .segments
                .iter()
                .filter(|s| s.polygon.len() >= 3)
                .map(|s| Feature::new(Geometry::closed_polygon(&s.polygon)))
                .collect(),
        };

        FeatureCollection { features }
    }
}

fn point_feature(point: &TrackPoint) -> Feature {
    let timestamp = point
        .recorded_at
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default();

    Feature::new(Geometry::point(&point.position))
        .property("label", point.label.clone())
        .property("accuracy", point.accuracy)
        .property("timestamp", timestamp)
}

mod seconds {
    use serde::Serializer;
    use time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_seconds_f64())
    }
}
