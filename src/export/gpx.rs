//! GPX export of a session

use std::io::Write;

use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};

use crate::tracking::accumulator::Session;

pub struct GpxGenerator {
    pub name: String,
    pub waypoints: Vec<Waypoint>,
    pub tracks: Vec<Track>,
}

impl GpxGenerator {
    pub fn empty(name: String) -> Self {
        Self {
            name,
            waypoints: vec![],
            tracks: vec![],
        }
    }

    /// Points become waypoints and every line with 2+ vertices a segment of
    /// a single track
    pub fn from_session(name: String, session: &Session) -> Self {
        let mut generator = Self::empty(name.clone());

        for point in session.points() {
            let mut wp = Waypoint::new(point.position.to_point());
            wp.name = Some(point.label.clone());
            wp.time = Some(point.recorded_at.into());
            wp.comment = Some(format!("accuracy {:.1}m", point.accuracy));

            generator.waypoints.push(wp);
        }

        let mut track = Track::new();
        track.name = Some(name);
        for seg in session.segments().iter().filter(|s| s.line.len() >= 2) {
            let mut tseg = TrackSegment::new();
            tseg.points = seg
                .line
                .iter()
                .map(|p| Waypoint::new(p.to_point()))
                .collect();

            track.segments.push(tseg);
        }

        if !track.segments.is_empty() {
            generator.tracks.push(track);
        }

        generator
    }

    pub fn generate(self) -> Result<Gpx, String> {
        let mut gpx: Gpx = Default::default();
        gpx.version = GpxVersion::Gpx11;
        gpx.creator = Some("fieldtrack".to_string());
        gpx.waypoints = self.waypoints;
        gpx.tracks = self.tracks;

        Ok(gpx)
    }

    pub fn write<W: Write>(self, out: W) -> Result<(), String> {
        let doc = self.generate()?;

        gpx::write(&doc, out).map_err(|e| format!("Failed on write the GPX: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::tracking::config::CaptureConfig;
    use crate::Fix;

    #[test]
    fn session_to_gpx() -> Result<(), String> {
        let mut session = Session::new();
        session.begin_segment();
        let mut conf = CaptureConfig::new();
        conf.label("plot 7");

        session.apply_fix(&Fix::new(-26.31832, -48.8702222, 4.0, datetime!(2021-05-24 0:00 UTC)), &conf);
        session.apply_fix(&Fix::new(-26.3185919, -48.8619776, 6.0, datetime!(2021-05-24 0:05 UTC)), &conf);
        session.begin_segment();

        let gpx = GpxGenerator::from_session("walk".to_string(), &session).generate()?;

        assert_eq!(Some("fieldtrack".to_string()), gpx.creator);
        assert_eq!(2, gpx.waypoints.len());
        assert_eq!(Some("plot 7".to_string()), gpx.waypoints[0].name);
        assert_eq!(Some(datetime!(2021-05-24 0:05 UTC).into()), gpx.waypoints[1].time);
        assert_eq!(1, gpx.tracks.len());
        assert_eq!(Some("walk".to_string()), gpx.tracks[0].name);
        assert_eq!(1, gpx.tracks[0].segments.len());
        let segment = &gpx.tracks[0].segments[0];
        assert_eq!(2, segment.points.len());
        assert_eq!(
            geo::Point::new(-48.8702222, -26.31832),
            segment.points[0].point()
        );

        Ok(())
    }

    #[test]
    fn empty_session() -> Result<(), String> {
        let gpx = GpxGenerator::from_session("walk".to_string(), &Session::new()).generate()?;

        assert!(gpx.waypoints.is_empty());
        assert!(gpx.tracks.is_empty());

        let mut out = vec![];
        GpxGenerator::from_session("walk".to_string(), &Session::new()).write(&mut out)?;
        assert!(!out.is_empty());

        Ok(())
    }
}
