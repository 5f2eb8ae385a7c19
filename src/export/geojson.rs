//! GeoJSON feature model

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value};
use time::format_description::well_known;
use time::OffsetDateTime;

use crate::tracking::fix::LatLon;

/// Geometry family requested on export
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Points,
    Lines,
    Polygons,
}

impl GeometryKind {
    pub const ALL: [GeometryKind; 3] = [
        GeometryKind::Points,
        GeometryKind::Lines,
        GeometryKind::Polygons,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GeometryKind::Points => "points",
            GeometryKind::Lines => "lines",
            GeometryKind::Polygons => "polygons",
        }
    }
}

impl FromStr for GeometryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "points" => Ok(GeometryKind::Points),
            "lines" => Ok(GeometryKind::Lines),
            "polygons" => Ok(GeometryKind::Polygons),
            other => Err(format!("Unknown geometry kind `{}`", other)),
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point([f64; 2]),
    LineString(Vec<[f64; 2]>),
    Polygon(Vec<Vec<[f64; 2]>>),
}

impl Geometry {
    pub fn point(p: &LatLon) -> Self {
        Geometry::Point(p.to_lon_lat())
    }

    pub fn line(path: &[LatLon]) -> Self {
        Geometry::LineString(path.iter().map(LatLon::to_lon_lat).collect())
    }

    /// Polygon from an open ring; the first vertex is repeated at the end
    pub fn closed_polygon(ring: &[LatLon]) -> Self {
        let mut coords: Vec<[f64; 2]> = ring.iter().map(LatLon::to_lon_lat).collect();
        if let Some(first) = coords.first().copied() {
            coords.push(first);
        }

        Geometry::Polygon(vec![coords])
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::LineString(_) => "LineString",
            Geometry::Polygon(_) => "Polygon",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature {
    pub geometry: Geometry,
    pub properties: Map<String, Value>,
}

impl Feature {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            properties: Map::new(),
        }
    }

    pub fn property<V: Into<Value>>(mut self, key: &str, value: V) -> Self {
        self.properties.insert(key.to_string(), value.into());

        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn empty() -> Self {
        Self { features: vec![] }
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn to_json_pretty(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed on serialize the features: {}", e))
    }
}

/// File name for an export of `name` (usually a geometry kind) made at `at`
pub fn export_file_name(name: &str, at: OffsetDateTime, extension: &str) -> String {
    let stamp = at
        .format(&well_known::Rfc3339)
        .unwrap_or_else(|_| at.unix_timestamp().to_string())
        .replace(':', "-");

    format!("{}_{}.{}", name, stamp, extension)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::datetime;

    use super::*;

    #[test]
    fn feature_shape() -> Result<(), String> {
        let feature = Feature::new(Geometry::point(&LatLon::new(45.0, -63.0)))
            .property("label", "oak")
            .property("accuracy", 5.0);

        let value = serde_json::to_value(&FeatureCollection {
            features: vec![feature],
        })
        .map_err(|e| e.to_string())?;

        assert_eq!(
            json!({
                "type": "FeatureCollection",
                "features": [{
                    "type": "Feature",
                    "geometry": { "type": "Point", "coordinates": [-63.0, 45.0] },
                    "properties": { "label": "oak", "accuracy": 5.0 }
                }]
            }),
            value
        );

        Ok(())
    }

    #[test]
    fn polygon_is_closed() {
        let ring = vec![
            LatLon::new(0.0, 0.0),
            LatLon::new(1.0, 0.0),
            LatLon::new(1.0, 1.0),
        ];

        assert_eq!(
            Geometry::Polygon(vec![vec![[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [0.0, 0.0]]]),
            Geometry::closed_polygon(&ring)
        );
    }

    #[test]
    fn empty_collection_json() -> Result<(), String> {
        let json = FeatureCollection::empty().to_json_pretty()?;

        assert_eq!("{\n  \"type\": \"FeatureCollection\",\n  \"features\": []\n}", json);

        Ok(())
    }

    #[test]
    fn file_name() {
        assert_eq!(
            "lines_2024-06-01T12-30-00Z.geojson",
            export_file_name(GeometryKind::Lines.as_str(), datetime!(2024-06-01 12:30 UTC), "geojson")
        );
    }

    #[test]
    fn kind_from_str() {
        assert_eq!(Ok(GeometryKind::Polygons), "Polygons".parse());
        assert!("circles".parse::<GeometryKind>().is_err());
    }
}
