//! CSV export of features

use std::io::Write;

use csv::Writer;
use serde_json::Value;

use super::geojson::{FeatureCollection, GeometryKind};

/// Write `features` as CSV: the property columns of the first feature, then
/// the geometry type and the geometry as JSON.
pub fn write_csv<W: Write>(
    kind: GeometryKind,
    features: &FeatureCollection,
    out: W,
) -> Result<(), String> {
    let first = features
        .features
        .first()
        .ok_or_else(|| format!("No {} features to export.", kind))?;

    let columns: Vec<String> = first.properties.keys().cloned().collect();

    let mut wtr = Writer::from_writer(out);

    let mut header = columns.clone();
    header.push("geometry_type".to_string());
    header.push("geometry".to_string());
    wtr.write_record(&header)
        .map_err(|e| format!("Failed on write the header: {}", e))?;

    for feature in &features.features {
        let mut row: Vec<String> = columns
            .iter()
            .map(|k| cell(feature.properties.get(k)))
            .collect();
        row.push(feature.geometry.type_name().to_string());
        row.push(
            serde_json::to_string(&feature.geometry)
                .map_err(|e| format!("Failed on serialize the geometry: {}", e))?,
        );

        wtr.write_record(&row)
            .map_err(|e| format!("Failed on write some row: {}", e))?;
    }

    wtr.flush()
        .map_err(|e| format!("Failed on flush the CSV: {}", e))
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(v) => v.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::geojson::{Feature, Geometry};
    use crate::tracking::fix::LatLon;

    #[test]
    fn points() -> Result<(), String> {
        let features = FeatureCollection {
            features: vec![
                Feature::new(Geometry::point(&LatLon::new(45.0, -63.0)))
                    .property("label", "oak")
                    .property("accuracy", 5.5),
                Feature::new(Geometry::point(&LatLon::new(45.5, -63.5)))
                    .property("label", "birch, young"),
            ],
        };

        let mut out = vec![];
        write_csv(GeometryKind::Points, &features, &mut out)?;
        let text = String::from_utf8(out).map_err(|e| e.to_string())?;

        assert_eq!(
            "label,accuracy,geometry_type,geometry\n\
             oak,5.5,Point,\"{\"\"type\"\":\"\"Point\"\",\"\"coordinates\"\":[-63.0,45.0]}\"\n\
             \"birch, young\",,Point,\"{\"\"type\"\":\"\"Point\"\",\"\"coordinates\"\":[-63.5,45.5]}\"\n",
            text
        );

        Ok(())
    }

    #[test]
    fn nothing_to_write() {
        let mut out = vec![];
        let err = write_csv(GeometryKind::Lines, &FeatureCollection::empty(), &mut out).unwrap_err();

        assert_eq!("No lines features to export.", err);
        assert!(out.is_empty());
    }
}
