//! Exports of the accumulated geometry

#[cfg(feature = "csv")]
pub mod csv_file;
pub mod geojson;
pub mod gpx;
