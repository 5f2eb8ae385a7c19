//! CSV file source integration, replays recorded fixes

use std::io::Read;

use csv::{Reader, StringRecord};
use log::info;
use serde::Deserialize;
use time::format_description::well_known;
use time::OffsetDateTime;

use super::{Finished, FixEvent, FixFeed, FixSource, Subscription};
use crate::Fix;

/// Column names of a fixes file
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct FixFields {
    pub latitude: String,
    pub longitude: String,
    /// Single `lon, lat` column, used when present
    pub coordinates: String,
    pub accuracy: String,
    pub time: String,
    /// `coordinates` holds `lat, lon` instead
    pub flip_coordinates: bool,
}

impl Default for FixFields {
    fn default() -> Self {
        Self {
            latitude: "latitude".to_string(),
            longitude: "longitude".to_string(),
            coordinates: "coordinates".to_string(),
            accuracy: "accuracy".to_string(),
            time: "time".to_string(),
            flip_coordinates: false,
        }
    }
}

/// Recorded fixes source
pub struct CsvFixSource<T>
where
    T: Read,
{
    rdr: Reader<T>,
    fields: FixFields,
}

impl<T> CsvFixSource<T>
where
    T: Read,
{
    pub fn new(rdr: Reader<T>, fields: Option<FixFields>) -> Self {
        Self {
            rdr,
            fields: fields.unwrap_or_default(),
        }
    }

    /// Read every fix of the file, in file order
    pub fn load(&mut self) -> Result<Vec<Fix>, String> {
        let mut fixes = vec![];

        let mut header = self
            .rdr
            .headers()
            .map_err(|e| format!("Failed on read the header: {}", e))?
            .clone();
        let header_idx = parse_header(&self.fields, &mut header)?;

        for row in self.rdr.records() {
            let mut rec = row.map_err(|e| format!("Failed on read some row: {}", e))?;

            if rec.len() < 2 {
                continue;
            }

            let fix = parse_row(&header_idx, &self.fields, &mut rec)
                .map_err(|e| format!("Error with row {:?}: {}", rec, e))?;

            if let Some(fix) = fix {
                fixes.push(fix);
            }
        }

        Ok(fixes)
    }
}

impl<T> FixSource for CsvFixSource<T>
where
    T: Read,
{
    fn subscribe(&mut self, feed: FixFeed) -> Result<Box<dyn Subscription>, String> {
        let fixes = self.load()?;
        info!("Replaying {} recorded fixes", fixes.len());

        for fix in fixes {
            if feed.send(FixEvent::Position(fix)).is_err() {
                break;
            }
        }

        Ok(Box::new(Finished))
    }
}

#[derive(Debug)]
enum CoordinatesIndex {
    Split { lat: usize, lon: usize },
    Joined(usize),
}

/// Field to index map
#[derive(Debug)]
struct FieldsIndex {
    coordinates: CoordinatesIndex,
    time: usize,
    accuracy: Option<usize>,
}

fn parse_header(fields: &FixFields, header: &mut StringRecord) -> Result<FieldsIndex, String> {
    header.trim();

    let find = |name: &str| {
        header
            .iter()
            .position(|h| h.to_lowercase() == name.to_lowercase())
    };

    let coordinates = match find(&fields.coordinates) {
        Some(idx) => CoordinatesIndex::Joined(idx),
        None => match (find(&fields.latitude), find(&fields.longitude)) {
            (Some(lat), Some(lon)) => CoordinatesIndex::Split { lat, lon },
            _ => return Err("Latitude/longitude headers not found".to_string()),
        },
    };

    let time = find(&fields.time).ok_or("Time header not found")?;

    let accuracy = find(&fields.accuracy);

    Ok(FieldsIndex {
        coordinates,
        time,
        accuracy,
    })
}

fn parse_row(
    header: &FieldsIndex,
    fields: &FixFields,
    row: &mut StringRecord,
) -> Result<Option<Fix>, String> {
    row.trim();

    let (lat, lon) = match header.coordinates {
        CoordinatesIndex::Split { lat, lon } => {
            let raw_lat = row.get(lat).unwrap_or_default();
            let raw_lon = row.get(lon).unwrap_or_default();
            if raw_lat.is_empty() || raw_lon.is_empty() {
                return Ok(None);
            }

            (parse_latitude(raw_lat)?, parse_longitude(raw_lon)?)
        }
        CoordinatesIndex::Joined(idx) => {
            let raw_coordinates = row.get(idx).ok_or("Coordinates field not found")?;
            let separator = match raw_coordinates {
                s if s.contains(',') => ",",
                s if s.contains(';') => ";",
                _ => " ",
            };
            let scoordinates: Vec<&str> = raw_coordinates
                .split(separator)
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .collect();
            if scoordinates.len() != 2 {
                return Ok(None);
            }

            let (ilat, ilng) = if fields.flip_coordinates { (0, 1) } else { (1, 0) };

            (
                parse_latitude(scoordinates[ilat])?,
                parse_longitude(scoordinates[ilng])?,
            )
        }
    };

    let captured_at = match row.get(header.time) {
        Some(d) => parse_time(d)?,
        None => return Err("Time field not found".to_string()),
    };

    let accuracy = header
        .accuracy
        .and_then(|i| row.get(i))
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    Ok(Some(Fix::new(lat, lon, accuracy, captured_at)))
}

fn parse_latitude(raw: &str) -> Result<f64, String> {
    raw.parse::<f64>()
        .map_err(|e| format!("Invalid latitude format: {}", e))
}

fn parse_longitude(raw: &str) -> Result<f64, String> {
    raw.parse::<f64>()
        .map_err(|e| format!("Invalid longitude format: {}", e))
}

/// RFC3339 or unix epoch milliseconds
fn parse_time(raw: &str) -> Result<OffsetDateTime, String> {
    if let Ok(millis) = raw.parse::<i64>() {
        return OffsetDateTime::from_unix_timestamp_nanos(millis as i128 * 1_000_000)
            .map_err(|e| format!("Failed on parse the time: {}", e));
    }

    OffsetDateTime::parse(raw, &well_known::Rfc3339)
        .map_err(|e| format!("Failed on parse the time: {}", e))
}

#[cfg(test)]
pub mod tests {
    use std::sync::mpsc::channel;

    use csv::ReaderBuilder;
    use time::macros::datetime;

    use super::*;

    fn source(data: &str) -> CsvFixSource<&[u8]> {
        let rdr = ReaderBuilder::new()
            .flexible(true)
            .from_reader(data.as_bytes());

        CsvFixSource::new(rdr, None)
    }

    #[test]
    fn split_columns() -> Result<(), String> {
        let data = "latitude,longitude,accuracy,time
            45.0,-63.0,5,\"2024-06-01T12:00:00Z\"
            45.00009,-63.0,8,1717243201000
        ";

        let fixes = source(data).load()?;
        assert_eq!(2, fixes.len());
        assert_eq!(
            Fix::new(45.0, -63.0, 5.0, datetime!(2024-06-01 12:00 UTC)),
            fixes[0]
        );
        assert_eq!(
            Fix::new(45.00009, -63.0, 8.0, datetime!(2024-06-01 12:00:01 UTC)),
            fixes[1]
        );

        Ok(())
    }

    #[test]
    fn joined_coordinates() -> Result<(), String> {
        let data = "coordinates,time\n\
            \"-48.8702222, -26.31832\",\"2019-10-01T00:01:00.000+00:00\"\n\
            \"-48.8802222 -26.31832\",\"2019-10-01T00:02:00.000+00:00\"\n\
            \"-48.8902222;-26.31832\",\"2019-10-01T00:03:00.000+00:00\"\n";

        let fixes = source(data).load()?;
        assert_eq!(3, fixes.len());
        assert_eq!(-26.31832, fixes[0].position.lat);
        assert_eq!(-48.8702222, fixes[0].position.lon);
        assert_eq!(0.0, fixes[0].accuracy);
        assert_eq!(-48.8902222, fixes[2].position.lon);

        Ok(())
    }

    #[test]
    fn skip_blank_coordinates() -> Result<(), String> {
        let data = "latitude,longitude,time
            45.0,-63.0,\"2024-06-01T12:00:00Z\"
            ,,\"2024-06-01T12:00:01Z\"
            , ,\"2024-06-01T12:00:02Z\"
        ";

        let fixes = source(data).load()?;
        assert_eq!(1, fixes.len());

        Ok(())
    }

    #[test]
    fn invalid_time() {
        let data = "latitude,longitude,time
            45.0,-63.0,yesterday
        ";

        let err = source(data).load().unwrap_err();
        assert!(err.contains("Failed on parse the time"), "{}", err);
    }

    #[test]
    fn missing_header() {
        let err = source("lat,time\n1,2\n").load().unwrap_err();
        assert_eq!("Latitude/longitude headers not found", err);
    }

    #[test]
    fn subscribe_replays_in_order() -> Result<(), String> {
        let data = "latitude,longitude,time
            45.00018,-63.0,1717243202000
            45.0,-63.0,1717243200000
        ";

        let (tx, rx) = channel();
        let mut sub = source(data).subscribe(tx)?;
        sub.cancel();

        let lats: Vec<f64> = rx
            .iter()
            .filter_map(|e| match e {
                FixEvent::Position(f) => Some(f.position.lat),
                FixEvent::Failure(_) => None,
            })
            .collect();
        assert_eq!(vec![45.00018, 45.0], lats);

        Ok(())
    }
}
