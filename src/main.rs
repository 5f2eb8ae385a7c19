//! fieldtrack cli - Replay recorded GPS fixes into points, lines and polygons

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use argopt::{cmd_group, subcmd};
use csv::ReaderBuilder;
use log::info;
use serde::Deserialize;
use time::OffsetDateTime;

use fieldtrack::export::csv_file::write_csv;
use fieldtrack::sources::{CsvFixSource, FixFields};
use fieldtrack::{
    export_file_name, CaptureConfig, GeometryKind, GpxGenerator, SessionAggregates,
    SessionController,
};

/// CLI of fieldtrack - Turn recorded GPS fixes into GeoJSON, CSV and GPX
#[cmd_group(commands = [replay, stats])]
fn main() -> Result<(), String> {}

/// Replay a CSV of fixes and write the captured geometry
#[subcmd]
fn replay(
    /// CSV file with the recorded fixes
    csv_path: String,
    /// Directory receiving the exports
    destination: String,
    /// Capture, export and fields configuration. Default: .fieldtrack.yaml, ~/.fieldtrack.yaml
    #[opt(long)]
    config: Option<String>,
) -> Result<(), String> {
    init_logging();

    let conf = load_configs(config);
    let ctl = run_session(&csv_path, &conf)?;

    let dir = Path::new(&destination);
    fs::create_dir_all(dir)
        .map_err(|e| format!("Failed on create the destination dir: {}", e))?;

    let now = OffsetDateTime::now_utc();

    for format in &conf.export.formats {
        match format {
            ExportFormat::Gpx => {
                let path = dir.join(export_file_name("track", now, "gpx"));
                let file = File::create(&path)
                    .map_err(|e| format!("Failed on create the destination file: {}", e))?;

                GpxGenerator::from_session(conf.track_name(), ctl.session())
                    .write(BufWriter::new(file))?;
                info!("Wrote {}", path.display());
            }
            ExportFormat::GeoJson | ExportFormat::Csv => {
                for kind in GeometryKind::ALL {
                    let features = ctl.export_geometry(kind);
                    if features.is_empty() {
                        info!("No {} features to export", kind);
                        continue;
                    }

                    let path = dir.join(export_file_name(kind.as_str(), now, format.extension()));
                    let file = File::create(&path)
                        .map_err(|e| format!("Failed on create the destination file: {}", e))?;

                    if *format == ExportFormat::GeoJson {
                        let json = features.to_json_pretty()?;
                        BufWriter::new(file)
                            .write_all(json.as_bytes())
                            .map_err(|e| format!("Failed on write the GeoJSON: {}", e))?;
                    } else {
                        write_csv(kind, &features, BufWriter::new(file))?;
                    }
                    info!("Wrote {} {} to {}", features.len(), kind, path.display());
                }
            }
        }
    }

    Ok(())
}

/// Replay a CSV of fixes and print the final statistics as JSON
#[subcmd]
fn stats(
    /// CSV file with the recorded fixes
    csv_path: String,
    /// Capture and fields configuration. Default: .fieldtrack.yaml, ~/.fieldtrack.yaml
    #[opt(long)]
    config: Option<String>,
) -> Result<(), String> {
    init_logging();

    let conf = load_configs(config);
    let ctl = run_session(&csv_path, &conf)?;
    let stats: SessionAggregates = ctl.snapshot();

    let json = serde_json::to_string_pretty(&stats).map_err(|e| e.to_string())?;
    println!("{}", json);

    Ok(())
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

/// Feed every fix of the file through a tracking session
fn run_session(csv_path: &str, conf: &Configs) -> Result<SessionController, String> {
    let csv = File::open(csv_path)
        .map_err(|e| format!("Failed on open the CSV file: {}", e))?;
    let rdr = ReaderBuilder::new().flexible(true).from_reader(csv);

    let mut source = CsvFixSource::new(rdr, Some(conf.fields.clone()));
    let mut ctl = SessionController::new(conf.capture.sanitized());

    ctl.start(&mut source)?;
    while ctl.pump(Duration::from_millis(250)) {}
    ctl.tick();
    ctl.stop();

    Ok(ctl)
}

/// Load the current config
fn load_configs(provided: Option<String>) -> Configs {
    let mut options = vec![];

    if let Some(sprovided) = provided {
        options.push(sprovided);
    }

    options.push(".fieldtrack.yaml".to_string());

    if let Some(home) = dirs::home_dir() {
        if let Some(shome) = home.to_str() {
            options.push(format!("{}/.fieldtrack.yaml", shome));
        }
    }

    let mut yaml: Option<String> = None;
    for fi in options {
        if let Ok(s) = fs::read_to_string(fi) {
            yaml = Some(s);
            break;
        }
    }

    if let Some(s) = yaml {
        match serde_yaml::from_str::<Configs>(&s) {
            Ok(conf) => return conf,
            Err(e) => log::warn!("Invalid configuration, using defaults: {}", e),
        }
    }

    Configs::default()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ExportFormat {
    GeoJson,
    Csv,
    Gpx,
}

impl ExportFormat {
    fn extension(&self) -> &'static str {
        match self {
            ExportFormat::GeoJson => "geojson",
            ExportFormat::Csv => "csv",
            ExportFormat::Gpx => "gpx",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
struct ExportOptions {
    pub formats: Vec<ExportFormat>,
    /// GPX track name, the capture label when unset
    pub name: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            formats: vec![ExportFormat::GeoJson],
            name: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
struct Configs {
    pub capture: CaptureConfig,
    pub export: ExportOptions,
    pub fields: FixFields,
}

impl Configs {
    fn track_name(&self) -> String {
        match &self.export.name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => self.capture.sanitized().label,
        }
    }
}

#[test]
fn parse_configs() -> Result<(), String> {
    let yaml = "\ncapture:\nexport:\nfields:";

    let conf: Configs = serde_yaml::from_str(&yaml).map_err(|e| e.to_string())?;

    assert_eq!(Configs::default(), conf);

    let yaml = "\ncapture:\n  label: fence\n  mode: time\n  threshold: 3\nexport:\n  formats: [geojson, gpx]\nfields:\n  time: timestamp";

    let conf: Configs = serde_yaml::from_str(&yaml).map_err(|e| e.to_string())?;

    let mut capture = CaptureConfig::new();
    capture
        .label("fence")
        .mode(fieldtrack::CaptureMode::Time, 3.0);

    assert_eq!(
        Configs {
            capture,
            export: ExportOptions {
                formats: vec![ExportFormat::GeoJson, ExportFormat::Gpx],
                name: None,
            },
            fields: FixFields {
                time: "timestamp".to_string(),
                ..FixFields::default()
            },
        },
        conf
    );

    Ok(())
}

#[test]
fn gpx_track_name() -> Result<(), String> {
    let conf: Configs = serde_yaml::from_str("capture:\n  label: fence").map_err(|e| e.to_string())?;
    assert_eq!("fence", conf.track_name());

    let conf: Configs = serde_yaml::from_str("export:\n  name: north field").map_err(|e| e.to_string())?;
    assert_eq!("north field", conf.track_name());

    assert_eq!("Label", Configs::default().track_name());

    Ok(())
}
