//! Capture settings read on every fix

use std::fmt;
use std::str::FromStr;

use log::warn;
use serde::{Deserialize, Deserializer};

pub const DEFAULT_LABEL: &str = "Label";
/// Threshold used by the fallback distance policy, in meters
pub const DEFAULT_THRESHOLD: f64 = 10.0;

/// Sampling rule applied between two accepted fixes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum CaptureMode {
    /// Threshold in meters
    #[default]
    Distance,
    /// Threshold in seconds
    Time,
}

impl FromStr for CaptureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "distance" => Ok(CaptureMode::Distance),
            "time" => Ok(CaptureMode::Time),
            other => Err(format!("Unknown capture mode `{}`", other)),
        }
    }
}

impl From<String> for CaptureMode {
    fn from(s: String) -> Self {
        s.parse().unwrap_or_else(|e| {
            warn!("{}, using distance", e);
            CaptureMode::Distance
        })
    }
}

impl fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureMode::Distance => write!(f, "distance"),
            CaptureMode::Time => write!(f, "time"),
        }
    }
}

/// What to capture and how often
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub label: String,
    pub mode: CaptureMode,
    #[serde(deserialize_with = "lenient_threshold")]
    pub threshold: f64,
    pub capture_points: bool,
    pub capture_line: bool,
    pub capture_polygon: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            label: DEFAULT_LABEL.to_string(),
            mode: CaptureMode::Distance,
            threshold: DEFAULT_THRESHOLD,
            capture_points: true,
            capture_line: true,
            capture_polygon: true,
        }
    }
}

impl CaptureConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw form inputs, substituting defaults for anything unusable
    pub fn from_inputs(label: &str, mode: &str, threshold: &str) -> Self {
        let threshold = threshold.trim().parse::<f64>().unwrap_or(f64::NAN);

        Self {
            label: label.to_string(),
            mode: CaptureMode::from(mode.to_string()),
            threshold,
            ..Self::default()
        }
        .sanitized()
    }

    pub fn label(&mut self, label: &str) -> &mut Self {
        self.label = label.to_string();

        self
    }

    pub fn mode(&mut self, mode: CaptureMode, threshold: f64) -> &mut Self {
        self.mode = mode;
        self.threshold = threshold;

        self
    }

    pub fn geometries(&mut self, points: bool, line: bool, polygon: bool) -> &mut Self {
        self.capture_points = points;
        self.capture_line = line;
        self.capture_polygon = polygon;

        self
    }

    /// Copy with unusable values replaced.
    ///
    /// A threshold that is not a finite, non-negative number falls back to
    /// the distance policy with its default threshold.
    pub fn sanitized(&self) -> Self {
        let mut conf = self.clone();

        if !conf.threshold.is_finite() || conf.threshold < 0.0 {
            warn!(
                "Invalid capture threshold {}, using {} mode with {}m",
                conf.threshold,
                CaptureMode::Distance,
                DEFAULT_THRESHOLD
            );
            conf.mode = CaptureMode::Distance;
            conf.threshold = DEFAULT_THRESHOLD;
        }

        if conf.label.trim().is_empty() {
            conf.label = DEFAULT_LABEL.to_string();
        }

        conf
    }
}

/// Source of the capture settings, queried on every fix
pub trait SettingsProvider {
    fn current(&self) -> CaptureConfig;
}

impl SettingsProvider for CaptureConfig {
    fn current(&self) -> CaptureConfig {
        self.clone()
    }
}

impl<F> SettingsProvider for F
where
    F: Fn() -> CaptureConfig,
{
    fn current(&self) -> CaptureConfig {
        self()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawThreshold {
    Number(f64),
    Text(String),
}

fn lenient_threshold<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawThreshold::deserialize(deserializer)? {
        RawThreshold::Number(n) => n,
        RawThreshold::Text(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
    })
}
