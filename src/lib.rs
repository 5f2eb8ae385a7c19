//! fieldtrack - GPS track accumulation for field data collection

pub mod export;
pub mod sources;
mod tracking;

pub use export::geojson::{
    export_file_name, Feature, FeatureCollection, Geometry, GeometryKind,
};
pub use export::gpx::GpxGenerator;
pub use sources::{FixEvent, FixFeed, FixSource, PushSource, Subscription};
pub use tracking::accumulator::{Segment, Session, SessionAggregates};
pub use tracking::config::{CaptureConfig, CaptureMode, SettingsProvider};
pub use tracking::fix::{Fix, LatLon, TrackPoint};
pub use tracking::geodesic::{distance, path_length, polygon_area};
pub use tracking::sampling::should_accept;
pub use tracking::session::{
    Clock, LogNotifier, LogStatsSink, Notifier, SessionController, StatsSink, SystemClock,
    TICK_PERIOD,
};
