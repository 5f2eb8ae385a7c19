//! GPS track accumulation

pub mod accumulator;
pub mod config;
pub mod fix;
pub mod geodesic;
pub mod sampling;
pub mod session;
