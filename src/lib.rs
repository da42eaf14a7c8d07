//! sarsnow: Sentinel-1 snow depth and wet snow retrieval
//!
//! Implements the Lievens et al. backscatter-change retrieval over a
//! preprocessed, multi-orbit Sentinel-1 time series: per-orbit change metrics,
//! a recursive snow index converted to snow depth, and a per-orbit wet snow
//! state machine with a melt-season override.

pub mod types;
pub mod io;
pub mod core;
pub mod retrieval;

#[cfg(feature = "python")]
mod python;

// Re-export main types and functions for easier access
pub use types::{
    Acquisition, BackscatterUnits, Band, FlightDirection, Platform, RasterTimeSeries, SnowError, SnowResult,
    Variable, IMS_SNOW, MISSING,
};

pub use io::{RetrievalParams, RunMetadata};
pub use retrieval::{parameter_sweep, retrieval_from_parameters, retrieve};
