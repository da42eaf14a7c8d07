//! Synthetic stacks shared by the unit tests

use crate::types::{
    Acquisition, BackscatterUnits, Band, FlightDirection, ImsRaster, Platform, RasterTimeSeries, SnowImage,
    SnowRaster, IMS_SNOW,
};
use chrono::{DateTime, Duration, TimeZone, Utc};

pub(crate) fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
}

/// Acquisitions at `(day offset from 2020-01-01, relative orbit)`
pub(crate) fn acquisitions(steps: &[(i64, u16)]) -> Vec<Acquisition> {
    acquisitions_from(start(), steps)
}

pub(crate) fn acquisitions_from(origin: DateTime<Utc>, steps: &[(i64, u16)]) -> Vec<Acquisition> {
    steps
        .iter()
        .map(|&(day, orbit)| {
            Acquisition::new(origin + Duration::days(day), orbit, Platform::S1A, FlightDirection::Ascending)
        })
        .collect()
}

/// Single-pixel snow-covered stack with the given VV/VH series
pub(crate) fn series_from_values(steps: &[(i64, u16)], vv: &[f32], vh: &[f32], fcf: f32) -> RasterTimeSeries {
    let n = steps.len();
    RasterTimeSeries::new(acquisitions(steps), (1, 1), BackscatterUnits::Decibel)
        .unwrap()
        .with_band(Band::VV, SnowRaster::from_shape_vec((n, 1, 1), vv.to_vec()).unwrap())
        .unwrap()
        .with_band(Band::VH, SnowRaster::from_shape_vec((n, 1, 1), vh.to_vec()).unwrap())
        .unwrap()
        .with_fcf(SnowImage::from_elem((1, 1), fcf))
        .unwrap()
        .with_ims(ImsRaster::from_elem((n, 1, 1), IMS_SNOW))
        .unwrap()
}

pub(crate) fn series_without_fcf(steps: &[(i64, u16)]) -> RasterTimeSeries {
    let n = steps.len();
    RasterTimeSeries::new(acquisitions(steps), (1, 1), BackscatterUnits::Decibel)
        .unwrap()
        .with_band(Band::VV, SnowRaster::from_elem((n, 1, 1), -10.0))
        .unwrap()
        .with_band(Band::VH, SnowRaster::from_elem((n, 1, 1), -16.0))
        .unwrap()
}
