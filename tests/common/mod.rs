#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use ndarray::{Array2, Array3};
use sarsnow::types::{
    Acquisition, BackscatterUnits, Band, FlightDirection, Platform, RasterTimeSeries, IMS_SNOW,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 17, 8, 15).unwrap()
}

/// Acquisitions at `(day offset from origin, relative orbit)`
pub fn acquisitions(origin: DateTime<Utc>, steps: &[(i64, u16)]) -> Vec<Acquisition> {
    steps
        .iter()
        .map(|&(day, orbit)| {
            Acquisition::new(origin + Duration::days(day), orbit, Platform::S1A, FlightDirection::Ascending)
        })
        .collect()
}

/// Evenly spaced passes of one relative orbit
pub fn single_orbit(n: usize, spacing_days: i64, orbit: u16) -> Vec<(i64, u16)> {
    (0..n as i64).map(|i| (i * spacing_days, orbit)).collect()
}

/// One-pixel stack in dB with the given per-pass values
pub fn pixel_series(
    origin: DateTime<Utc>,
    steps: &[(i64, u16)],
    vv: &[f32],
    vh: &[f32],
    fcf: f32,
    ims: &[u8],
) -> RasterTimeSeries {
    let n = steps.len();
    RasterTimeSeries::new(acquisitions(origin, steps), (1, 1), BackscatterUnits::Decibel)
        .expect("Failed to create stack")
        .with_band(Band::VV, Array3::from_shape_vec((n, 1, 1), vv.to_vec()).unwrap())
        .expect("Failed to attach VV")
        .with_band(Band::VH, Array3::from_shape_vec((n, 1, 1), vh.to_vec()).unwrap())
        .expect("Failed to attach VH")
        .with_fcf(Array2::from_elem((1, 1), fcf))
        .expect("Failed to attach fcf")
        .with_ims(Array3::from_shape_vec((n, 1, 1), ims.to_vec()).unwrap())
        .expect("Failed to attach ims")
}

/// Snow-covered stack whose pixels share the same VV and VH series
pub fn uniform_series(
    origin: DateTime<Utc>,
    steps: &[(i64, u16)],
    grid: (usize, usize),
    vv: &[f32],
    vh: &[f32],
    fcf: f32,
) -> RasterTimeSeries {
    let n = steps.len();
    let (rows, cols) = grid;
    RasterTimeSeries::new(acquisitions(origin, steps), grid, BackscatterUnits::Decibel)
        .expect("Failed to create stack")
        .with_band(Band::VV, Array3::from_shape_fn((n, rows, cols), |(t, _, _)| vv[t]))
        .expect("Failed to attach VV")
        .with_band(Band::VH, Array3::from_shape_fn((n, rows, cols), |(t, _, _)| vh[t]))
        .expect("Failed to attach VH")
        .with_fcf(Array2::from_elem(grid, fcf))
        .expect("Failed to attach fcf")
        .with_ims(Array3::from_elem((n, rows, cols), IMS_SNOW))
        .expect("Failed to attach ims")
}

/// Time series of one pixel
pub fn pixel(data: &Array3<f32>, row: usize, col: usize) -> Vec<f32> {
    data.slice(ndarray::s![.., row, col]).to_vec()
}

/// Element-wise comparison that treats two missing values as equal
pub fn assert_values_eq(actual: &[f32], expected: &[f32]) {
    assert_eq!(actual.len(), expected.len(), "length mismatch: {:?} vs {:?}", actual, expected);
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        if e.is_nan() {
            assert!(a.is_nan(), "index {}: expected missing, got {} ({:?})", i, a, actual);
        } else {
            assert!((a - e).abs() < 1e-5, "index {}: expected {}, got {} ({:?})", i, e, a, actual);
        }
    }
}
