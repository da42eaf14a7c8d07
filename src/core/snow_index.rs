use crate::core::repeat_interval::RepeatInterval;
use crate::types::{
    Annotation, Band, ImsRaster, RasterTimeSeries, SnowImage, SnowRaster, SnowResult, Variable, IMS_SNOW, MISSING,
};
use chrono::{DateTime, Duration, Utc};
use ndarray::{Axis, Zip};

/// Snow index to depth conversion parameters
#[derive(Debug, Clone)]
pub struct SnowIndexParams {
    /// Meters of snow depth per unit of snow index
    pub c: f32,
}

impl Default for SnowIndexParams {
    fn default() -> Self {
        Self { c: 0.44 }
    }
}

/// Accumulated snow index and the derived snow depth
#[derive(Debug, Clone)]
pub struct SnowIndex {
    pub snow_index: SnowRaster,
    pub snow_depth: SnowRaster,
}

impl Annotation for SnowIndex {
    fn into_variables(self) -> Vec<(Variable, SnowRaster)> {
        vec![
            (Variable::SnowIndex, self.snow_index),
            (Variable::SnowDepth, self.snow_depth),
        ]
    }
}

/// Recursive snow index integrator.
///
/// Walks the whole time axis (all orbits together) in ascending order. At each
/// step the prior snow index is the triangular-weighted mean of the already
/// computed values within `R - 1` days of `t - R`, and the current deltaGamma
/// is added on top of it.
pub struct SnowIndexIntegrator {
    params: SnowIndexParams,
}

impl SnowIndexIntegrator {
    pub fn new(params: SnowIndexParams) -> Self {
        Self { params }
    }

    pub fn standard() -> Self {
        Self::new(SnowIndexParams::default())
    }

    pub fn compute(&self, series: &RasterTimeSeries, repeat: RepeatInterval) -> SnowResult<SnowIndex> {
        let delta_gamma = series.variable(Variable::DeltaGamma)?;
        let vv = series.band(Band::VV)?;
        let ims = series.ims()?;

        log::info!(
            "Calculating snow index over {} time steps with {} day repeat",
            series.n_times(),
            repeat.days()
        );

        let snow_index = integrate_snow_index(&series.times(), delta_gamma, vv, ims, repeat);
        let snow_depth = snow_index_to_depth(&snow_index, self.params.c);

        let valid = snow_index.iter().filter(|v| !v.is_nan()).count();
        log::info!("Snow index completed: {} of {} values valid", valid, snow_index.len());

        Ok(SnowIndex {
            snow_index,
            snow_depth,
        })
    }
}

/// Prior samples feeding the snow index at `times[current]`, as `(time index, weight)`.
///
/// The window is `[t - R - (R - 1) days, t - R + (R - 1) days]` and the weight
/// of a sample is `R - |days from t - R|`, with the signed day count floored,
/// so it never drops below 1. Only indices before `current` are ever returned.
pub fn prior_window(times: &[DateTime<Utc>], current: usize, repeat: RepeatInterval) -> Vec<(usize, f32)> {
    let now = times[current];
    let t_prev = now - repeat.duration();
    let half_width = repeat.duration() - Duration::days(1);
    let (oldest, youngest) = (t_prev - half_width, t_prev + half_width);

    times[..current]
        .iter()
        .enumerate()
        .filter(|(_, &t)| t >= oldest && t <= youngest && t < now)
        .map(|(k, &t)| {
            let offset = whole_days_floor(t - t_prev).abs();
            (k, (repeat.days() - offset) as f32)
        })
        .collect()
}

/// Whole days in a signed time difference, rounded towards negative infinity
fn whole_days_floor(delta: Duration) -> i64 {
    delta.num_seconds().div_euclid(86_400)
}

/// Weighted mean of prior snow index slices.
///
/// Missing values drop out of both the sum and the total weight. Pixels with
/// no valid prior sample get 0.
pub fn weighted_prior(snow_index: &SnowRaster, window: &[(usize, f32)]) -> SnowImage {
    let (_, rows, cols) = snow_index.dim();
    let mut numerator = SnowImage::zeros((rows, cols));
    let mut denominator = SnowImage::zeros((rows, cols));

    for &(k, weight) in window {
        Zip::from(&mut numerator)
            .and(&mut denominator)
            .and(snow_index.index_axis(Axis(0), k))
            .for_each(|num, den, &si| {
                if !si.is_nan() {
                    *num += weight * si;
                    *den += weight;
                }
            });
    }

    Zip::from(&numerator)
        .and(&denominator)
        .map_collect(|&num, &den| if den > 0.0 { num / den } else { 0.0 })
}

/// Run the recursion over the full stack.
///
/// Per pixel and time step:
/// - VV missing: snow index missing
/// - not snow covered (`ims != 4`): 0
/// - otherwise: prior + deltaGamma (missing if deltaGamma is missing)
pub fn integrate_snow_index(
    times: &[DateTime<Utc>],
    delta_gamma: &SnowRaster,
    vv: &SnowRaster,
    ims: &ImsRaster,
    repeat: RepeatInterval,
) -> SnowRaster {
    let mut snow_index = SnowRaster::from_elem(delta_gamma.raw_dim(), MISSING);

    for current in 0..times.len() {
        let window = prior_window(times, current, repeat);
        log::debug!("{}: {} prior samples", times[current].format("%Y-%m-%d"), window.len());

        let prev_si = weighted_prior(&snow_index, &window);

        let zip = Zip::from(snow_index.index_axis_mut(Axis(0), current))
            .and(&prev_si)
            .and(delta_gamma.index_axis(Axis(0), current))
            .and(vv.index_axis(Axis(0), current))
            .and(ims.index_axis(Axis(0), current));
        let kernel = |si: &mut f32, &prev: &f32, &dg: &f32, &vv: &f32, &class: &u8| {
            *si = if vv.is_nan() {
                MISSING
            } else if class != IMS_SNOW {
                0.0
            } else {
                prev + dg
            };
        };

        #[cfg(feature = "parallel")]
        zip.par_for_each(kernel);
        #[cfg(not(feature = "parallel"))]
        zip.for_each(kernel);
    }

    snow_index
}

/// Linear snow index to snow depth conversion
pub fn snow_index_to_depth(snow_index: &SnowRaster, c: f32) -> SnowRaster {
    snow_index.mapv(|si| si * c)
}
