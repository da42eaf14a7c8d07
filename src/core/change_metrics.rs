use crate::types::{
    Annotation, Band, RasterTimeSeries, SnowError, SnowImage, SnowRaster, SnowResult, Variable, MISSING,
};
use ndarray::{Axis, Zip};

/// Parameters of the backscatter change metrics
#[derive(Debug, Clone)]
pub struct ChangeMetricParams {
    /// Weight of VH in the cross-ratio `A * VH - VV`
    pub a: f32,
    /// Weight of deltaVV in the forested share of a pixel
    pub b: f32,
    /// Symmetric clip bound for deltaGamma in dB
    pub clip: f32,
}

impl Default for ChangeMetricParams {
    fn default() -> Self {
        Self {
            a: 2.0,    // Lievens et al. fit
            b: 0.5,
            clip: 3.0, // dB
        }
    }
}

/// Per-orbit backscatter changes between consecutive passes
#[derive(Debug, Clone)]
pub struct ChangeMetrics {
    pub delta_vv: SnowRaster,
    pub delta_cr: SnowRaster,
    pub delta_gamma: SnowRaster,
}

impl Annotation for ChangeMetrics {
    fn into_variables(self) -> Vec<(Variable, SnowRaster)> {
        vec![
            (Variable::DeltaVV, self.delta_vv),
            (Variable::DeltaCR, self.delta_cr),
            (Variable::DeltaGamma, self.delta_gamma),
        ]
    }
}

/// Computes deltaVV, deltaCR and deltaGamma from a decibel stack
pub struct ChangeMetricCalculator {
    params: ChangeMetricParams,
}

impl ChangeMetricCalculator {
    pub fn new(params: ChangeMetricParams) -> Self {
        Self { params }
    }

    /// Create calculator with published default parameters
    pub fn standard() -> Self {
        Self::new(ChangeMetricParams::default())
    }

    pub fn params(&self) -> &ChangeMetricParams {
        &self.params
    }

    /// Compute all three change metrics.
    ///
    /// Images are only ever differenced against the previous image of the same
    /// relative orbit. The first image of each orbit has no predecessor and
    /// yields missing values.
    pub fn compute(&self, series: &RasterTimeSeries) -> SnowResult<ChangeMetrics> {
        series.require_decibels()?;
        let vv = series.band(Band::VV)?;
        let vh = series.band(Band::VH)?;
        let fcf = series.fcf()?;

        log::info!(
            "Calculating change metrics for {} acquisitions over {} relative orbits",
            series.n_times(),
            series.orbits().len()
        );
        log::debug!("Change metric parameters: {:?}", self.params);

        let delta_vv = orbit_difference(series, vv);

        let gamma_cr = cross_ratio(vv, vh, self.params.a);
        let delta_cr = orbit_difference(series, &gamma_cr);

        let mut delta_gamma = combine_delta_gamma(&delta_cr, &delta_vv, fcf, self.params.b)?;
        clip_delta_gamma(&mut delta_gamma, self.params.clip);

        let valid = delta_gamma.iter().filter(|v| !v.is_nan()).count();
        log::info!(
            "Change metrics completed: {} of {} deltaGamma values valid",
            valid,
            delta_gamma.len()
        );

        Ok(ChangeMetrics {
            delta_vv,
            delta_cr,
            delta_gamma,
        })
    }
}

/// Difference each image against the previous image of its relative orbit
pub fn orbit_difference(series: &RasterTimeSeries, data: &SnowRaster) -> SnowRaster {
    let mut diff = SnowRaster::from_elem(data.raw_dim(), MISSING);

    for orbit in series.orbits() {
        let indices = series.orbit_indices(orbit);
        log::debug!("Orbit {}: {} acquisitions", orbit, indices.len());

        for pair in indices.windows(2) {
            let (prev, current) = (pair[0], pair[1]);
            let step = &data.index_axis(Axis(0), current) - &data.index_axis(Axis(0), prev);
            diff.index_axis_mut(Axis(0), current).assign(&step);
        }
    }

    diff
}

/// Cross-polarization ratio `A * VH - VV` in dB
pub fn cross_ratio(vv: &SnowRaster, vh: &SnowRaster, a: f32) -> SnowRaster {
    Zip::from(vh).and(vv).map_collect(|&vh, &vv| a * vh - vv)
}

/// Blend deltaCR and deltaVV by the forest cover fraction of each pixel
///
/// `deltaGamma = (1 - fcf) * deltaCR + fcf * B * deltaVV`
pub fn combine_delta_gamma(
    delta_cr: &SnowRaster,
    delta_vv: &SnowRaster,
    fcf: &SnowImage,
    b: f32,
) -> SnowResult<SnowRaster> {
    let fcf = fcf.broadcast(delta_cr.raw_dim()).ok_or_else(|| SnowError::Shape {
        name: "fcf".to_string(),
        expected: delta_cr.shape()[1..].to_vec(),
        found: fcf.shape().to_vec(),
    })?;

    let zip = Zip::from(delta_cr).and(delta_vv).and(&fcf);
    let kernel = |&cr: &f32, &vv: &f32, &f: &f32| (1.0 - f) * cr + f * b * vv;

    #[cfg(feature = "parallel")]
    let delta_gamma = zip.par_map_collect(kernel);
    #[cfg(not(feature = "parallel"))]
    let delta_gamma = zip.map_collect(kernel);

    Ok(delta_gamma)
}

/// Clamp deltaGamma to `[-thresh, thresh]`, leaving missing values untouched
pub fn clip_delta_gamma(delta_gamma: &mut SnowRaster, thresh: f32) {
    let mut clipped = 0usize;
    delta_gamma.mapv_inplace(|v| {
        if v.is_nan() {
            v
        } else {
            if v.abs() > thresh {
                clipped += 1;
            }
            v.clamp(-thresh, thresh)
        }
    });
    log::debug!("Clipped {} deltaGamma values to +/- {} dB", clipped, thresh);
}
