use crate::types::{
    Annotation, Band, ImsRaster, RasterTimeSeries, SnowError, SnowRaster, SnowResult, Variable, IMS_SNOW, MISSING,
};
use chrono::{DateTime, Datelike, Utc};
use ndarray::{Array3, ArrayView1, ArrayViewMut1, Axis, Zip};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

/// Forest cover fraction from which deltaVV replaces deltaCR as wetting evidence
pub const FOREST_FCF_THRESH: f32 = 0.5;

/// Months (1 = January) in which the perma-wet rule applies
pub const MELT_SEASON_MONTHS: RangeInclusive<u32> = 2..=7;

/// Trailing number of passes averaged by the perma-wet rule
pub const PERMA_WET_WINDOW: usize = 4;

/// Perma-wet fraction that locks a pixel wet for the rest of the melt season
pub const PERMA_WET_THRESH: f32 = 0.5;

/// Wet snow thresholds
#[derive(Debug, Clone)]
pub struct WetSnowParams {
    /// Drop in dB of deltaCR (open) or deltaVV (forest) signalling melt
    pub wet_thresh: f32,
    /// Rise in dB of deltaGamma signalling refreeze
    pub freeze_thresh: f32,
    /// Snow index at or below which snow-covered pixels count as wet
    pub wet_si_thresh: f32,
}

impl Default for WetSnowParams {
    fn default() -> Self {
        Self {
            wet_thresh: -2.0,
            freeze_thresh: 2.0,
            wet_si_thresh: 0.0,
        }
    }
}

/// Instantaneous wetting and refreeze evidence (0, 1 or missing)
#[derive(Debug, Clone)]
pub struct WetSnowFlags {
    pub wet_flag: SnowRaster,
    pub alt_wet_flag: SnowRaster,
    pub freeze_flag: SnowRaster,
}

impl Annotation for WetSnowFlags {
    fn into_variables(self) -> Vec<(Variable, SnowRaster)> {
        vec![
            (Variable::WetFlag, self.wet_flag),
            (Variable::AltWetFlag, self.alt_wet_flag),
            (Variable::FreezeFlag, self.freeze_flag),
        ]
    }
}

/// Accumulated wet snow state and the seasonal perma-wet fraction
#[derive(Debug, Clone)]
pub struct WetSnow {
    pub wet_snow: SnowRaster,
    pub perma_wet: SnowRaster,
}

impl Annotation for WetSnow {
    fn into_variables(self) -> Vec<(Variable, SnowRaster)> {
        vec![
            (Variable::WetSnow, self.wet_snow),
            (Variable::PermaWet, self.perma_wet),
        ]
    }
}

/// Snowpack state tracked per pixel and relative orbit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WetState {
    Dry,
    Wet,
}

impl WetState {
    /// `clamp(state + wet + alt_wet - freeze, 0, 1)`; missing flags count as 0
    pub fn transition(self, wet: f32, alt_wet: f32, freeze: f32) -> WetState {
        let level = self.level() + flag_level(wet) + flag_level(alt_wet) - flag_level(freeze);
        if level >= 1 {
            WetState::Wet
        } else {
            WetState::Dry
        }
    }

    fn level(self) -> i8 {
        match self {
            WetState::Dry => 0,
            WetState::Wet => 1,
        }
    }

    pub fn value(self) -> f32 {
        self.level() as f32
    }
}

fn flag_level(flag: f32) -> i8 {
    if flag > 0.5 {
        1
    } else {
        0
    }
}

/// Observation status of one pixel at one time step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PixelStatus {
    /// VV not observed
    Missing,
    /// Observed, but IMS does not report snow-covered land
    SnowFree,
    Snow,
}

/// Wet snow classification
pub struct WetSnowClassifier {
    params: WetSnowParams,
}

impl WetSnowClassifier {
    pub fn new(params: WetSnowParams) -> Self {
        Self { params }
    }

    pub fn standard() -> Self {
        Self::new(WetSnowParams::default())
    }

    /// Compute wet_flag, alt_wet_flag and freeze_flag.
    ///
    /// All flags are missing wherever VV is missing. Missing change metrics
    /// or snow index otherwise count as no evidence.
    pub fn flags(&self, series: &RasterTimeSeries) -> SnowResult<WetSnowFlags> {
        let vv = series.band(Band::VV)?;
        let fcf = series.fcf()?;
        let ims = series.ims()?;
        let delta_vv = series.variable(Variable::DeltaVV)?;
        let delta_cr = series.variable(Variable::DeltaCR)?;
        let delta_gamma = series.variable(Variable::DeltaGamma)?;
        let snow_index = series.variable(Variable::SnowIndex)?;

        log::info!("Identifying wet and refrozen snow");
        log::debug!("Wet snow parameters: {:?}", self.params);

        let fcf = fcf
            .broadcast(vv.raw_dim())
            .ok_or_else(|| SnowError::Shape {
                name: "fcf".to_string(),
                expected: vv.shape()[1..].to_vec(),
                found: fcf.shape().to_vec(),
            })?;

        let wet_thresh = self.params.wet_thresh;
        let wet_flag = Zip::from(delta_cr)
            .and(delta_vv)
            .and(&fcf)
            .and(vv)
            .map_collect(|&dcr, &dvv, &f, &vv| {
                if vv.is_nan() {
                    MISSING
                } else if f.is_nan() {
                    0.0
                } else if f < FOREST_FCF_THRESH {
                    indicator(dcr < wet_thresh)
                } else {
                    indicator(dvv < wet_thresh)
                }
            });

        let freeze_thresh = self.params.freeze_thresh;
        let freeze_flag = Zip::from(delta_gamma).and(vv).map_collect(|&dg, &vv| {
            if vv.is_nan() {
                MISSING
            } else {
                indicator(dg >= freeze_thresh)
            }
        });

        let wet_si_thresh = self.params.wet_si_thresh;
        let alt_wet_flag = Zip::from(snow_index).and(ims).and(vv).map_collect(|&si, &class, &vv| {
            if vv.is_nan() {
                MISSING
            } else {
                indicator(class == IMS_SNOW && si <= wet_si_thresh)
            }
        });

        log::info!(
            "Flagged {} newly wet, {} negative snow index and {} refrozen pixel-times",
            count_set(&wet_flag),
            count_set(&alt_wet_flag),
            count_set(&freeze_flag)
        );

        Ok(WetSnowFlags {
            wet_flag,
            alt_wet_flag,
            freeze_flag,
        })
    }

    /// Run the per-orbit wet snow state machine and the melt-season override.
    ///
    /// Requires wet_flag, alt_wet_flag and freeze_flag on the stack; they are
    /// never defaulted.
    pub fn classify(&self, series: &RasterTimeSeries) -> SnowResult<WetSnow> {
        let wet_flag = series.variable(Variable::WetFlag)?;
        let alt_wet_flag = series.variable(Variable::AltWetFlag)?;
        let freeze_flag = series.variable(Variable::FreezeFlag)?;
        let vv = series.band(Band::VV)?;
        let ims = series.ims()?;

        let times = series.times();
        let orbit_groups: Vec<Vec<usize>> = series
            .orbits()
            .into_iter()
            .map(|orbit| series.orbit_indices(orbit))
            .collect();
        let season_groups: Vec<Vec<usize>> = orbit_groups
            .iter()
            .flat_map(|indices| melt_seasons(&times, indices))
            .collect();

        log::info!(
            "Flagging wet snow over {} relative orbits ({} orbit melt seasons)",
            orbit_groups.len(),
            season_groups.len()
        );

        let status = pixel_status(vv, ims);
        let mut wet_snow = SnowRaster::from_elem(vv.raw_dim(), MISSING);
        let mut perma_wet = SnowRaster::from_elem(vv.raw_dim(), MISSING);

        let zip = Zip::from(wet_snow.lanes_mut(Axis(0)))
            .and(perma_wet.lanes_mut(Axis(0)))
            .and(wet_flag.lanes(Axis(0)))
            .and(alt_wet_flag.lanes(Axis(0)))
            .and(freeze_flag.lanes(Axis(0)))
            .and(status.lanes(Axis(0)));
        let kernel = |mut wet_out: ArrayViewMut1<f32>,
                      mut perma_out: ArrayViewMut1<f32>,
                      wet: ArrayView1<f32>,
                      alt_wet: ArrayView1<f32>,
                      freeze: ArrayView1<f32>,
                      status: ArrayView1<PixelStatus>| {
            let lane = PixelLane {
                wet: wet.reborrow(),
                alt_wet: alt_wet.reborrow(),
                freeze: freeze.reborrow(),
                status: status.reborrow(),
            };
            lane.propagate_state(&mut wet_out, &orbit_groups);
            lane.perma_wet(&mut perma_out, &season_groups);
            lane.apply_perma_wet(&mut wet_out, &perma_out);
        };

        #[cfg(feature = "parallel")]
        zip.par_for_each(kernel);
        #[cfg(not(feature = "parallel"))]
        zip.for_each(kernel);

        let valid = wet_snow.iter().filter(|v| !v.is_nan()).count();
        let wet = wet_snow.iter().filter(|&&v| v == 1.0).count();
        log::info!(
            "Wet snow completed: {} of {} valid pixel-times wet ({:.2}%)",
            wet,
            valid,
            if valid > 0 { 100.0 * wet as f64 / valid as f64 } else { 0.0 }
        );

        Ok(WetSnow { wet_snow, perma_wet })
    }
}

/// Temporal inputs of one pixel
struct PixelLane<'a> {
    wet: ArrayView1<'a, f32>,
    alt_wet: ArrayView1<'a, f32>,
    freeze: ArrayView1<'a, f32>,
    status: ArrayView1<'a, PixelStatus>,
}

impl PixelLane<'_> {
    /// Sequential Dry/Wet recurrence, restarted from Dry for every orbit.
    ///
    /// A missing observation is reported as missing and the orbit's state is
    /// carried over it unchanged. Snow-free passes force the state to Dry.
    fn propagate_state(&self, out: &mut ArrayViewMut1<f32>, orbit_groups: &[Vec<usize>]) {
        for indices in orbit_groups {
            let mut state = WetState::Dry;
            for &t in indices {
                out[t] = match self.status[t] {
                    PixelStatus::Missing => MISSING,
                    PixelStatus::SnowFree => {
                        state = WetState::Dry;
                        0.0
                    }
                    PixelStatus::Snow => {
                        state = state.transition(self.wet[t], self.alt_wet[t], self.freeze[t]);
                        state.value()
                    }
                };
            }
        }
    }

    /// Running maximum of the trailing mean of `clamp(wet + alt_wet, 0, 1)`
    /// within each orbit's melt season. 0 outside the season and on snow-free
    /// passes, missing where VV is missing.
    fn perma_wet(&self, out: &mut ArrayViewMut1<f32>, season_groups: &[Vec<usize>]) {
        for (t, value) in out.iter_mut().enumerate() {
            *value = match self.status[t] {
                PixelStatus::Missing => MISSING,
                _ => 0.0,
            };
        }

        for season in season_groups {
            let raw: Vec<Option<f32>> = season.iter().map(|&t| self.raw_wet(t)).collect();
            let fractions = running_max(&trailing_mean(&raw, PERMA_WET_WINDOW));

            for (&t, fraction) in season.iter().zip(fractions) {
                out[t] = match (self.status[t], fraction) {
                    (PixelStatus::Snow, Some(fraction)) => fraction,
                    (PixelStatus::SnowFree, _) => 0.0,
                    _ => MISSING,
                };
            }
        }
    }

    fn raw_wet(&self, t: usize) -> Option<f32> {
        let (wet, alt_wet) = (self.wet[t], self.alt_wet[t]);
        if self.status[t] == PixelStatus::Missing || wet.is_nan() || alt_wet.is_nan() {
            None
        } else {
            Some((wet + alt_wet).clamp(0.0, 1.0))
        }
    }

    fn apply_perma_wet(&self, wet_out: &mut ArrayViewMut1<f32>, perma: &ArrayViewMut1<f32>) {
        for (value, &fraction) in wet_out.iter_mut().zip(perma.iter()) {
            if fraction >= PERMA_WET_THRESH {
                *value = 1.0;
            }
        }
    }
}

fn pixel_status(vv: &SnowRaster, ims: &ImsRaster) -> Array3<PixelStatus> {
    Zip::from(vv).and(ims).map_collect(|&vv, &class| {
        if vv.is_nan() {
            PixelStatus::Missing
        } else if class != IMS_SNOW {
            PixelStatus::SnowFree
        } else {
            PixelStatus::Snow
        }
    })
}

/// Split one orbit's time indices into melt seasons (February to July), one per year
pub fn melt_seasons(times: &[DateTime<Utc>], orbit_indices: &[usize]) -> Vec<Vec<usize>> {
    let mut seasons: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for &t in orbit_indices {
        let time = times[t];
        if MELT_SEASON_MONTHS.contains(&time.month()) {
            seasons.entry(time.year()).or_default().push(t);
        }
    }
    seasons.into_values().collect()
}

/// Mean over the last `window` samples, needing at least one valid sample
pub fn trailing_mean(values: &[Option<f32>], window: usize) -> Vec<Option<f32>> {
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let valid: Vec<f32> = values[start..=i].iter().flatten().copied().collect();
            if valid.is_empty() {
                None
            } else {
                Some(valid.iter().sum::<f32>() / valid.len() as f32)
            }
        })
        .collect()
}

/// Forward-expanding maximum that skips missing samples
pub fn running_max(values: &[Option<f32>]) -> Vec<Option<f32>> {
    let mut current: Option<f32> = None;
    values
        .iter()
        .map(|value| {
            if let Some(v) = value {
                current = Some(current.map_or(*v, |c| c.max(*v)));
            }
            current
        })
        .collect()
}

fn indicator(condition: bool) -> f32 {
    if condition {
        1.0
    } else {
        0.0
    }
}

fn count_set(flags: &SnowRaster) -> usize {
    flags.iter().filter(|&&v| v == 1.0).count()
}
