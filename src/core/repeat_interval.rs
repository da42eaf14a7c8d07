use crate::types::{RasterTimeSeries, SnowError, SnowResult};
use chrono::{DateTime, Duration, Utc};

/// Sentinel-1 constellation revisit cadence in days
pub const BASE_REPEAT_DAYS: i64 = 6;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Revisit interval of a repeat track, always a positive multiple of 6 days
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatInterval {
    days: i64,
}

impl RepeatInterval {
    pub fn from_days(days: i64) -> SnowResult<Self> {
        if days <= 0 || days % BASE_REPEAT_DAYS != 0 {
            return Err(SnowError::RepeatInterval(format!(
                "Calculated repeat interval of {} days is not a multiple of {} days. \
                 Partial images of the same pass were probably not merged.",
                days, BASE_REPEAT_DAYS
            )));
        }
        Ok(Self { days })
    }

    pub fn days(&self) -> i64 {
        self.days
    }

    pub fn duration(&self) -> Duration {
        Duration::days(self.days)
    }
}

/// Detect the revisit interval of a stack from one of its orbits.
///
/// All tracks of the constellation share the same cadence, so one orbit is
/// representative. The first orbit, in acquisition order, with at least two
/// passes is used.
pub fn find_repeat_interval(series: &RasterTimeSeries) -> SnowResult<RepeatInterval> {
    let acquisitions = series.acquisitions();
    let mut candidates: Vec<u16> = Vec::new();
    for acquisition in acquisitions {
        if !candidates.contains(&acquisition.relative_orbit) {
            candidates.push(acquisition.relative_orbit);
        }
    }

    let orbit = candidates
        .iter()
        .copied()
        .find(|&orbit| series.orbit_indices(orbit).len() >= 2)
        .unwrap_or(acquisitions[0].relative_orbit);
    let times: Vec<DateTime<Utc>> = series
        .orbit_indices(orbit)
        .into_iter()
        .map(|i| acquisitions[i].time)
        .collect();

    log::debug!("Detecting repeat interval from relative orbit {} ({} passes)", orbit, times.len());
    let repeat = detect_repeat_interval(&times)?;
    log::info!("Repeat interval: {} days", repeat.days());
    Ok(repeat)
}

/// Median of the day-rounded gaps between consecutive passes, rounded to a day
pub fn detect_repeat_interval(times: &[DateTime<Utc>]) -> SnowResult<RepeatInterval> {
    if times.len() < 2 {
        return Err(SnowError::RepeatInterval(format!(
            "Need at least two passes of one orbit to detect the repeat interval, found {}",
            times.len()
        )));
    }

    let mut gaps: Vec<f64> = times
        .windows(2)
        .map(|pair| ((pair[1] - pair[0]).num_seconds() as f64 / SECONDS_PER_DAY).round())
        .collect();
    gaps.sort_by(|a, b| a.total_cmp(b));

    let mid = gaps.len() / 2;
    let median = if gaps.len() % 2 == 0 {
        (gaps[mid - 1] + gaps[mid]) / 2.0
    } else {
        gaps[mid]
    };

    RepeatInterval::from_days(median.round() as i64)
}
