//! End-to-end snow depth and wet snow retrieval on a preprocessed stack

use crate::core::{find_repeat_interval, ChangeMetricCalculator, SnowIndexIntegrator, WetSnowClassifier};
use crate::io::{RetrievalParams, RunMetadata};
use crate::types::{RasterTimeSeries, SnowResult};

/// Retrieve snow depth and wet snow for every acquisition of the stack.
///
/// Components run strictly in order: change metrics, repeat interval, snow
/// index, wet snow flags, wet snow state. Each one completes before the next
/// starts and only adds its own variables. The returned stack carries the run
/// metadata.
pub fn retrieve(series: RasterTimeSeries, params: &RetrievalParams) -> SnowResult<RasterTimeSeries> {
    params.validate()?;
    params.warn_suspicious();
    series.require_decibels()?;

    log::info!(
        "Retrieving snow depth for {} acquisitions on a {}x{} grid",
        series.n_times(),
        series.grid_shape().0,
        series.grid_shape().1
    );

    let metrics = ChangeMetricCalculator::new(params.change_metric_params()).compute(&series)?;
    let series = series.annotate(metrics)?;

    let repeat = find_repeat_interval(&series)?;

    let snow_index = SnowIndexIntegrator::new(params.snow_index_params()).compute(&series, repeat)?;
    let series = series.annotate(snow_index)?;

    let classifier = WetSnowClassifier::new(params.wet_snow_params());
    let flags = classifier.flags(&series)?;
    let series = series.annotate(flags)?;

    let wet_snow = classifier.classify(&series)?;
    let series = series.annotate(wet_snow)?;

    let metadata = RunMetadata::new(params.clone(), repeat.days(), series.n_times(), series.orbits());
    log::info!("Retrieval completed");
    Ok(series.with_metadata(metadata))
}

/// Re-run the retrieval with another parameter set, discarding any derived variables
pub fn retrieval_from_parameters(series: &RasterTimeSeries, params: &RetrievalParams) -> SnowResult<RasterTimeSeries> {
    retrieve(series.without_derived(), params)
}

/// Run one independent retrieval per parameter set
pub fn parameter_sweep(series: &RasterTimeSeries, params: &[RetrievalParams]) -> Vec<SnowResult<RasterTimeSeries>> {
    log::info!("Running parameter sweep over {} parameter sets", params.len());

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        params
            .par_iter()
            .map(|p| retrieval_from_parameters(series, p))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        params
            .iter()
            .map(|p| retrieval_from_parameters(series, p))
            .collect()
    }
}
