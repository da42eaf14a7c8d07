mod common;

use common::*;
use sarsnow::types::Variable;
use sarsnow::{retrieve, RasterTimeSeries, RetrievalParams};

const NAN: f32 = f32::NAN;

/// Winter pass sequence: two 2 dB cross-ratio rises, a 3 dB drop, a quiet
/// pass and a 3 dB rise. Rises of 2 dB already reach the refreeze threshold.
fn melt_and_refreeze(vv: &[f32], ims: &[u8]) -> RasterTimeSeries {
    pixel_series(
        date(2020, 1, 1),
        &single_orbit(6, 6, 24),
        vv,
        &[-16.0, -15.0, -14.0, -15.5, -15.5, -14.0],
        0.0,
        ims,
    )
}

/// Falling snow index followed by two refreeze passes
fn negative_index_then_refreeze(start: chrono::DateTime<chrono::Utc>) -> RasterTimeSeries {
    pixel_series(
        start,
        &single_orbit(8, 6, 24),
        &[-10.0; 8],
        &[-16.0, -16.5, -17.0, -17.5, -16.0, -14.5, -14.5, -14.5],
        0.0,
        &[4; 8],
    )
}

#[test]
fn test_melt_then_refreeze() {
    init_logging();

    let series = melt_and_refreeze(&[-10.0; 6], &[4; 6]);
    let result = retrieve(series, &RetrievalParams::default()).expect("Retrieval failed");

    let wet_flag = pixel(result.variable(Variable::WetFlag).unwrap(), 0, 0);
    let alt_wet_flag = pixel(result.variable(Variable::AltWetFlag).unwrap(), 0, 0);
    let freeze_flag = pixel(result.variable(Variable::FreezeFlag).unwrap(), 0, 0);
    let wet_snow = pixel(result.variable(Variable::WetSnow).unwrap(), 0, 0);

    println!("wet_flag:     {:?}", wet_flag);
    println!("alt_wet_flag: {:?}", alt_wet_flag);
    println!("freeze_flag:  {:?}", freeze_flag);
    println!("wet_snow:     {:?}", wet_snow);

    assert_values_eq(&wet_flag, &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
    assert_values_eq(&alt_wet_flag, &[0.0; 6]);
    // refreeze evidence on dry snow leaves it dry
    assert_values_eq(&freeze_flag, &[0.0, 1.0, 1.0, 0.0, 0.0, 1.0]);
    assert_values_eq(&wet_snow, &[0.0, 0.0, 0.0, 1.0, 1.0, 0.0]);

    // January is outside the melt season
    assert_values_eq(&pixel(result.variable(Variable::PermaWet).unwrap(), 0, 0), &[0.0; 6]);
}

#[test]
fn test_snow_free_pass_dries_pixel() {
    init_logging();

    let series = melt_and_refreeze(&[-10.0; 6], &[4, 4, 4, 4, 2, 4]);
    let result = retrieve(series, &RetrievalParams::default()).expect("Retrieval failed");

    assert_values_eq(
        &pixel(result.variable(Variable::WetSnow).unwrap(), 0, 0),
        &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0],
    );
    assert_values_eq(
        &pixel(result.variable(Variable::SnowIndex).unwrap(), 0, 0),
        &[NAN, 2.0, 4.0, 1.0, 0.0, 3.0],
    );
}

#[test]
fn test_missing_pass_carries_state() {
    init_logging();

    let series = melt_and_refreeze(&[-10.0, -10.0, -10.0, -10.0, NAN, -10.0], &[4; 6]);
    let result = retrieve(series, &RetrievalParams::default()).expect("Retrieval failed");

    let wet_snow = pixel(result.variable(Variable::WetSnow).unwrap(), 0, 0);
    println!("wet_snow: {:?}", wet_snow);

    // the refreeze evidence at the last pass is lost with the missing predecessor
    assert_values_eq(&wet_snow, &[0.0, 0.0, 0.0, 1.0, NAN, 1.0]);
    for variable in [Variable::WetFlag, Variable::AltWetFlag, Variable::FreezeFlag, Variable::PermaWet] {
        assert!(pixel(result.variable(variable).unwrap(), 0, 0)[4].is_nan());
    }
}

#[test]
fn test_perma_wet_holds_through_melt_season() {
    init_logging();

    let series = negative_index_then_refreeze(date(2020, 3, 1));
    let result = retrieve(series, &RetrievalParams::default()).expect("Retrieval failed");

    let perma_wet = pixel(result.variable(Variable::PermaWet).unwrap(), 0, 0);
    let wet_snow = pixel(result.variable(Variable::WetSnow).unwrap(), 0, 0);
    println!("perma_wet: {:?}", perma_wet);
    println!("wet_snow:  {:?}", wet_snow);

    assert_values_eq(&perma_wet, &[0.0, 0.5, 2.0 / 3.0, 0.75, 1.0, 1.0, 1.0, 1.0]);
    assert_values_eq(&wet_snow, &[0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0]);

    // running maximum never decreases within the season
    for pair in perma_wet.windows(2) {
        assert!(pair[1] >= pair[0]);
    }
}

#[test]
fn test_refreeze_outside_melt_season() {
    init_logging();

    let series = negative_index_then_refreeze(date(2019, 9, 1));
    let result = retrieve(series, &RetrievalParams::default()).expect("Retrieval failed");

    assert_values_eq(&pixel(result.variable(Variable::PermaWet).unwrap(), 0, 0), &[0.0; 8]);
    assert_values_eq(
        &pixel(result.variable(Variable::WetSnow).unwrap(), 0, 0),
        &[0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0],
    );
}

#[test]
fn test_orbits_keep_separate_state() {
    init_logging();

    // orbit 24 drops 4 dB in cross-ratio at its third pass, orbit 1 is stable
    let steps = [(0, 24), (1, 1), (6, 24), (7, 1), (12, 24), (13, 1)];
    let series = pixel_series(
        date(2020, 1, 1),
        &steps,
        &[-10.0, -20.0, -10.0, -20.0, -10.0, -20.0],
        &[-16.0, -26.0, -16.0, -26.0, -18.0, -26.0],
        0.0,
        &[4; 6],
    );

    let params = RetrievalParams::default().wet_si_thresh(-1.0);
    let result = retrieve(series, &params).expect("Retrieval failed");

    assert_values_eq(
        &pixel(result.variable(Variable::WetSnow).unwrap(), 0, 0),
        &[0.0, 0.0, 0.0, 0.0, 1.0, 0.0],
    );
}
