//! Python module definition

use crate::io::RetrievalParams;
use crate::types::{Acquisition, BackscatterUnits, Band, RasterTimeSeries, SnowError};
use chrono::{TimeZone, Utc};
use numpy::{IntoPyArray, PyReadonlyArray2, PyReadonlyArray3};
use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

impl From<SnowError> for PyErr {
    fn from(err: SnowError) -> PyErr {
        match err {
            SnowError::Io(_) => PyIOError::new_err(err.to_string()),
            _ => PyValueError::new_err(err.to_string()),
        }
    }
}

/// Run the retrieval on (time, y, x) numpy arrays in dB.
///
/// Returns a dict of derived arrays keyed by variable name plus an `attrs`
/// dict with the run metadata.
#[pyfunction]
#[pyo3(signature = (
    vv, vh, fcf, ims, times, orbits, platforms, flight_dirs,
    a = 2.0, b = 0.5, c = 0.44, wet_thresh = -2.0, freeze_thresh = 2.0, wet_si_thresh = 0.0
))]
#[allow(clippy::too_many_arguments)]
fn retrieve<'py>(
    py: Python<'py>,
    vv: PyReadonlyArray3<'py, f32>,
    vh: PyReadonlyArray3<'py, f32>,
    fcf: PyReadonlyArray2<'py, f32>,
    ims: PyReadonlyArray3<'py, u8>,
    times: Vec<i64>,
    orbits: Vec<u16>,
    platforms: Vec<String>,
    flight_dirs: Vec<String>,
    a: f32,
    b: f32,
    c: f32,
    wet_thresh: f32,
    freeze_thresh: f32,
    wet_si_thresh: f32,
) -> PyResult<&'py PyDict> {
    let n = times.len();
    if orbits.len() != n || platforms.len() != n || flight_dirs.len() != n {
        return Err(PyValueError::new_err(
            "times, orbits, platforms and flight_dirs must have the same length",
        ));
    }

    let mut acquisitions = Vec::with_capacity(n);
    for i in 0..n {
        let time = Utc
            .timestamp_opt(times[i], 0)
            .single()
            .ok_or_else(|| PyValueError::new_err(format!("Invalid timestamp: {}", times[i])))?;
        acquisitions.push(Acquisition::new(
            time,
            orbits[i],
            platforms[i].parse()?,
            flight_dirs[i].parse()?,
        ));
    }

    let vv = vv.as_array().to_owned();
    let (_, rows, cols) = vv.dim();
    let series = RasterTimeSeries::new(acquisitions, (rows, cols), BackscatterUnits::Decibel)?
        .with_band(Band::VV, vv)?
        .with_band(Band::VH, vh.as_array().to_owned())?
        .with_fcf(fcf.as_array().to_owned())?
        .with_ims(ims.as_array().to_owned())?;

    let params = RetrievalParams::with_abc(a, b, c)
        .wet_thresh(wet_thresh)
        .freeze_thresh(freeze_thresh)
        .wet_si_thresh(wet_si_thresh);

    let result = py.allow_threads(|| crate::retrieval::retrieve(series, &params))?;

    let output = PyDict::new(py);
    for (variable, data) in result.variables() {
        output.set_item(variable.name(), data.to_owned().into_pyarray(py))?;
    }

    if let Some(metadata) = result.metadata() {
        let attrs = PyDict::new(py);
        for (key, value) in metadata.to_attributes() {
            attrs.set_item(key, value)?;
        }
        output.set_item("attrs", attrs)?;
    }

    Ok(output)
}

#[pymodule]
fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(retrieve, m)?)?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}
