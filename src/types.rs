use chrono::{DateTime, Utc};
use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use crate::io::RunMetadata;

/// Real-valued backscatter or derived value. `NaN` marks a missing observation.
pub type SnowReal = f32;

/// 3D raster time series (time x rows x cols)
pub type SnowRaster = Array3<SnowReal>;

/// 2D static raster (rows x cols)
pub type SnowImage = Array2<SnowReal>;

/// Per-pixel, per-time snow cover class (time x rows x cols)
pub type ImsRaster = Array3<u8>;

/// Value used for a missing observation
pub const MISSING: SnowReal = SnowReal::NAN;

/// IMS class for snow-covered land, the only class eligible for retrieval
pub const IMS_SNOW: u8 = 4;

/// Backscatter bands carried by the input stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Band {
    VV,
    VH,
    Incidence,
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Band::VV => write!(f, "VV"),
            Band::VH => write!(f, "VH"),
            Band::Incidence => write!(f, "incidence"),
        }
    }
}

/// Radiometric units of the VV/VH bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackscatterUnits {
    Decibel,
    Amplitude,
}

impl std::fmt::Display for BackscatterUnits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackscatterUnits::Decibel => write!(f, "dB"),
            BackscatterUnits::Amplitude => write!(f, "amplitude"),
        }
    }
}

/// Sentinel-1 platform that acquired an image
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    S1A,
    S1B,
    S1C,
    Other(String),
}

impl FromStr for Platform {
    type Err = SnowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace(['-', '_'], "");
        Ok(match normalized.as_str() {
            "S1A" | "SENTINEL1A" => Platform::S1A,
            "S1B" | "SENTINEL1B" => Platform::S1B,
            "S1C" | "SENTINEL1C" => Platform::S1C,
            "" => {
                return Err(SnowError::Config("Empty platform name".to_string()));
            }
            _ => Platform::Other(s.trim().to_string()),
        })
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::S1A => write!(f, "S1A"),
            Platform::S1B => write!(f, "S1B"),
            Platform::S1C => write!(f, "S1C"),
            Platform::Other(name) => write!(f, "{}", name),
        }
    }
}

/// Satellite pass direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlightDirection {
    Ascending,
    Descending,
}

impl FromStr for FlightDirection {
    type Err = SnowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ascending" | "asc" | "a" => Ok(FlightDirection::Ascending),
            "descending" | "desc" | "d" => Ok(FlightDirection::Descending),
            other => Err(SnowError::Config(format!("Invalid flight direction: {}", other))),
        }
    }
}

/// Scalar tags of one time step of the stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Acquisition {
    pub time: DateTime<Utc>,
    /// Repeat ground track identifier
    pub relative_orbit: u16,
    pub platform: Platform,
    pub flight_dir: FlightDirection,
}

impl Acquisition {
    pub fn new(
        time: DateTime<Utc>,
        relative_orbit: u16,
        platform: Platform,
        flight_dir: FlightDirection,
    ) -> Self {
        Self {
            time,
            relative_orbit,
            platform,
            flight_dir,
        }
    }
}

/// Derived variables written onto the stack by the processing components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Variable {
    DeltaVV,
    DeltaCR,
    DeltaGamma,
    SnowIndex,
    SnowDepth,
    WetFlag,
    AltWetFlag,
    FreezeFlag,
    WetSnow,
    PermaWet,
}

impl Variable {
    pub const ALL: [Variable; 10] = [
        Variable::DeltaVV,
        Variable::DeltaCR,
        Variable::DeltaGamma,
        Variable::SnowIndex,
        Variable::SnowDepth,
        Variable::WetFlag,
        Variable::AltWetFlag,
        Variable::FreezeFlag,
        Variable::WetSnow,
        Variable::PermaWet,
    ];

    /// Name used when the variable is exported downstream
    pub fn name(&self) -> &'static str {
        match self {
            Variable::DeltaVV => "deltaVV",
            Variable::DeltaCR => "deltaCR",
            Variable::DeltaGamma => "deltaGamma",
            Variable::SnowIndex => "snow_index",
            Variable::SnowDepth => "snow_depth",
            Variable::WetFlag => "wet_flag",
            Variable::AltWetFlag => "alt_wet_flag",
            Variable::FreezeFlag => "freeze_flag",
            Variable::WetSnow => "wet_snow",
            Variable::PermaWet => "perma_wet",
        }
    }
}

impl std::fmt::Display for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Output of a processing component that can be written onto the stack
pub trait Annotation {
    fn into_variables(self) -> Vec<(Variable, SnowRaster)>;
}

/// Backscatter raster time series with its auxiliary layers and derived variables.
///
/// All rasters share the layout `(time, rows, cols)`. Derived variables are only
/// ever added through [`RasterTimeSeries::annotate`], which hands back a new
/// snapshot and refuses to overwrite an existing variable.
#[derive(Debug, Clone)]
pub struct RasterTimeSeries {
    acquisitions: Vec<Acquisition>,
    grid_shape: (usize, usize),
    units: BackscatterUnits,
    bands: HashMap<Band, SnowRaster>,
    fcf: Option<SnowImage>,
    ims: Option<ImsRaster>,
    derived: BTreeMap<Variable, SnowRaster>,
    metadata: Option<RunMetadata>,
}

impl RasterTimeSeries {
    /// Create an empty stack over the given acquisitions and pixel grid.
    ///
    /// Acquisition times must be strictly increasing.
    pub fn new(
        acquisitions: Vec<Acquisition>,
        grid_shape: (usize, usize),
        units: BackscatterUnits,
    ) -> SnowResult<Self> {
        if acquisitions.is_empty() {
            return Err(SnowError::TimeAxis("Time axis is empty".to_string()));
        }

        for pair in acquisitions.windows(2) {
            if pair[1].time <= pair[0].time {
                return Err(SnowError::TimeAxis(format!(
                    "Times must be strictly increasing and unique: {} follows {}",
                    pair[1].time, pair[0].time
                )));
            }
        }

        Ok(Self {
            acquisitions,
            grid_shape,
            units,
            bands: HashMap::new(),
            fcf: None,
            ims: None,
            derived: BTreeMap::new(),
            metadata: None,
        })
    }

    /// Attach a backscatter band
    pub fn with_band(mut self, band: Band, data: SnowRaster) -> SnowResult<Self> {
        self.check_raster_shape(&band.to_string(), data.shape())?;
        self.bands.insert(band, data);
        Ok(self)
    }

    /// Attach the static forest cover fraction
    pub fn with_fcf(mut self, fcf: SnowImage) -> SnowResult<Self> {
        let (rows, cols) = self.grid_shape;
        if fcf.dim() != (rows, cols) {
            return Err(SnowError::Shape {
                name: "fcf".to_string(),
                expected: vec![rows, cols],
                found: fcf.shape().to_vec(),
            });
        }
        self.fcf = Some(fcf);
        Ok(self)
    }

    /// Attach the per-time snow cover classes
    pub fn with_ims(mut self, ims: ImsRaster) -> SnowResult<Self> {
        self.check_raster_shape("ims", ims.shape())?;
        self.ims = Some(ims);
        Ok(self)
    }

    pub fn with_metadata(mut self, metadata: RunMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    fn check_raster_shape(&self, name: &str, found: &[usize]) -> SnowResult<()> {
        let expected = self.raster_shape();
        if found != expected {
            return Err(SnowError::Shape {
                name: name.to_string(),
                expected: expected.to_vec(),
                found: found.to_vec(),
            });
        }
        Ok(())
    }

    /// Shape shared by every time-varying raster
    pub fn raster_shape(&self) -> [usize; 3] {
        [self.acquisitions.len(), self.grid_shape.0, self.grid_shape.1]
    }

    pub fn grid_shape(&self) -> (usize, usize) {
        self.grid_shape
    }

    pub fn n_times(&self) -> usize {
        self.acquisitions.len()
    }

    pub fn acquisitions(&self) -> &[Acquisition] {
        &self.acquisitions
    }

    pub fn times(&self) -> Vec<DateTime<Utc>> {
        self.acquisitions.iter().map(|a| a.time).collect()
    }

    pub fn units(&self) -> BackscatterUnits {
        self.units
    }

    pub fn metadata(&self) -> Option<&RunMetadata> {
        self.metadata.as_ref()
    }

    /// Fail unless VV/VH are expressed in decibels
    pub fn require_decibels(&self) -> SnowResult<()> {
        match self.units {
            BackscatterUnits::Decibel => Ok(()),
            other => Err(SnowError::Units(other)),
        }
    }

    pub fn band(&self, band: Band) -> SnowResult<&SnowRaster> {
        self.bands
            .get(&band)
            .ok_or_else(|| SnowError::MissingVariable(band.to_string()))
    }

    pub fn fcf(&self) -> SnowResult<&SnowImage> {
        self.fcf
            .as_ref()
            .ok_or_else(|| SnowError::MissingVariable("fcf".to_string()))
    }

    pub fn ims(&self) -> SnowResult<&ImsRaster> {
        self.ims
            .as_ref()
            .ok_or_else(|| SnowError::MissingVariable("ims".to_string()))
    }

    pub fn variable(&self, variable: Variable) -> SnowResult<&SnowRaster> {
        self.derived
            .get(&variable)
            .ok_or_else(|| SnowError::MissingVariable(variable.name().to_string()))
    }

    pub fn has_variable(&self, variable: Variable) -> bool {
        self.derived.contains_key(&variable)
    }

    /// Derived variables currently present, in a stable order
    pub fn variables(&self) -> impl Iterator<Item = (Variable, &SnowRaster)> {
        self.derived.iter().map(|(v, data)| (*v, data))
    }

    /// Write a component's output onto the stack, returning the new snapshot.
    pub fn annotate<A: Annotation>(mut self, output: A) -> SnowResult<Self> {
        let variables = output.into_variables();

        for (variable, data) in &variables {
            if self.derived.contains_key(variable) {
                return Err(SnowError::DuplicateVariable(variable.name().to_string()));
            }
            self.check_raster_shape(variable.name(), data.shape())?;
        }

        for (variable, data) in variables {
            log::debug!("Adding derived variable {}", variable);
            self.derived.insert(variable, data);
        }

        Ok(self)
    }

    /// Copy of the stack with all derived variables and run metadata removed
    pub fn without_derived(&self) -> Self {
        Self {
            acquisitions: self.acquisitions.clone(),
            grid_shape: self.grid_shape,
            units: self.units,
            bands: self.bands.clone(),
            fcf: self.fcf.clone(),
            ims: self.ims.clone(),
            derived: BTreeMap::new(),
            metadata: None,
        }
    }

    /// Distinct relative orbits, ascending
    pub fn orbits(&self) -> Vec<u16> {
        let mut orbits: Vec<u16> = self.acquisitions.iter().map(|a| a.relative_orbit).collect();
        orbits.sort_unstable();
        orbits.dedup();
        orbits
    }

    /// Time indices belonging to one relative orbit, in time order
    pub fn orbit_indices(&self, orbit: u16) -> Vec<usize> {
        self.acquisitions
            .iter()
            .enumerate()
            .filter(|(_, a)| a.relative_orbit == orbit)
            .map(|(i, _)| i)
            .collect()
    }

    /// Convert VV/VH from linear amplitude to decibels.
    ///
    /// Non-positive amplitudes become missing. A stack already in decibels is
    /// returned unchanged.
    pub fn to_decibels(mut self) -> Self {
        if self.units == BackscatterUnits::Decibel {
            return self;
        }

        log::debug!("Converting VV/VH to dB scale");
        for band in [Band::VV, Band::VH] {
            if let Some(data) = self.bands.get_mut(&band) {
                data.mapv_inplace(|x| if x > 0.0 { 10.0 * x.log10() } else { MISSING });
            }
        }
        self.units = BackscatterUnits::Decibel;
        self
    }

    /// Convert VV/VH from decibels back to linear amplitude
    pub fn to_amplitude(mut self) -> Self {
        if self.units == BackscatterUnits::Amplitude {
            return self;
        }

        log::debug!("Converting VV/VH to linear scale");
        for band in [Band::VV, Band::VH] {
            if let Some(data) = self.bands.get_mut(&band) {
                data.mapv_inplace(|x| 10.0_f32.powf(x / 10.0));
            }
        }
        self.units = BackscatterUnits::Amplitude;
        self
    }
}

/// Error types for snow retrieval
#[derive(Debug, thiserror::Error)]
pub enum SnowError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Backscatter must be in dB, found {0}")]
    Units(BackscatterUnits),

    #[error("Missing required variable: {0}")]
    MissingVariable(String),

    #[error("Variable {0} is already present in the dataset")]
    DuplicateVariable(String),

    #[error("Shape mismatch for {name}: expected {expected:?}, found {found:?}")]
    Shape {
        name: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("Invalid time axis: {0}")]
    TimeAxis(String),

    #[error("Repeat interval error: {0}")]
    RepeatInterval(String),

    #[error("Invalid parameter: {0}")]
    Config(String),
}

/// Result type for snow retrieval operations
pub type SnowResult<T> = Result<T, SnowError>;
