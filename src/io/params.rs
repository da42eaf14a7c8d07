use crate::core::{ChangeMetricParams, SnowIndexParams, WetSnowParams};
use crate::types::{SnowError, SnowResult};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Tunable parameters of the snow depth retrieval
///
/// Field names in JSON follow the published model (`A`, `B`, `C`,
/// `wet_SI_thresh`); any field left out falls back to its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalParams {
    /// Weight of VH in the cross-ratio `A * VH - VV`
    #[serde(rename = "A")]
    pub a: f32,
    /// Weight of deltaVV in forested pixels
    #[serde(rename = "B")]
    pub b: f32,
    /// Snow index to snow depth scale (meters per index unit)
    #[serde(rename = "C")]
    pub c: f32,
    /// Backscatter drop in dB marking newly wet snow
    pub wet_thresh: f32,
    /// deltaGamma rise in dB marking refreeze
    pub freeze_thresh: f32,
    /// Snow index at or below which snow-covered pixels are flagged wet
    #[serde(rename = "wet_SI_thresh")]
    pub wet_si_thresh: f32,
    /// Symmetric clip bound for deltaGamma in dB
    pub delta_gamma_clip: f32,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            a: 2.0,
            b: 0.5,
            c: 0.44,
            wet_thresh: -2.0,
            freeze_thresh: 2.0,
            wet_si_thresh: 0.0,
            delta_gamma_clip: 3.0,
        }
    }
}

impl RetrievalParams {
    /// Parameters with the given model coefficients and default thresholds
    pub fn with_abc(a: f32, b: f32, c: f32) -> Self {
        Self {
            a,
            b,
            c,
            ..Self::default()
        }
    }

    pub fn wet_thresh(mut self, wet_thresh: f32) -> Self {
        self.wet_thresh = wet_thresh;
        self
    }

    pub fn freeze_thresh(mut self, freeze_thresh: f32) -> Self {
        self.freeze_thresh = freeze_thresh;
        self
    }

    pub fn wet_si_thresh(mut self, wet_si_thresh: f32) -> Self {
        self.wet_si_thresh = wet_si_thresh;
        self
    }

    pub fn delta_gamma_clip(mut self, delta_gamma_clip: f32) -> Self {
        self.delta_gamma_clip = delta_gamma_clip;
        self
    }

    /// Load parameters from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> SnowResult<Self> {
        log::info!("Reading retrieval parameters: {}", path.as_ref().display());
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let params: RetrievalParams = serde_json::from_reader(reader)?;
        params.validate()?;
        Ok(params)
    }

    pub fn from_json_str(json: &str) -> SnowResult<Self> {
        let params: RetrievalParams = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    /// Reject values the model cannot run with
    pub fn validate(&self) -> SnowResult<()> {
        let values = [
            ("A", self.a),
            ("B", self.b),
            ("C", self.c),
            ("wet_thresh", self.wet_thresh),
            ("freeze_thresh", self.freeze_thresh),
            ("wet_SI_thresh", self.wet_si_thresh),
            ("delta_gamma_clip", self.delta_gamma_clip),
        ];
        for (name, value) in values {
            if !value.is_finite() {
                return Err(SnowError::Config(format!("{} must be finite, got {}", name, value)));
            }
        }

        if !(0.0..=1.0).contains(&self.b) {
            return Err(SnowError::Config(format!("B must lie in [0, 1], got {}", self.b)));
        }
        if self.c <= 0.0 {
            return Err(SnowError::Config(format!("C must be positive, got {}", self.c)));
        }
        if self.delta_gamma_clip <= 0.0 {
            return Err(SnowError::Config(format!(
                "delta_gamma_clip must be positive, got {}",
                self.delta_gamma_clip
            )));
        }

        Ok(())
    }

    pub fn change_metric_params(&self) -> ChangeMetricParams {
        ChangeMetricParams {
            a: self.a,
            b: self.b,
            clip: self.delta_gamma_clip,
        }
    }

    pub fn snow_index_params(&self) -> SnowIndexParams {
        SnowIndexParams { c: self.c }
    }

    pub fn wet_snow_params(&self) -> WetSnowParams {
        WetSnowParams {
            wet_thresh: self.wet_thresh,
            freeze_thresh: self.freeze_thresh,
            wet_si_thresh: self.wet_si_thresh,
        }
    }

    /// Log thresholds whose sign looks inverted. They are still honored.
    pub fn warn_suspicious(&self) {
        if self.wet_thresh >= 0.0 {
            log::warn!(
                "Running with wet snow threshold of {}. This value is positive but should be negative.",
                self.wet_thresh
            );
        }
        if self.freeze_thresh <= 0.0 {
            log::warn!(
                "Running with refreeze threshold of {}. This value is negative but should be positive.",
                self.freeze_thresh
            );
        }
    }
}
