use crate::io::RetrievalParams;
use crate::types::SnowResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Record of how a retrieval was produced, attached to the output stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub params: RetrievalParams,
    pub repeat_interval_days: i64,
    pub n_acquisitions: usize,
    pub orbits: Vec<u16>,
    pub version: String,
}

impl RunMetadata {
    pub fn new(params: RetrievalParams, repeat_interval_days: i64, n_acquisitions: usize, orbits: Vec<u16>) -> Self {
        Self {
            params,
            repeat_interval_days,
            n_acquisitions,
            orbits,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Flat attribute map for writers that only support scalar attributes
    pub fn to_attributes(&self) -> BTreeMap<String, String> {
        let mut attrs = BTreeMap::new();
        attrs.insert("param_A".to_string(), self.params.a.to_string());
        attrs.insert("param_B".to_string(), self.params.b.to_string());
        attrs.insert("param_C".to_string(), self.params.c.to_string());
        attrs.insert("wet_thresh".to_string(), self.params.wet_thresh.to_string());
        attrs.insert("freeze_thresh".to_string(), self.params.freeze_thresh.to_string());
        attrs.insert("wet_SI_thresh".to_string(), self.params.wet_si_thresh.to_string());
        attrs.insert("delta_gamma_clip".to_string(), self.params.delta_gamma_clip.to_string());
        attrs.insert("repeat_interval_days".to_string(), self.repeat_interval_days.to_string());
        attrs.insert("n_acquisitions".to_string(), self.n_acquisitions.to_string());
        attrs.insert(
            "relative_orbits".to_string(),
            self.orbits.iter().map(|o| o.to_string()).collect::<Vec<_>>().join(","),
        );
        attrs.insert("version".to_string(), self.version.clone());
        attrs
    }
}

/// Write run metadata as pretty-printed JSON
pub fn write_metadata<P: AsRef<Path>>(path: P, metadata: &RunMetadata) -> SnowResult<()> {
    log::info!("Writing run metadata: {}", path.as_ref().display());
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, metadata)?;
    writer.flush()?;
    Ok(())
}

pub fn read_metadata<P: AsRef<Path>>(path: P) -> SnowResult<RunMetadata> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes() {
        let metadata = RunMetadata::new(RetrievalParams::with_abc(2.5, 0.2, 0.55), 12, 30, vec![20, 93]);
        let attrs = metadata.to_attributes();
        assert_eq!(attrs["param_A"], "2.5");
        assert_eq!(attrs["param_C"], "0.55");
        assert_eq!(attrs["repeat_interval_days"], "12");
        assert_eq!(attrs["relative_orbits"], "20,93");
    }

    #[test]
    fn test_metadata_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        let metadata = RunMetadata::new(RetrievalParams::default(), 6, 4, vec![1, 24]);

        write_metadata(&path, &metadata).unwrap();
        let loaded = read_metadata(&path).unwrap();
        assert_eq!(loaded, metadata);
    }
}
