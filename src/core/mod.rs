//! Core snow retrieval processing modules

pub mod change_metrics;
pub mod repeat_interval;
pub mod snow_index;
pub mod wet_snow;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-export main types
pub use change_metrics::{ChangeMetricCalculator, ChangeMetricParams, ChangeMetrics};
pub use repeat_interval::{find_repeat_interval, detect_repeat_interval, RepeatInterval};
pub use snow_index::{SnowIndex, SnowIndexIntegrator, SnowIndexParams};
pub use wet_snow::{WetSnow, WetSnowClassifier, WetSnowFlags, WetSnowParams, WetState};
