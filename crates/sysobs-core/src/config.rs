//! Experiment configuration.
//!
//! Every field has a default, so a JSON file only needs the fields it
//! overrides:
//!
//! ```json
//! { "samples": 2048, "scenes": { "kind": "uniform", "scenes": 8 } }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::driver::DriverConfig;
use crate::error::{Result, SysobsError};
use crate::inversion::{ModelSpec, Prior};
use crate::params::{ParameterSet, ReducedCandidate};
use crate::scenes::SceneSource;

/// Settings for synthesizing, simulating, inverting and comparing one
/// scenario or a batch of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Driver length in samples.
    pub samples: usize,
    /// Sampling rate in Hz.
    pub rate: f64,
    pub scenes: SceneSource,
    pub driver: DriverConfig,
    /// Parameters used to generate synthetic data.
    pub true_params: ParameterSet,
    pub prior_mean: ParameterSet,
    pub prior_variance: ParameterSet,
    pub state_log_precision: f64,
    pub embedding_order: usize,
    /// Observation-noise log-precisions swept in batch runs.
    pub noise_levels: Vec<i32>,
    pub subjects: Vec<String>,
    pub candidates: Vec<ReducedCandidate>,
    /// Seed for the caller-owned RNG.
    pub seed: u64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            samples: 1024,
            rate: 128.0,
            scenes: SceneSource::default(),
            driver: DriverConfig::default(),
            true_params: ParameterSet {
                a: 1.0,
                b: 0.5,
                c: 1.0,
                k: 1.0,
                da: 0.5,
                dk: 0.0,
                s1: 0.1,
                s2: 0.1,
            },
            prior_mean: ParameterSet {
                a: 1.0,
                b: 0.5,
                c: 1.0,
                k: 1.0,
                da: 0.0,
                dk: 0.0,
                s1: 0.1,
                s2: 0.1,
            },
            prior_variance: ParameterSet {
                a: 1.0 / 16.0,
                b: 1.0 / 16.0,
                c: 1.0 / 16.0,
                k: 1.0 / 16.0,
                da: 1.0,
                dk: 1.0,
                s1: 0.0,
                s2: 0.0,
            },
            state_log_precision: 8.0,
            embedding_order: 4,
            noise_levels: vec![4, 6, 8],
            subjects: Vec::new(),
            candidates: ReducedCandidate::standard_set(),
            seed: 0,
        }
    }
}

impl ExperimentConfig {
    /// Load a config from a JSON file, filling unspecified fields with
    /// defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| SysobsError::io(path, e))?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.samples <= 1 {
            return Err(SysobsError::invalid(format!(
                "samples must be at least 2, got {}",
                self.samples
            )));
        }
        if !(self.rate.is_finite() && self.rate > 0.0) {
            return Err(SysobsError::invalid(format!(
                "rate must be positive, got {}",
                self.rate
            )));
        }
        if self.candidates.is_empty() {
            return Err(SysobsError::invalid("at least one reduced candidate is required"));
        }
        if let Some((p, v)) = self.prior_variance.iter().find(|&(_, v)| v < 0.0) {
            return Err(SysobsError::invalid(format!(
                "prior variance of {p} is negative ({v})"
            )));
        }
        Ok(())
    }

    pub fn prior(&self) -> Prior {
        Prior::diagonal(self.prior_mean, self.prior_variance)
    }

    /// Model specification for an inversion at observation log-precision
    /// `log_precision`.
    pub fn model_spec(&self, log_precision: f64) -> ModelSpec {
        ModelSpec {
            prior: self.prior(),
            observation_log_precision: log_precision,
            state_log_precision: self.state_log_precision,
            embedding_order: self.embedding_order,
            dt: self.rate.recip(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::Smoothing;
    use crate::params::Param;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = ExperimentConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.candidates.len(), 4);
        assert_eq!(cfg.prior().variance(Param::Da), 1.0);
        assert_eq!(cfg.prior().variance(Param::S1), 0.0);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("exp.json");
        std::fs::write(
            &path,
            r#"{
                "samples": 2048,
                "scenes": { "kind": "cut_times", "times": [1.5, 4.0], "rate": 128.0 },
                "driver": { "smoothing": { "kind": "gaussian", "window": 7 } },
                "subjects": ["s01", "s02"]
            }"#,
        )
        .unwrap();
        let cfg = ExperimentConfig::load(&path).unwrap();
        assert_eq!(cfg.samples, 2048);
        assert_eq!(cfg.rate, 128.0);
        assert_eq!(cfg.driver.smoothing, Smoothing::Gaussian { window: 7 });
        assert_eq!(cfg.driver.noise_std, 0.5);
        assert_eq!(cfg.subjects, vec!["s01", "s02"]);
        assert!(matches!(cfg.scenes, SceneSource::CutTimes { .. }));
        assert_eq!(cfg.noise_levels, vec![4, 6, 8]);
    }

    #[test]
    fn test_candidates_from_json() {
        let json = r#"{
            "candidates": [
                { "name": "full", "fixed": [] },
                { "name": "no-k", "fixed": ["k", "dk"] }
            ]
        }"#;
        let cfg: ExperimentConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.candidates.len(), 2);
        assert!(cfg.candidates[1].fixed.contains(Param::K));
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let cfg = ExperimentConfig {
            samples: 1,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = ExperimentConfig {
            candidates: vec![],
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = ExperimentConfig {
            prior_variance: ParameterSet::splat(1.0).with(Param::B, -0.1),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_model_spec_uses_rate() {
        let cfg = ExperimentConfig {
            rate: 250.0,
            ..Default::default()
        };
        let spec = cfg.model_spec(6.0);
        assert_eq!(spec.dt, 1.0 / 250.0);
        assert_eq!(spec.observation_log_precision, 6.0);
        assert_eq!(spec.prior, cfg.prior());
    }
}
