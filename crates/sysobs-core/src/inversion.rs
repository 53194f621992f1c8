//! Boundary to the external variational inversion engine.
//!
//! The engine that fits the generative model to data is not part of this
//! crate. It is injected through [`InversionEngine`] and treated strictly as
//! `(ModelSpec, inputs, data) -> Posterior`. Everything downstream of the
//! posterior (model reduction, comparison) is local and pure.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SysobsError};
use crate::params::{Param, ParameterSet};

/// Gaussian prior over the parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prior {
    pub mean: ParameterSet,
    /// Covariance in [`Param::ALL`] order.
    pub covariance: DMatrix<f64>,
}

impl Prior {
    /// Prior with independent parameters.
    pub fn diagonal(mean: ParameterSet, variances: ParameterSet) -> Self {
        Self {
            mean,
            covariance: variances.to_diagonal_covariance(),
        }
    }

    pub fn variance(&self, param: Param) -> f64 {
        self.covariance[(param.index(), param.index())]
    }

    pub fn validate(&self) -> Result<()> {
        check_covariance("prior covariance", &self.covariance)
    }
}

/// Gaussian posterior returned by an inversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posterior {
    pub mean: ParameterSet,
    pub covariance: DMatrix<f64>,
}

impl Posterior {
    pub fn variance(&self, param: Param) -> f64 {
        self.covariance[(param.index(), param.index())]
    }

    pub fn validate(&self) -> Result<()> {
        check_covariance("posterior covariance", &self.covariance)
    }
}

fn check_covariance(what: &str, m: &DMatrix<f64>) -> Result<()> {
    if m.nrows() != Param::COUNT {
        return Err(SysobsError::dimension(what, Param::COUNT, m.nrows()));
    }
    if m.ncols() != Param::COUNT {
        return Err(SysobsError::dimension(what, Param::COUNT, m.ncols()));
    }
    Ok(())
}

/// Multichannel series stored row-major: one row per channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    rows: Vec<Vec<f64>>,
}

impl TimeSeries {
    /// Build from equal-length, non-empty rows.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let Some(first) = rows.first() else {
            return Err(SysobsError::invalid("time series needs at least one row"));
        };
        let len = first.len();
        if len == 0 {
            return Err(SysobsError::invalid("time series rows are empty"));
        }
        if let Some(bad) = rows.iter().find(|r| r.len() != len) {
            return Err(SysobsError::dimension("time series row", len, bad.len()));
        }
        Ok(Self { rows })
    }

    pub fn channels(&self) -> usize {
        self.rows.len()
    }

    pub fn samples(&self) -> usize {
        self.rows[0].len()
    }

    pub fn row(&self, channel: usize) -> Option<&[f64]> {
        self.rows.get(channel).map(Vec::as_slice)
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }
}

/// Model specification handed to an inversion engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub prior: Prior,
    /// Log-precision of observation noise.
    pub observation_log_precision: f64,
    /// Log-precision of state noise.
    pub state_log_precision: f64,
    /// Order of generalized coordinates.
    pub embedding_order: usize,
    /// Integration step in seconds.
    pub dt: f64,
}

/// An external inversion engine.
pub trait InversionEngine {
    /// Engine identifier stored alongside persisted results.
    fn name(&self) -> &str;

    /// Fit `spec` to `data` driven by `inputs`.
    fn invert(&self, spec: &ModelSpec, inputs: &TimeSeries, data: &TimeSeries)
    -> Result<Posterior>;
}
