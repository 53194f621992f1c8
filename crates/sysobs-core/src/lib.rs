//! # sysobs-core
//!
//! **Did the system change, or only how we observe it?**
//!
//! `sysobs-core` synthesizes naturalistic driver inputs for a coupled
//! two-region model and scores reduced variants of that model against a full
//! Gaussian posterior using closed-form Bayesian model reduction.
//!
//! ## Quick Start
//!
//! ```
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//! use sysobs_core::{
//!     DriverConfig, ModelReducer, ParameterSet, Posterior, Prior, SceneSource, synthesize,
//! };
//!
//! # fn main() -> sysobs_core::Result<()> {
//! let mut rng = StdRng::seed_from_u64(7);
//! let driver = synthesize(
//!     512,
//!     &SceneSource::Uniform { scenes: 4 },
//!     &DriverConfig::default(),
//!     &mut rng,
//! )?;
//! assert_eq!(driver.len(), 512);
//!
//! let prior = Prior::diagonal(ParameterSet::default(), ParameterSet::splat(1.0));
//! let posterior = Posterior {
//!     mean: ParameterSet::default(),
//!     covariance: ParameterSet::splat(0.1).to_diagonal_covariance(),
//! };
//! let comparison = ModelReducer::default().compare(&prior, &posterior)?;
//! println!("best: {}", comparison.best);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! Scenes → Driver → Model simulation → Inversion engine → Posterior →
//! Model reduction → Comparison
//!
//! Inversion itself is pluggable through [`InversionEngine`]. The crate ships
//! [`StoreReplay`], which serves posteriors persisted in a [`ResultStore`], so
//! batch comparison can run against results produced elsewhere.

pub mod batch;
pub mod config;
pub mod driver;
pub mod error;
pub mod inversion;
pub mod model;
pub mod params;
pub mod reduction;
pub mod scenario;
pub mod scenes;
pub mod store;

pub use batch::{BatchEntry, BatchOutcome, BatchReport, LevelSummary, compare_batch};
pub use config::ExperimentConfig;
pub use driver::{Driver, DriverConfig, Smoothing, scene_signal, smooth, synthesize};
pub use error::{Result, SysobsError};
pub use inversion::{InversionEngine, ModelSpec, Posterior, Prior, TimeSeries};
pub use model::{Simulation, simulate};
pub use params::{Param, ParamMask, ParameterSet, ReducedCandidate};
pub use reduction::{
    CandidateScore, ModelComparison, ModelReducer, log_evidence, normalize_evidence,
    posterior_probabilities, reduce_all,
};
pub use scenario::{ScenarioResult, generating_params, noise_std, run_scenario, synthesize_data};
pub use scenes::{ScenePartition, SceneSource, load_scene_cuts, parse_scene_cuts};
pub use store::{InversionRecord, RECORD_VERSION, RecordKey, ResultStore, StoreReplay};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
