//! Batch model comparison over subjects and noise levels.
//!
//! Each (subject, log-precision) pair is scored independently from its
//! persisted inversion record. A missing record or a failed reduction is
//! reported for that item and the loop moves on.

use serde::{Deserialize, Serialize};

use crate::error::SysobsError;
use crate::reduction::{ModelComparison, ModelReducer};
use crate::store::{RecordKey, ResultStore};

/// What happened to one batch item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    Compared(ModelComparison),
    /// No record on disk for this key.
    Missing,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub key: RecordKey,
    pub outcome: BatchOutcome,
}

/// Per-noise-level aggregate over subjects that were compared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSummary {
    pub log_precision: i32,
    pub subjects: usize,
    /// Mean posterior probability of each candidate, in candidate order.
    pub mean_probability: Vec<f64>,
    /// How many subjects each candidate won.
    pub wins: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub candidates: Vec<String>,
    pub entries: Vec<BatchEntry>,
}

impl BatchReport {
    pub fn compared(&self) -> impl Iterator<Item = (&RecordKey, &ModelComparison)> {
        self.entries.iter().filter_map(|e| match &e.outcome {
            BatchOutcome::Compared(c) => Some((&e.key, c)),
            _ => None,
        })
    }

    pub fn missing(&self) -> Vec<&RecordKey> {
        self.entries
            .iter()
            .filter(|e| e.outcome == BatchOutcome::Missing)
            .map(|e| &e.key)
            .collect()
    }

    pub fn failed(&self) -> Vec<(&RecordKey, &str)> {
        self.entries
            .iter()
            .filter_map(|e| match &e.outcome {
                BatchOutcome::Failed { reason } => Some((&e.key, reason.as_str())),
                _ => None,
            })
            .collect()
    }

    /// Aggregate compared items by noise level, in ascending level order.
    pub fn by_level(&self) -> Vec<LevelSummary> {
        let k = self.candidates.len();
        let mut levels: Vec<i32> = self.compared().map(|(key, _)| key.log_precision).collect();
        levels.sort_unstable();
        levels.dedup();

        levels
            .into_iter()
            .map(|lp| {
                let mut sum = vec![0.0; k];
                let mut wins = vec![0usize; k];
                let mut subjects = 0;
                for (_, cmp) in self.compared().filter(|(key, _)| key.log_precision == lp) {
                    subjects += 1;
                    for (i, p) in cmp.probabilities().into_iter().enumerate().take(k) {
                        sum[i] += p;
                    }
                    if let Some(i) = self.candidates.iter().position(|n| *n == cmp.best) {
                        wins[i] += 1;
                    }
                }
                LevelSummary {
                    log_precision: lp,
                    subjects,
                    mean_probability: sum.into_iter().map(|s| s / subjects as f64).collect(),
                    wins,
                }
            })
            .collect()
    }
}

/// Score every subject × noise level in `store` against the reducer's
/// candidates.
pub fn compare_batch(
    store: &ResultStore,
    reducer: &ModelReducer,
    subjects: &[String],
    log_precisions: &[i32],
) -> BatchReport {
    let mut entries = Vec::with_capacity(subjects.len() * log_precisions.len());
    for subject in subjects {
        for &lp in log_precisions {
            let key = RecordKey::new(subject.as_str(), lp);
            let outcome = match store.require(&key) {
                Ok(record) => match reducer.compare(&record.prior, &record.posterior) {
                    Ok(cmp) => BatchOutcome::Compared(cmp),
                    Err(e) => {
                        log::warn!("{subject} @ lp {lp}: reduction failed: {e}");
                        BatchOutcome::Failed {
                            reason: e.to_string(),
                        }
                    }
                },
                Err(SysobsError::MissingRecord { .. }) => {
                    log::warn!("{subject} @ lp {lp}: no inversion record, skipping");
                    BatchOutcome::Missing
                }
                Err(e) => {
                    log::warn!("{subject} @ lp {lp}: {e}");
                    BatchOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };
            entries.push(BatchEntry { key, outcome });
        }
    }

    BatchReport {
        candidates: reducer.candidates().iter().map(|c| c.name.clone()).collect(),
        entries,
    }
}
