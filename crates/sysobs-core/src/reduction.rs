//! Bayesian model reduction and posterior model probabilities.
//!
//! Given a Gaussian posterior `q = N(qE, qC)` under a full prior
//! `p = N(pE, pC)`, the log-evidence of a reduced model with prior
//! `r = N(rE, rC)` relative to the full model is
//!
//! ```text
//! ΔF = ln ∫ q(θ) r(θ) / p(θ) dθ
//! ```
//!
//! which has a closed form in the four Gaussian summaries. No re-inversion
//! is needed: this module is pure linear algebra on top of whatever the
//! inversion engine returned.
//!
//! Parameters whose reduced variance is zero are handled exactly (a
//! Savage–Dickey density ratio plus conditioning of the kept parameters)
//! rather than by inverting a near-singular matrix.

use std::f64::consts::PI;

use nalgebra::{Cholesky, DMatrix, DVector, Dyn};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SysobsError};
use crate::inversion::{Posterior, Prior};
use crate::params::{ParamMask, ReducedCandidate};

// ---------------------------------------------------------------------------
// Closed-form reduction
// ---------------------------------------------------------------------------

/// Log-evidence of the reduced prior `N(re, rc)` relative to the full prior
/// `N(pe, pc)`, given the full-model posterior `N(qe, qc)`.
///
/// Parameters with zero variance in `pc` are fixed in both models and are
/// ignored; a reduced prior may not free them. Parameters with zero variance
/// in `rc` are fixed at `re` in the reduced model.
pub fn log_evidence(
    qe: &DVector<f64>,
    qc: &DMatrix<f64>,
    pe: &DVector<f64>,
    pc: &DMatrix<f64>,
    re: &DVector<f64>,
    rc: &DMatrix<f64>,
) -> Result<f64> {
    let n = pc.nrows();
    check_square("prior covariance", pc, n)?;
    check_square("posterior covariance", qc, n)?;
    check_square("reduced covariance", rc, n)?;
    check_len("posterior mean", qe, n)?;
    check_len("prior mean", pe, n)?;
    check_len("reduced mean", re, n)?;
    let all_finite = [qe.iter(), pe.iter(), re.iter()]
        .into_iter()
        .flatten()
        .chain(qc.iter())
        .chain(pc.iter())
        .chain(rc.iter())
        .all(|v| v.is_finite());
    if !all_finite {
        return Err(SysobsError::invalid("non-finite value in reduction inputs"));
    }

    let mut removed = Vec::new();
    let mut kept = Vec::new();
    for i in 0..n {
        let (p_var, r_var) = (pc[(i, i)], rc[(i, i)]);
        if p_var < 0.0 {
            return Err(SysobsError::NotPositiveDefinite("prior covariance"));
        }
        if r_var < 0.0 {
            return Err(SysobsError::NotPositiveDefinite("reduced covariance"));
        }
        if p_var == 0.0 {
            if r_var != 0.0 {
                return Err(SysobsError::invalid(format!(
                    "reduced prior frees parameter {i}, which the full prior fixes"
                )));
            }
            continue;
        }
        if r_var == 0.0 {
            removed.push(i);
        } else {
            kept.push(i);
        }
    }

    let mut f = 0.0;
    if !removed.is_empty() {
        // Savage–Dickey: posterior over prior density at the fixed point.
        let at = re.select_rows(&removed);
        let q_rr = sub(qc, &removed, &removed);
        let p_rr = sub(pc, &removed, &removed);
        f += gaussian_log_density(&at, &qe.select_rows(&removed), &q_rr, "posterior covariance")?;
        f -= gaussian_log_density(&at, &pe.select_rows(&removed), &p_rr, "prior covariance")?;
    }
    if !kept.is_empty() {
        let (qe_k, qc_k) = condition(qe, qc, &kept, &removed, re)?;
        let (pe_k, pc_k) = condition(pe, pc, &kept, &removed, re)?;
        let re_k = re.select_rows(&kept);
        let rc_k = sub(rc, &kept, &kept);
        f += full_rank_log_evidence(&qe_k, &qc_k, &pe_k, &pc_k, &re_k, &rc_k)?;
    }
    Ok(f)
}

/// Standard reduction formula when every parameter has positive variance
/// under all three densities.
fn full_rank_log_evidence(
    qe: &DVector<f64>,
    qc: &DMatrix<f64>,
    pe: &DVector<f64>,
    pc: &DMatrix<f64>,
    re: &DVector<f64>,
    rc: &DMatrix<f64>,
) -> Result<f64> {
    let q = Factor::new(qc, "posterior covariance")?;
    let p = Factor::new(pc, "prior covariance")?;
    let r = Factor::new(rc, "reduced covariance")?;

    let qp = q.inverse();
    let pp = p.inverse();
    let rp = r.inverse();

    let sp = &qp + &rp - &pp;
    let s = Factor::new(&sp, "reduced posterior precision")?;
    let se = &qp * qe + &rp * re - &pp * pe;

    let quad = qe.dot(&(&qp * qe)) + re.dot(&(&rp * re)) - pe.dot(&(&pp * pe))
        - se.dot(&s.solve(&se));
    let logdet = p.logdet - r.logdet - q.logdet - s.logdet;
    Ok(0.5 * (logdet - quad))
}

/// Mean and covariance of `θ_kept | θ_fixed = at_fixed`.
fn condition(
    mean: &DVector<f64>,
    cov: &DMatrix<f64>,
    kept: &[usize],
    fixed: &[usize],
    at: &DVector<f64>,
) -> Result<(DVector<f64>, DMatrix<f64>)> {
    let m_k = mean.select_rows(kept);
    let c_kk = sub(cov, kept, kept);
    if fixed.is_empty() {
        return Ok((m_k, c_kk));
    }
    let c_kf = sub(cov, kept, fixed);
    let c_ff = Factor::new(&sub(cov, fixed, fixed), "covariance of fixed parameters")?;
    let delta = at.select_rows(fixed) - mean.select_rows(fixed);
    let m = m_k + &c_kf * c_ff.solve(&delta);
    let c = c_kk - &c_kf * c_ff.solve_mat(&c_kf.transpose());
    Ok((m, c))
}

fn gaussian_log_density(
    x: &DVector<f64>,
    mean: &DVector<f64>,
    cov: &DMatrix<f64>,
    what: &'static str,
) -> Result<f64> {
    let f = Factor::new(cov, what)?;
    let d = x - mean;
    let k = x.len() as f64;
    Ok(-0.5 * (d.dot(&f.solve(&d)) + f.logdet + k * (2.0 * PI).ln()))
}

/// Cholesky factor with its log-determinant.
struct Factor {
    chol: Cholesky<f64, Dyn>,
    logdet: f64,
}

impl Factor {
    fn new(m: &DMatrix<f64>, what: &'static str) -> Result<Self> {
        let chol = Cholesky::new(m.clone()).ok_or(SysobsError::NotPositiveDefinite(what))?;
        let logdet = 2.0 * chol.l_dirty().diagonal().iter().map(|d| d.ln()).sum::<f64>();
        if !logdet.is_finite() {
            return Err(SysobsError::NotPositiveDefinite(what));
        }
        Ok(Self { chol, logdet })
    }

    fn inverse(&self) -> DMatrix<f64> {
        self.chol.inverse()
    }

    fn solve(&self, b: &DVector<f64>) -> DVector<f64> {
        self.chol.solve(b)
    }

    fn solve_mat(&self, b: &DMatrix<f64>) -> DMatrix<f64> {
        self.chol.solve(b)
    }
}

fn sub(m: &DMatrix<f64>, rows: &[usize], cols: &[usize]) -> DMatrix<f64> {
    m.select_rows(rows).select_columns(cols)
}

fn check_square(what: &str, m: &DMatrix<f64>, n: usize) -> Result<()> {
    if m.nrows() != n {
        return Err(SysobsError::dimension(what, n, m.nrows()));
    }
    if m.ncols() != n {
        return Err(SysobsError::dimension(what, n, m.ncols()));
    }
    Ok(())
}

fn check_len(what: &str, v: &DVector<f64>, n: usize) -> Result<()> {
    if v.len() != n {
        return Err(SysobsError::dimension(what, n, v.len()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Evidence vectors
// ---------------------------------------------------------------------------

/// Log-evidence of each reduced covariance against the full model, in input
/// order, before normalization. Every candidate shares the prior mean `pe`.
pub fn reduce_all(
    qe: &DVector<f64>,
    qc: &DMatrix<f64>,
    pe: &DVector<f64>,
    pc: &DMatrix<f64>,
    reduced: &[DMatrix<f64>],
) -> Result<Vec<f64>> {
    if reduced.is_empty() {
        return Err(SysobsError::invalid("no reduced candidates to compare"));
    }
    reduced
        .iter()
        .map(|rc| log_evidence(qe, qc, pe, pc, pe, rc))
        .collect()
}

/// Shift `f` so its minimum is exactly zero.
pub fn normalize_evidence(f: &[f64]) -> Vec<f64> {
    let min = f.iter().copied().fold(f64::INFINITY, f64::min);
    f.iter().map(|&v| v - min).collect()
}

/// Numerically stable softmax of an evidence vector.
pub fn posterior_probabilities(f: &[f64]) -> Result<Vec<f64>> {
    if f.is_empty() {
        return Err(SysobsError::invalid("empty evidence vector"));
    }
    if f.iter().any(|v| !v.is_finite()) {
        return Err(SysobsError::invalid("non-finite evidence value"));
    }
    let max = f.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let weights: Vec<f64> = f.iter().map(|&v| (v - max).exp()).collect();
    let total: f64 = weights.iter().sum();
    Ok(weights.into_iter().map(|w| w / total).collect())
}

// ---------------------------------------------------------------------------
// Named comparison
// ---------------------------------------------------------------------------

/// Score of one reduced hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub name: String,
    pub fixed: ParamMask,
    /// Log-evidence relative to the full model.
    pub log_evidence: f64,
    /// Log-evidence shifted so the worst candidate is zero.
    pub free_energy: f64,
    pub probability: f64,
}

/// Outcome of comparing reduced hypotheses against one posterior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelComparison {
    pub scores: Vec<CandidateScore>,
    /// Name of the most probable candidate.
    pub best: String,
}

impl ModelComparison {
    /// Normalized evidences in candidate order.
    pub fn free_energies(&self) -> Vec<f64> {
        self.scores.iter().map(|s| s.free_energy).collect()
    }

    pub fn probabilities(&self) -> Vec<f64> {
        self.scores.iter().map(|s| s.probability).collect()
    }

    pub fn score(&self, name: &str) -> Option<&CandidateScore> {
        self.scores.iter().find(|s| s.name == name)
    }
}

/// Compares a fixed list of reduced hypotheses against inversion results.
#[derive(Debug, Clone)]
pub struct ModelReducer {
    candidates: Vec<ReducedCandidate>,
}

impl Default for ModelReducer {
    fn default() -> Self {
        Self::new(ReducedCandidate::standard_set())
    }
}

impl ModelReducer {
    pub fn new(candidates: Vec<ReducedCandidate>) -> Self {
        Self { candidates }
    }

    pub fn candidates(&self) -> &[ReducedCandidate] {
        &self.candidates
    }

    /// Score every candidate against `posterior` obtained under `prior`.
    pub fn compare(&self, prior: &Prior, posterior: &Posterior) -> Result<ModelComparison> {
        let pe = prior.mean.to_vector();
        let qe = posterior.mean.to_vector();
        let reduced = self
            .candidates
            .iter()
            .map(|c| c.reduced_covariance(&prior.covariance))
            .collect::<Result<Vec<_>>>()?;

        let raw = reduce_all(&qe, &posterior.covariance, &pe, &prior.covariance, &reduced)?;
        let normalized = normalize_evidence(&raw);
        let probs = posterior_probabilities(&raw)?;

        let scores: Vec<CandidateScore> = self
            .candidates
            .iter()
            .zip(raw.iter().zip(normalized.iter().zip(probs.iter())))
            .map(|(c, (&log_evidence, (&free_energy, &probability)))| CandidateScore {
                name: c.name.clone(),
                fixed: c.fixed,
                log_evidence,
                free_energy,
                probability,
            })
            .collect();

        let best = scores
            .iter()
            .max_by(|a, b| a.probability.total_cmp(&b.probability))
            .map(|s| s.name.clone())
            .unwrap_or_default();
        log::debug!("model comparison: best candidate '{best}'");

        Ok(ModelComparison { scores, best })
    }
}
