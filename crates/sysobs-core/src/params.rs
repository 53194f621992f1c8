//! Fixed-shape parameter record for the two-channel generative model.
//!
//! Every parameter vector in the pipeline (true parameters, prior mean,
//! posterior mean, prior variances) is a [`ParameterSet`]. Covariances are
//! dense matrices indexed in [`Param::ALL`] order. Reduced hypotheses are
//! [`ParamMask`]s naming the parameters they fix.

use std::fmt;
use std::str::FromStr;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SysobsError};

// ---------------------------------------------------------------------------
// Parameter enumeration
// ---------------------------------------------------------------------------

/// Named scalar parameters of the generative model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Param {
    /// Latent decay rate shared by both channels.
    A,
    /// Cross-coupling between the two latent processes.
    B,
    /// Gain of the exogenous driver.
    C,
    /// Observation gain shared by both channels.
    K,
    /// Channel-2 decay offset (system asymmetry).
    Da,
    /// Channel-2 observation gain offset (observer asymmetry).
    Dk,
    /// Observation noise std of channel 1.
    S1,
    /// Observation noise std of channel 2.
    S2,
}

impl Param {
    /// All parameters in vector/matrix index order.
    pub const ALL: [Param; 8] = [
        Param::A,
        Param::B,
        Param::C,
        Param::K,
        Param::Da,
        Param::Dk,
        Param::S1,
        Param::S2,
    ];

    /// Number of parameters.
    pub const COUNT: usize = Self::ALL.len();

    /// Position of this parameter in vectors and covariance matrices.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Param::A => "a",
            Param::B => "b",
            Param::C => "c",
            Param::K => "k",
            Param::Da => "da",
            Param::Dk => "dk",
            Param::S1 => "s1",
            Param::S2 => "s2",
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Param {
    type Err = SysobsError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        Param::ALL
            .into_iter()
            .find(|p| p.name() == lower)
            .ok_or_else(|| SysobsError::invalid(format!("unknown parameter '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Parameter record
// ---------------------------------------------------------------------------

/// One scalar per [`Param`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ParameterSet {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub k: f64,
    pub da: f64,
    pub dk: f64,
    pub s1: f64,
    pub s2: f64,
}

impl ParameterSet {
    /// Every field set to `value`.
    pub fn splat(value: f64) -> Self {
        Self {
            a: value,
            b: value,
            c: value,
            k: value,
            da: value,
            dk: value,
            s1: value,
            s2: value,
        }
    }

    pub fn get(&self, param: Param) -> f64 {
        match param {
            Param::A => self.a,
            Param::B => self.b,
            Param::C => self.c,
            Param::K => self.k,
            Param::Da => self.da,
            Param::Dk => self.dk,
            Param::S1 => self.s1,
            Param::S2 => self.s2,
        }
    }

    pub fn set(&mut self, param: Param, value: f64) {
        let slot = match param {
            Param::A => &mut self.a,
            Param::B => &mut self.b,
            Param::C => &mut self.c,
            Param::K => &mut self.k,
            Param::Da => &mut self.da,
            Param::Dk => &mut self.dk,
            Param::S1 => &mut self.s1,
            Param::S2 => &mut self.s2,
        };
        *slot = value;
    }

    /// Builder-style [`ParameterSet::set`].
    pub fn with(mut self, param: Param, value: f64) -> Self {
        self.set(param, value);
        self
    }

    /// Column vector in [`Param::ALL`] order.
    pub fn to_vector(&self) -> DVector<f64> {
        DVector::from_iterator(Param::COUNT, Param::ALL.iter().map(|&p| self.get(p)))
    }

    /// Inverse of [`ParameterSet::to_vector`].
    pub fn from_vector(v: &DVector<f64>) -> Result<Self> {
        if v.len() != Param::COUNT {
            return Err(SysobsError::dimension("parameter vector", Param::COUNT, v.len()));
        }
        let mut set = Self::default();
        for p in Param::ALL {
            set.set(p, v[p.index()]);
        }
        Ok(set)
    }

    /// Diagonal covariance with `self` as the variances.
    pub fn to_diagonal_covariance(&self) -> DMatrix<f64> {
        DMatrix::from_diagonal(&self.to_vector())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Param, f64)> + '_ {
        Param::ALL.into_iter().map(move |p| (p, self.get(p)))
    }
}

// ---------------------------------------------------------------------------
// Masks and reduced candidates
// ---------------------------------------------------------------------------

/// A set of parameters, stored as a bitmask over [`Param::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Param>", into = "Vec<Param>")]
pub struct ParamMask(u16);

impl ParamMask {
    pub const EMPTY: ParamMask = ParamMask(0);

    pub fn of(params: &[Param]) -> Self {
        params.iter().fold(Self::EMPTY, |m, &p| m.with(p))
    }

    pub fn with(self, param: Param) -> Self {
        Self(self.0 | (1 << param.index()))
    }

    pub fn contains(self, param: Param) -> bool {
        self.0 & (1 << param.index()) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn params(self) -> Vec<Param> {
        Param::ALL.into_iter().filter(|&p| self.contains(p)).collect()
    }
}

impl From<Vec<Param>> for ParamMask {
    fn from(params: Vec<Param>) -> Self {
        Self::of(&params)
    }
}

impl From<ParamMask> for Vec<Param> {
    fn from(mask: ParamMask) -> Self {
        mask.params()
    }
}

impl fmt::Display for ParamMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("{}");
        }
        let names: Vec<&str> = self.params().into_iter().map(Param::name).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

/// A named reduced-prior hypothesis: the parameters in `fixed` are held at
/// their prior mean (zero prior variance) instead of being estimated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReducedCandidate {
    pub name: String,
    pub fixed: ParamMask,
}

impl ReducedCandidate {
    pub fn new(name: impl Into<String>, fixed: &[Param]) -> Self {
        Self {
            name: name.into(),
            fixed: ParamMask::of(fixed),
        }
    }

    /// The four structural hypotheses compared per inversion:
    ///
    /// - `full`: both channel offsets free
    /// - `system`: only the dynamics offset `da` free
    /// - `observer`: only the observation offset `dk` free
    /// - `null`: neither offset free
    pub fn standard_set() -> Vec<ReducedCandidate> {
        vec![
            ReducedCandidate::new("full", &[]),
            ReducedCandidate::new("system", &[Param::Dk]),
            ReducedCandidate::new("observer", &[Param::Da]),
            ReducedCandidate::new("null", &[Param::Da, Param::Dk]),
        ]
    }

    /// Copy of `prior_cov` with the rows and columns of every fixed
    /// parameter zeroed.
    pub fn reduced_covariance(&self, prior_cov: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        if prior_cov.nrows() != Param::COUNT || prior_cov.ncols() != Param::COUNT {
            return Err(SysobsError::dimension(
                "prior covariance",
                Param::COUNT,
                prior_cov.nrows().max(prior_cov.ncols()),
            ));
        }
        let mut reduced = prior_cov.clone();
        for p in self.fixed.params() {
            let i = p.index();
            reduced.row_mut(i).fill(0.0);
            reduced.column_mut(i).fill(0.0);
        }
        Ok(reduced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_index_matches_all_order() {
        for (i, p) in Param::ALL.iter().enumerate() {
            assert_eq!(p.index(), i);
        }
    }

    #[test]
    fn test_param_from_str() {
        assert_eq!("dk".parse::<Param>().unwrap(), Param::Dk);
        assert_eq!(" S1 ".parse::<Param>().unwrap(), Param::S1);
        assert!("gamma".parse::<Param>().is_err());
    }

    #[test]
    fn test_vector_roundtrip_preserves_fields() {
        let set = ParameterSet::splat(0.0)
            .with(Param::A, 1.5)
            .with(Param::Dk, -0.25);
        let v = set.to_vector();
        assert_eq!(v[Param::A.index()], 1.5);
        assert_eq!(v[Param::Dk.index()], -0.25);
        assert_eq!(ParameterSet::from_vector(&v).unwrap(), set);
    }

    #[test]
    fn test_from_vector_rejects_wrong_length() {
        let v = DVector::from_element(3, 0.0);
        assert!(matches!(
            ParameterSet::from_vector(&v),
            Err(SysobsError::DimensionMismatch { expected: 8, found: 3, .. })
        ));
    }

    #[test]
    fn test_mask_membership() {
        let m = ParamMask::of(&[Param::Da, Param::Dk]);
        assert!(m.contains(Param::Da));
        assert!(m.contains(Param::Dk));
        assert!(!m.contains(Param::A));
        assert_eq!(m.len(), 2);
        assert_eq!(m.to_string(), "{da, dk}");
        assert!(ParamMask::EMPTY.is_empty());
    }

    #[test]
    fn test_mask_serializes_as_names() {
        let m = ParamMask::of(&[Param::Dk]);
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, r#"["dk"]"#);
        let back: ParamMask = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn test_standard_set_names_and_masks() {
        let set = ReducedCandidate::standard_set();
        let names: Vec<&str> = set.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["full", "system", "observer", "null"]);
        assert!(set[0].fixed.is_empty());
        assert!(set[1].fixed.contains(Param::Dk) && !set[1].fixed.contains(Param::Da));
        assert!(set[2].fixed.contains(Param::Da) && !set[2].fixed.contains(Param::Dk));
        assert_eq!(set[3].fixed.len(), 2);
    }

    #[test]
    fn test_reduced_covariance_zeroes_fixed_entries() {
        let pc = ParameterSet::splat(0.5).to_diagonal_covariance();
        let rc = ReducedCandidate::new("null", &[Param::Da, Param::Dk])
            .reduced_covariance(&pc)
            .unwrap();
        assert_eq!(rc[(Param::Da.index(), Param::Da.index())], 0.0);
        assert_eq!(rc[(Param::Dk.index(), Param::Dk.index())], 0.0);
        assert_eq!(rc[(Param::A.index(), Param::A.index())], 0.5);
    }

    #[test]
    fn test_reduced_covariance_rejects_wrong_shape() {
        let pc = DMatrix::<f64>::identity(3, 3);
        let err = ReducedCandidate::new("x", &[]).reduced_covariance(&pc);
        assert!(matches!(err, Err(SysobsError::DimensionMismatch { .. })));
    }
}
