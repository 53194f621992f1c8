//! Scene partitions for the driver signal.
//!
//! Boundaries are 1-based sample numbers. A partition of `n` samples always
//! starts at 1 and ends with the exclusive sentinel `n + 1`; scene `i` covers
//! samples `boundaries[i] .. boundaries[i + 1]`.

use std::fs;
use std::ops::Range;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SysobsError};

/// Where the scene boundaries of a driver come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SceneSource {
    /// Scene-cut times in seconds, sampled at `rate` Hz. Cuts that do not
    /// land strictly inside `(1, n)` are dropped.
    CutTimes { times: Vec<f64>, rate: f64 },
    /// `scenes` evenly spaced scenes.
    Uniform { scenes: usize },
    /// Explicit interior boundaries (1-based sample numbers in `2..=n`).
    Boundaries { starts: Vec<usize> },
}

impl Default for SceneSource {
    fn default() -> Self {
        SceneSource::Uniform { scenes: 8 }
    }
}

/// Strictly increasing scene boundaries covering samples `1..=n`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenePartition {
    samples: usize,
    boundaries: Vec<usize>,
}

impl ScenePartition {
    /// Resolve `source` into a partition of `samples` samples.
    pub fn new(samples: usize, source: &SceneSource) -> Result<Self> {
        if samples <= 1 {
            return Err(SysobsError::invalid(format!(
                "driver needs at least 2 samples, got {samples}"
            )));
        }
        let interior = match source {
            SceneSource::CutTimes { times, rate } => cut_samples(samples, times, *rate)?,
            SceneSource::Uniform { scenes } => uniform_interior(samples, *scenes)?,
            SceneSource::Boundaries { starts } => {
                if let Some(&bad) = starts.iter().find(|&&s| s < 2 || s > samples) {
                    return Err(SysobsError::invalid(format!(
                        "scene boundary {bad} outside 2..={samples}"
                    )));
                }
                starts.clone()
            }
        };
        Ok(Self::from_interior(samples, interior))
    }

    fn from_interior(samples: usize, mut interior: Vec<usize>) -> Self {
        interior.sort_unstable();
        interior.dedup();
        let mut boundaries = Vec::with_capacity(interior.len() + 2);
        boundaries.push(1);
        boundaries.extend(interior);
        boundaries.push(samples + 1);
        Self {
            samples,
            boundaries,
        }
    }

    /// Number of samples covered.
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Boundaries including the leading 1 and the `n + 1` sentinel.
    pub fn boundaries(&self) -> &[usize] {
        &self.boundaries
    }

    pub fn scene_count(&self) -> usize {
        self.boundaries.len() - 1
    }

    /// Zero-based index ranges of each scene, for slicing sample buffers.
    pub fn scene_ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        self.boundaries.windows(2).map(|w| (w[0] - 1)..(w[1] - 1))
    }
}

/// Convert cut times to sample numbers, keeping those strictly inside `(1, n)`.
fn cut_samples(samples: usize, times: &[f64], rate: f64) -> Result<Vec<usize>> {
    if !(rate.is_finite() && rate > 0.0) {
        return Err(SysobsError::invalid(format!(
            "sampling rate must be positive, got {rate}"
        )));
    }
    let mut out = Vec::with_capacity(times.len());
    for &t in times {
        if !t.is_finite() {
            return Err(SysobsError::invalid(format!("non-finite scene cut time {t}")));
        }
        let idx = (t * rate).round();
        if idx > 1.0 && idx < samples as f64 {
            out.push(idx as usize);
        }
    }
    let dropped = times.len() - out.len();
    if dropped > 0 {
        log::debug!("dropped {dropped} scene cut(s) outside (1, {samples})");
    }
    Ok(out)
}

/// Interior boundaries of an even split of `1..=n` into `scenes` pieces.
fn uniform_interior(samples: usize, scenes: usize) -> Result<Vec<usize>> {
    if scenes == 0 {
        return Err(SysobsError::invalid("uniform partition needs at least one scene"));
    }
    let step = samples as f64 / scenes as f64;
    Ok((1..scenes)
        .map(|i| (1.0 + i as f64 * step).round() as usize)
        .filter(|&b| b > 1 && b <= samples)
        .collect())
}

// ---------------------------------------------------------------------------
// Scene-cut files
// ---------------------------------------------------------------------------

/// Parse scene-cut times (seconds), one value per row.
///
/// Blank lines and `#` comments are skipped. The first value of each row
/// counts, separated by comma, semicolon, tab or space. A non-numeric first
/// data row is taken as a header.
pub fn parse_scene_cuts(text: &str) -> Result<Vec<f64>> {
    let mut times = Vec::new();
    let mut seen_row = false;
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let field = line
            .split([',', ';', '\t', ' '])
            .find(|f| !f.is_empty())
            .unwrap_or(line);
        match field.parse::<f64>() {
            Ok(v) => times.push(v),
            Err(_) if !seen_row => {}
            Err(e) => {
                return Err(SysobsError::Parse {
                    line: i + 1,
                    message: format!("'{field}': {e}"),
                });
            }
        }
        seen_row = true;
    }
    Ok(times)
}

/// Read and parse a scene-cut file.
pub fn load_scene_cuts(path: &Path) -> Result<Vec<f64>> {
    let text = fs::read_to_string(path).map_err(|e| SysobsError::io(path, e))?;
    parse_scene_cuts(&text)
}
