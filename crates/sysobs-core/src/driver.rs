//! Exogenous driver synthesis.
//!
//! A driver is a piecewise-constant "scene" signal (one uniform draw in
//! [-1, 1] per scene) plus Gaussian noise, smoothed by a centered moving
//! window. Randomness comes exclusively from the caller's RNG, so the same
//! seed, sample count, scene source and config always yield the same driver.

use rand::Rng;
use rand_distr::{Distribution, Normal, StandardNormal};
use serde::{Deserialize, Serialize};
use statrs::distribution::Continuous;

use crate::error::{Result, SysobsError};
use crate::scenes::{ScenePartition, SceneSource};

/// Smoothing applied to the noisy scene signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Smoothing {
    None,
    /// Unweighted centered moving mean.
    MovingMean { window: usize },
    /// Gaussian-weighted centered moving mean, σ = window / 5.
    Gaussian { window: usize },
}

impl Default for Smoothing {
    fn default() -> Self {
        Smoothing::MovingMean { window: 5 }
    }
}

/// Driver synthesis settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Std of the additive sample noise.
    pub noise_std: f64,
    pub smoothing: Smoothing,
    /// Append an independent standard-normal channel as a second row.
    pub noise_channel: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            noise_std: 0.5,
            smoothing: Smoothing::default(),
            noise_channel: false,
        }
    }
}

/// A synthesized driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub partition: ScenePartition,
    /// Piecewise-constant scene values before noise and smoothing.
    pub base: Vec<f64>,
    /// Final smoothed signal (first input row).
    pub signal: Vec<f64>,
    /// Optional pure-noise second row.
    pub noise_channel: Option<Vec<f64>>,
}

impl Driver {
    pub fn len(&self) -> usize {
        self.signal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signal.is_empty()
    }

    /// Input rows: the signal, then the noise channel when present.
    pub fn rows(&self) -> Vec<&[f64]> {
        let mut rows = vec![self.signal.as_slice()];
        if let Some(noise) = &self.noise_channel {
            rows.push(noise.as_slice());
        }
        rows
    }

    /// 1-based sample numbers where the base signal changes value.
    pub fn change_points(&self) -> Vec<usize> {
        self.base
            .windows(2)
            .enumerate()
            .filter(|(_, w)| w[0] != w[1])
            .map(|(i, _)| i + 2)
            .collect()
    }
}

/// Synthesize a driver of `samples` samples.
///
/// Draw order is fixed: one uniform per scene, then one noise draw per
/// sample, then the optional noise channel.
pub fn synthesize<R: Rng>(
    samples: usize,
    source: &SceneSource,
    config: &DriverConfig,
    rng: &mut R,
) -> Result<Driver> {
    let partition = ScenePartition::new(samples, source)?;
    let noise = Normal::new(0.0, config.noise_std).map_err(|e| {
        SysobsError::invalid(format!("driver noise std {}: {e}", config.noise_std))
    })?;

    let base = scene_signal(&partition, rng);
    let noisy: Vec<f64> = base.iter().map(|&v| v + noise.sample(rng)).collect();
    let signal = smooth(&noisy, config.smoothing)?;

    let noise_channel = config.noise_channel.then(|| {
        (0..samples)
            .map(|_| rng.sample::<f64, _>(StandardNormal))
            .collect()
    });

    log::debug!(
        "synthesized driver: {} samples, {} scenes, noise channel: {}",
        samples,
        partition.scene_count(),
        config.noise_channel
    );

    Ok(Driver {
        partition,
        base,
        signal,
        noise_channel,
    })
}

/// One uniform draw in [-1, 1] per scene, held constant across the scene.
pub fn scene_signal<R: Rng>(partition: &ScenePartition, rng: &mut R) -> Vec<f64> {
    let mut base = vec![0.0; partition.samples()];
    for range in partition.scene_ranges() {
        let value: f64 = rng.random_range(-1.0..=1.0);
        base[range].fill(value);
    }
    base
}

/// Centered moving-window smoothing with shrinking edges.
///
/// Even windows reach one sample further back than forward. Near the ends
/// only in-bounds samples contribute and weights are renormalized.
pub fn smooth(signal: &[f64], smoothing: Smoothing) -> Result<Vec<f64>> {
    let (window, weights) = match smoothing {
        Smoothing::None => return Ok(signal.to_vec()),
        Smoothing::MovingMean { window } => (window, None),
        Smoothing::Gaussian { window } => (window, Some(gaussian_weights(window)?)),
    };
    if window == 0 {
        return Err(SysobsError::invalid("smoothing window must be at least 1"));
    }
    let before = window / 2;
    let after = (window - 1) / 2;
    let n = signal.len();

    let out = (0..n)
        .map(|i| {
            let lo = i.saturating_sub(before);
            let hi = (i + after).min(n.saturating_sub(1));
            let mut acc = 0.0;
            let mut norm = 0.0;
            for (j, &x) in signal.iter().enumerate().take(hi + 1).skip(lo) {
                // offset into the kernel, which starts `before` samples back
                let w = weights.as_ref().map_or(1.0, |w: &Vec<f64>| w[j + before - i]);
                acc += w * x;
                norm += w;
            }
            acc / norm
        })
        .collect();
    Ok(out)
}

fn gaussian_weights(window: usize) -> Result<Vec<f64>> {
    if window == 0 {
        return Err(SysobsError::invalid("smoothing window must be at least 1"));
    }
    let sigma = window as f64 / 5.0;
    let kernel = statrs::distribution::Normal::new(0.0, sigma)
        .map_err(|e| SysobsError::invalid(format!("gaussian kernel: {e}")))?;
    let before = (window / 2) as f64;
    Ok((0..window).map(|k| kernel.pdf(k as f64 - before)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rng(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    #[test]
    fn test_scene_signal_is_piecewise_constant() {
        let src = SceneSource::Boundaries {
            starts: vec![251, 501, 1000],
        };
        let p = ScenePartition::new(1000, &src).unwrap();
        let base = scene_signal(&p, &mut rng(7));
        for range in p.scene_ranges() {
            let first = base[range.start];
            assert!((-1.0..=1.0).contains(&first));
            assert!(base[range].iter().all(|&v| v == first));
        }
    }

    #[test]
    fn test_change_points_at_boundaries() {
        let src = SceneSource::Boundaries {
            starts: vec![251, 501, 1000],
        };
        let d = synthesize(1000, &src, &DriverConfig::default(), &mut rng(3)).unwrap();
        assert_eq!(d.change_points(), vec![251, 501, 1000]);
    }

    #[test]
    fn test_same_seed_same_driver() {
        let src = SceneSource::Uniform { scenes: 8 };
        let cfg = DriverConfig {
            noise_channel: true,
            ..Default::default()
        };
        let a = synthesize(500, &src, &cfg, &mut rng(42)).unwrap();
        let b = synthesize(500, &src, &cfg, &mut rng(42)).unwrap();
        assert_eq!(a, b);
        let c = synthesize(500, &src, &cfg, &mut rng(43)).unwrap();
        assert_ne!(a.signal, c.signal);
    }

    #[test]
    fn test_noise_channel_adds_second_row() {
        let src = SceneSource::Uniform { scenes: 4 };
        let plain = synthesize(200, &src, &DriverConfig::default(), &mut rng(1)).unwrap();
        assert_eq!(plain.rows().len(), 1);
        assert!(plain.noise_channel.is_none());

        let cfg = DriverConfig {
            noise_channel: true,
            ..Default::default()
        };
        let two = synthesize(200, &src, &cfg, &mut rng(1)).unwrap();
        assert_eq!(two.rows().len(), 2);
        assert_eq!(two.rows()[1].len(), 200);
        // The noise channel is drawn last, so the first row is unchanged.
        assert_eq!(plain.signal, two.signal);
    }

    #[test]
    fn test_single_scene_driver() {
        let src = SceneSource::CutTimes {
            times: vec![],
            rate: 100.0,
        };
        let d = synthesize(100, &src, &DriverConfig::default(), &mut rng(9)).unwrap();
        assert_eq!(d.partition.scene_count(), 1);
        assert!(d.change_points().is_empty());
        assert_eq!(d.len(), 100);
    }

    #[test]
    fn test_synthesize_rejects_degenerate_input() {
        let src = SceneSource::Uniform { scenes: 1 };
        assert!(synthesize(1, &src, &DriverConfig::default(), &mut rng(0)).is_err());

        let cfg = DriverConfig {
            noise_std: -1.0,
            ..Default::default()
        };
        assert!(synthesize(10, &src, &cfg, &mut rng(0)).is_err());
    }

    #[test]
    fn test_no_smoothing_keeps_noisy_signal() {
        let src = SceneSource::Uniform { scenes: 2 };
        let cfg = DriverConfig {
            noise_std: 0.0,
            smoothing: Smoothing::None,
            noise_channel: false,
        };
        let d = synthesize(50, &src, &cfg, &mut rng(5)).unwrap();
        assert_eq!(d.signal, d.base);
    }

    #[test]
    fn test_moving_mean_interior_and_edges() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let y = smooth(&x, Smoothing::MovingMean { window: 5 }).unwrap();
        // edges shrink: mean(1,2,3), mean(1,2,3,4)
        assert!((y[0] - 2.0).abs() < 1e-12);
        assert!((y[1] - 2.5).abs() < 1e-12);
        assert!((y[3] - 4.0).abs() < 1e-12);
        assert!((y[6] - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_moving_mean_even_window() {
        let x = [0.0, 10.0, 20.0, 30.0];
        let y = smooth(&x, Smoothing::MovingMean { window: 2 }).unwrap();
        assert_eq!(y, vec![0.0, 5.0, 15.0, 25.0]);
    }

    #[test]
    fn test_window_of_one_is_identity() {
        let x = [3.0, -1.0, 2.0];
        for s in [
            Smoothing::MovingMean { window: 1 },
            Smoothing::Gaussian { window: 1 },
        ] {
            assert_eq!(smooth(&x, s).unwrap(), x.to_vec());
        }
    }

    #[test]
    fn test_zero_window_rejected() {
        assert!(smooth(&[1.0], Smoothing::MovingMean { window: 0 }).is_err());
        assert!(smooth(&[1.0], Smoothing::Gaussian { window: 0 }).is_err());
    }

    #[test]
    fn test_gaussian_preserves_constant_and_symmetry() {
        let flat = vec![2.5; 20];
        let y = smooth(&flat, Smoothing::Gaussian { window: 5 }).unwrap();
        assert!(y.iter().all(|v| (v - 2.5).abs() < 1e-12));

        let mut spike = vec![0.0; 11];
        spike[5] = 1.0;
        let y = smooth(&spike, Smoothing::Gaussian { window: 5 }).unwrap();
        assert!((y[4] - y[6]).abs() < 1e-12);
        assert!(y[5] > y[4] && y[4] > y[3]);
        assert_eq!(y[2], 0.0);
    }
}
