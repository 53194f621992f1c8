//! `sysobs driver`: synthesize a naturalistic driver signal.

use std::path::Path;

use sysobs_core::{ExperimentConfig, SceneSource, load_scene_cuts, synthesize};

pub struct DriverCommandConfig<'a> {
    pub config_path: Option<&'a str>,
    pub samples: Option<usize>,
    pub rate: Option<f64>,
    pub cuts: Option<&'a str>,
    pub scenes: Option<usize>,
    pub smoothing: Option<&'a str>,
    pub window: usize,
    pub noise_channel: bool,
    pub seed: Option<u64>,
    pub output: Option<&'a str>,
}

/// Apply command-line overrides to the loaded config.
pub fn resolve(cmd: &DriverCommandConfig) -> ExperimentConfig {
    let mut config = super::load_config(cmd.config_path);
    if let Some(samples) = cmd.samples {
        config.samples = samples;
    }
    if let Some(rate) = cmd.rate {
        config.rate = rate;
    }
    if let Some(path) = cmd.cuts {
        let times = super::or_exit(load_scene_cuts(Path::new(path)), "reading scene cuts");
        config.scenes = SceneSource::CutTimes {
            times,
            rate: config.rate,
        };
    } else if let Some(scenes) = cmd.scenes {
        config.scenes = SceneSource::Uniform { scenes };
    }
    if let Some(kind) = cmd.smoothing {
        config.driver.smoothing = super::parse_smoothing(kind, cmd.window);
    }
    if cmd.noise_channel {
        config.driver.noise_channel = true;
    }
    if let Some(seed) = cmd.seed {
        config.seed = seed;
    }
    config
}

pub fn run(cmd: DriverCommandConfig) {
    let config = resolve(&cmd);
    let mut rng = super::seeded_rng(config.seed);
    let driver = super::or_exit(
        synthesize(config.samples, &config.scenes, &config.driver, &mut rng),
        "synthesizing driver",
    );

    println!(
        "Driver: {} samples @ {} Hz, {} scene(s), seed {}",
        driver.len(),
        config.rate,
        driver.partition.scene_count(),
        config.seed
    );
    println!("  boundaries:  {:?}", driver.partition.boundaries());
    let (lo, hi) = driver
        .signal
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    println!("  signal range: [{lo:.3}, {hi:.3}]");
    if driver.noise_channel.is_some() {
        println!("  noise channel: yes");
    }

    if let Some(path) = cmd.output {
        let mut header = vec!["base", "signal"];
        let mut columns = vec![driver.base.as_slice(), driver.signal.as_slice()];
        if let Some(noise) = &driver.noise_channel {
            header.push("noise");
            columns.push(noise);
        }
        super::write_output(path, &header, &columns, &driver);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sysobs_core::Smoothing;

    fn cmd() -> DriverCommandConfig<'static> {
        DriverCommandConfig {
            config_path: None,
            samples: None,
            rate: None,
            cuts: None,
            scenes: None,
            smoothing: None,
            window: 5,
            noise_channel: false,
            seed: None,
            output: None,
        }
    }

    #[test]
    fn test_resolve_without_flags_keeps_defaults() {
        assert_eq!(resolve(&cmd()), ExperimentConfig::default());
    }

    #[test]
    fn test_resolve_overrides() {
        let c = resolve(&DriverCommandConfig {
            samples: Some(500),
            scenes: Some(3),
            smoothing: Some("gaussian"),
            window: 9,
            noise_channel: true,
            seed: Some(12),
            ..cmd()
        });
        assert_eq!(c.samples, 500);
        assert_eq!(c.scenes, SceneSource::Uniform { scenes: 3 });
        assert_eq!(c.driver.smoothing, Smoothing::Gaussian { window: 9 });
        assert!(c.driver.noise_channel);
        assert_eq!(c.seed, 12);
    }

    #[test]
    fn test_cut_file_uses_rate() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("cuts.csv");
        std::fs::write(&path, "1.0\n2.0\n").unwrap();
        let path = path.to_string_lossy().into_owned();
        let c = resolve(&DriverCommandConfig {
            rate: Some(50.0),
            cuts: Some(&path),
            scenes: Some(4),
            ..cmd()
        });
        assert_eq!(
            c.scenes,
            SceneSource::CutTimes {
                times: vec![1.0, 2.0],
                rate: 50.0
            }
        );
    }
}
