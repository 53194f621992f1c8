pub mod batch;
pub mod driver;
pub mod reduce;
pub mod simulate;

use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use sysobs_core::{ExperimentConfig, ModelComparison, Smoothing};

/// Load the experiment config, or defaults when no path is given.
/// Exits on a missing or invalid file.
pub fn load_config(path: Option<&str>) -> ExperimentConfig {
    match path {
        Some(path) => match ExperimentConfig::load(Path::new(path)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config {path}: {e}");
                std::process::exit(1);
            }
        },
        None => ExperimentConfig::default(),
    }
}

/// Unwrap a core result or print the error and exit.
pub fn or_exit<T>(result: sysobs_core::Result<T>, what: &str) -> T {
    match result {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error {what}: {e}");
            std::process::exit(1);
        }
    }
}

/// Parse a smoothing mode string into the enum.
pub fn parse_smoothing(kind: &str, window: usize) -> Smoothing {
    match kind {
        "none" | "off" => Smoothing::None,
        "mean" | "moving_mean" | "boxcar" => Smoothing::MovingMean { window },
        "gaussian" | "gauss" => Smoothing::Gaussian { window },
        _ => {
            eprintln!("Unknown smoothing mode '{kind}', using mean");
            Smoothing::MovingMean { window }
        }
    }
}

/// Parse a comma-separated list, ignoring empty items.
pub fn parse_list<T>(s: &str) -> Result<Vec<T>, String>
where
    T: FromStr,
    T::Err: Display,
{
    s.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| item.parse::<T>().map_err(|e| format!("'{item}': {e}")))
        .collect()
}

/// Seeded RNG for reproducible runs.
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Write pretty JSON to `path`, reporting the outcome on the console.
pub fn write_json<T: Serialize>(path: &str, value: &T) {
    let json = match serde_json::to_string_pretty(value) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Failed to serialize results: {e}");
            return;
        }
    };
    match std::fs::write(path, json) {
        Ok(()) => println!("\nResults written to {path}"),
        Err(e) => eprintln!("\nFailed to write {path}: {e}"),
    }
}

/// Render equal-length columns as CSV with a `sample` index column.
pub fn columns_to_csv(header: &[&str], columns: &[&[f64]]) -> String {
    let rows = columns.iter().map(|c| c.len()).min().unwrap_or(0);
    let mut out = String::from("sample");
    for name in header {
        out.push(',');
        out.push_str(name);
    }
    out.push('\n');
    for i in 0..rows {
        out.push_str(&(i + 1).to_string());
        for col in columns {
            out.push(',');
            out.push_str(&col[i].to_string());
        }
        out.push('\n');
    }
    out
}

/// Write columns as CSV when `path` ends in `.csv`, otherwise `value` as
/// JSON.
pub fn write_output<T: Serialize>(path: &str, header: &[&str], columns: &[&[f64]], value: &T) {
    if path.ends_with(".csv") {
        match std::fs::write(path, columns_to_csv(header, columns)) {
            Ok(()) => println!("\nSamples written to {path}"),
            Err(e) => eprintln!("\nFailed to write {path}: {e}"),
        }
    } else {
        write_json(path, value);
    }
}

/// Print a candidate table for one comparison.
pub fn print_comparison(comparison: &ModelComparison) {
    println!("{}", "=".repeat(60));
    println!(
        "{:<12} {:<16} {:>10} {:>10} {:>8}",
        "Candidate", "Fixed", "ln ΔF", "F - min", "P"
    );
    println!("{}", "-".repeat(60));
    for s in &comparison.scores {
        let marker = if s.name == comparison.best { "*" } else { " " };
        println!(
            "{:<12} {:<16} {:>10.3} {:>10.3} {:>7.3}{}",
            s.name,
            s.fixed.to_string(),
            s.log_evidence,
            s.free_energy,
            s.probability,
            marker
        );
    }
    println!("\nBest: {}", comparison.best);
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // parse_smoothing tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_parse_smoothing_modes() {
        assert_eq!(parse_smoothing("none", 5), Smoothing::None);
        assert_eq!(
            parse_smoothing("mean", 7),
            Smoothing::MovingMean { window: 7 }
        );
        assert_eq!(
            parse_smoothing("gaussian", 9),
            Smoothing::Gaussian { window: 9 }
        );
    }

    #[test]
    fn test_parse_smoothing_unknown_falls_back_to_mean() {
        assert_eq!(
            parse_smoothing("median", 5),
            Smoothing::MovingMean { window: 5 }
        );
    }

    // -----------------------------------------------------------------------
    // parse_list tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_parse_list_levels() {
        assert_eq!(parse_list::<i32>("4, 6,8,").unwrap(), vec![4, 6, 8]);
        assert!(parse_list::<i32>("4,x").is_err());
        assert!(parse_list::<i32>("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_list_subjects() {
        let subjects: Vec<String> = parse_list("s01,s02").unwrap();
        assert_eq!(subjects, vec!["s01", "s02"]);
    }

    // -----------------------------------------------------------------------
    // CSV output tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_columns_to_csv() {
        let csv = columns_to_csv(&["u", "y"], &[&[0.5, 1.0], &[2.0, -1.5]]);
        assert_eq!(csv, "sample,u,y\n1,0.5,2\n2,1,-1.5\n");
    }

    #[test]
    fn test_load_config_defaults_without_path() {
        assert_eq!(load_config(None), ExperimentConfig::default());
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        use rand::Rng;
        let a: u64 = seeded_rng(9).random();
        let b: u64 = seeded_rng(9).random();
        assert_eq!(a, b);
    }
}
