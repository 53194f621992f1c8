//! `sysobs batch`: model comparison over every subject and noise level in a
//! result store.

use sysobs_core::{BatchReport, ModelReducer, RecordKey, ResultStore, compare_batch};

pub struct BatchCommandConfig<'a> {
    pub config_path: Option<&'a str>,
    pub store: &'a str,
    pub subjects: Option<&'a str>,
    pub levels: Option<&'a str>,
    pub output: Option<&'a str>,
}

/// Subjects from the flag, then the config, then whatever the store holds.
fn resolve_subjects(flag: Option<&str>, configured: &[String], keys: &[RecordKey]) -> Vec<String> {
    if let Some(list) = flag {
        return super::parse_list(list).unwrap_or_else(|e: String| {
            eprintln!("Invalid --subjects: {e}");
            std::process::exit(1);
        });
    }
    if !configured.is_empty() {
        return configured.to_vec();
    }
    let mut subjects: Vec<String> = keys.iter().map(|k| k.subject.clone()).collect();
    subjects.dedup();
    subjects
}

pub fn run(cmd: BatchCommandConfig) {
    let config = super::load_config(cmd.config_path);
    let store = ResultStore::new(cmd.store);
    let keys = super::or_exit(store.keys(), "listing store");

    let subjects = resolve_subjects(cmd.subjects, &config.subjects, &keys);
    let levels: Vec<i32> = match cmd.levels {
        Some(list) => super::parse_list(list).unwrap_or_else(|e| {
            eprintln!("Invalid --levels: {e}");
            std::process::exit(1);
        }),
        None => config.noise_levels.clone(),
    };
    if subjects.is_empty() || levels.is_empty() {
        println!("Nothing to compare in {}", cmd.store);
        println!("Pass --subjects and --levels, or list them in the config file.");
        return;
    }

    println!(
        "Comparing {} subject(s) x {} level(s) from {}\n",
        subjects.len(),
        levels.len(),
        cmd.store
    );
    let reducer = ModelReducer::new(config.candidates);
    let report = compare_batch(&store, &reducer, &subjects, &levels);
    print_report(&report);

    if let Some(path) = cmd.output {
        super::write_json(path, &report);
    }
}

fn print_report(report: &BatchReport) {
    let width = 14 + report.candidates.len() * 18;
    println!("{}", "=".repeat(width));
    print!("{:<6} {:>6} ", "lp", "n");
    for name in &report.candidates {
        print!(" {name:>17}");
    }
    println!();
    println!("{}", "-".repeat(width));
    for level in report.by_level() {
        print!("{:<6} {:>6} ", level.log_precision, level.subjects);
        for (p, wins) in level.mean_probability.iter().zip(&level.wins) {
            print!(" {:>10.3} ({:>4})", p, wins);
        }
        println!();
    }
    println!("\nMean posterior probability per candidate (wins in parentheses).");

    let missing = report.missing();
    if !missing.is_empty() {
        println!("\nMissing records ({}):", missing.len());
        for key in missing {
            println!("  {} @ lp {}", key.subject, key.log_precision);
        }
    }
    let failed = report.failed();
    if !failed.is_empty() {
        println!("\nFailed ({}):", failed.len());
        for (key, reason) in failed {
            println!("  {} @ lp {}: {reason}", key.subject, key.log_precision);
        }
    }
}
