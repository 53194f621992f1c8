//! `sysobs reduce`: score reduced models against one persisted inversion.

use std::path::Path;

use sysobs_core::{InversionRecord, ModelReducer, RecordKey, ResultStore};

pub struct ReduceCommandConfig<'a> {
    pub config_path: Option<&'a str>,
    pub record: Option<&'a str>,
    pub store: &'a str,
    pub subject: Option<&'a str>,
    pub log_precision: Option<i32>,
    pub output: Option<&'a str>,
}

/// Read an inversion record from a JSON file.
pub fn read_record(path: &str) -> Result<InversionRecord, String> {
    let text = std::fs::read_to_string(path).map_err(|e| format!("reading {path}: {e}"))?;
    serde_json::from_str(&text).map_err(|e| format!("parsing {path}: {e}"))
}

pub fn run(cmd: ReduceCommandConfig) {
    let config = super::load_config(cmd.config_path);

    let record = match (cmd.record, cmd.subject, cmd.log_precision) {
        (Some(path), _, _) => read_record(path).unwrap_or_else(|e| {
            eprintln!("Error {e}");
            std::process::exit(1);
        }),
        (None, Some(subject), Some(lp)) => {
            let store = ResultStore::new(Path::new(cmd.store));
            super::or_exit(store.require(&RecordKey::new(subject, lp)), "loading record")
        }
        _ => {
            eprintln!("Specify --record <file>, or --subject and --log-precision with --store.");
            std::process::exit(1);
        }
    };

    println!(
        "Record: {} @ lp {} (engine '{}', sysobs {})",
        record.key.subject, record.key.log_precision, record.engine, record.sysobs_version
    );
    println!();

    let reducer = ModelReducer::new(config.candidates);
    let comparison = super::or_exit(
        reducer.compare(&record.prior, &record.posterior),
        "reducing models",
    );
    super::print_comparison(&comparison);

    if let Some(path) = cmd.output {
        super::write_json(path, &comparison);
    }
}
