//! Persisted inversion results.
//!
//! One JSON file per subject and observation-noise level:
//!
//! ```text
//! <root>/<subject>_lp<log_precision>.json
//! ```
//!
//! Each file holds an [`InversionRecord`]: the prior the inversion ran under
//! and the posterior it produced, which is everything model reduction needs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SysobsError};
use crate::inversion::{InversionEngine, ModelSpec, Posterior, Prior, TimeSeries};

/// Current on-disk record version.
pub const RECORD_VERSION: u32 = 1;

/// Identifies one inversion in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    pub subject: String,
    /// Log-precision of the observation noise the data were generated or
    /// inverted with.
    pub log_precision: i32,
}

impl RecordKey {
    pub fn new(subject: impl Into<String>, log_precision: i32) -> Self {
        Self {
            subject: subject.into(),
            log_precision,
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}_lp{}.json", self.subject, self.log_precision)
    }
}

/// One persisted inversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InversionRecord {
    pub version: u32,
    pub key: RecordKey,
    /// Name of the engine that produced the posterior.
    pub engine: String,
    pub prior: Prior,
    pub posterior: Posterior,
    pub sysobs_version: String,
}

impl InversionRecord {
    pub fn new(key: RecordKey, engine: &str, prior: Prior, posterior: Posterior) -> Self {
        Self {
            version: RECORD_VERSION,
            key,
            engine: engine.to_string(),
            prior,
            posterior,
            sysobs_version: crate::VERSION.to_string(),
        }
    }
}

/// Directory of inversion records.
#[derive(Debug, Clone)]
pub struct ResultStore {
    root: PathBuf,
}

impl ResultStore {
    /// Open a store rooted at `root`. The directory is created on first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &RecordKey) -> PathBuf {
        self.root.join(key.file_name())
    }

    /// Write `record`, replacing any existing record with the same key.
    pub fn save(&self, record: &InversionRecord) -> Result<PathBuf> {
        validate_subject(&record.key.subject)?;
        fs::create_dir_all(&self.root).map_err(|e| SysobsError::io(&self.root, e))?;
        let path = self.path_for(&record.key);
        let json = serde_json::to_string_pretty(record)?;
        fs::write(&path, json).map_err(|e| SysobsError::io(&path, e))?;
        log::debug!("saved inversion record {}", path.display());
        Ok(path)
    }

    /// Load the record for `key`. A missing file is `Ok(None)`; an unreadable
    /// or corrupt one is an error.
    pub fn load(&self, key: &RecordKey) -> Result<Option<InversionRecord>> {
        validate_subject(&key.subject)?;
        let path = self.path_for(key);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SysobsError::io(&path, e)),
        };
        let record: InversionRecord = serde_json::from_str(&text)?;
        if record.key != *key {
            return Err(SysobsError::invalid(format!(
                "{} holds record for subject '{}' at log-precision {}",
                path.display(),
                record.key.subject,
                record.key.log_precision
            )));
        }
        Ok(Some(record))
    }

    /// Like [`ResultStore::load`] but a missing record is an error.
    pub fn require(&self, key: &RecordKey) -> Result<InversionRecord> {
        self.load(key)?.ok_or_else(|| SysobsError::MissingRecord {
            subject: key.subject.clone(),
            log_precision: key.log_precision,
        })
    }

    /// Keys of every record file in the store, sorted.
    pub fn keys(&self) -> Result<Vec<RecordKey>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(SysobsError::io(&self.root, e)),
        };
        let mut keys: Vec<RecordKey> = entries
            .flatten()
            .filter_map(|entry| parse_file_name(&entry.file_name().to_string_lossy()))
            .collect();
        keys.sort_by(|a, b| {
            a.subject
                .cmp(&b.subject)
                .then(a.log_precision.cmp(&b.log_precision))
        });
        Ok(keys)
    }
}

fn validate_subject(subject: &str) -> Result<()> {
    let ok = !subject.is_empty()
        && subject
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        && subject != "."
        && subject != "..";
    if ok {
        Ok(())
    } else {
        Err(SysobsError::invalid(format!("invalid subject identifier '{subject}'")))
    }
}

fn parse_file_name(name: &str) -> Option<RecordKey> {
    let stem = name.strip_suffix(".json")?;
    let (subject, lp) = stem.rsplit_once("_lp")?;
    if subject.is_empty() {
        return None;
    }
    Some(RecordKey::new(subject, lp.parse().ok()?))
}

// ---------------------------------------------------------------------------
// Replay engine
// ---------------------------------------------------------------------------

/// Engine that replays the stored posterior for a fixed key instead of
/// running an inversion. Used to re-score archived results through the same
/// code path as fresh ones.
pub struct StoreReplay<'a> {
    store: &'a ResultStore,
    key: RecordKey,
}

impl<'a> StoreReplay<'a> {
    pub fn new(store: &'a ResultStore, key: RecordKey) -> Self {
        Self { store, key }
    }
}

impl InversionEngine for StoreReplay<'_> {
    fn name(&self) -> &str {
        "store-replay"
    }

    fn invert(
        &self,
        spec: &ModelSpec,
        _inputs: &TimeSeries,
        _data: &TimeSeries,
    ) -> Result<Posterior> {
        let record = self.store.require(&self.key)?;
        if record.prior != spec.prior {
            return Err(SysobsError::Engine {
                engine: self.name().to_string(),
                message: format!(
                    "stored record for '{}' was inverted under a different prior",
                    self.key.subject
                ),
            });
        }
        Ok(record.posterior)
    }
}
