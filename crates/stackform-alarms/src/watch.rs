//! Legacy watch rules.
//!
//! Older monitoring APIs post metric data against a named watch rule. A
//! single-metric alarm registers a rule in the
//! [`WatchState::CeilometerControlled`] state so those posts can be redirected
//! to the alarm service instead of being evaluated locally.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{AlarmError, Result};

/// Evaluation state of a watch rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WatchState {
    /// The watched metric is within bounds.
    #[default]
    Normal,
    /// The watched metric breached its threshold.
    Alarm,
    /// No data arrived for the watched metric.
    Nodata,
    /// Evaluation is paused.
    Suspended,
    /// Evaluation is delegated to the alarm service.
    CeilometerControlled,
}

impl WatchState {
    /// Returns the state as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Alarm => "ALARM",
            Self::Nodata => "NODATA",
            Self::Suspended => "SUSPENDED",
            Self::CeilometerControlled => "CEILOMETER_CONTROLLED",
        }
    }
}

impl fmt::Display for WatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stored watch rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchRule {
    /// Rule name, the physical name of the owning resource.
    pub name: String,
    /// Rule body as written in the template.
    pub rule: Value,
    /// Owning stack.
    pub stack_id: String,
    /// Evaluation state.
    pub state: WatchState,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl WatchRule {
    /// Creates a rule in the [`WatchState::Normal`] state.
    pub fn new(name: impl Into<String>, rule: Value, stack_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            rule,
            stack_id: stack_id.into(),
            state: WatchState::Normal,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the evaluation state.
    #[must_use]
    pub fn with_state(mut self, state: WatchState) -> Self {
        self.state = state;
        self
    }
}

/// Storage for watch rules, keyed by name.
pub trait WatchRuleStore: Send + Sync + fmt::Debug {
    /// Stores a new rule.
    ///
    /// # Errors
    ///
    /// Returns `AlarmError::WatchRuleExists` if the name is taken.
    fn create(&self, rule: WatchRule) -> Result<()>;

    /// Loads a rule by name.
    ///
    /// # Errors
    ///
    /// Returns `AlarmError::WatchRuleNotFound` if no rule has that name.
    fn load(&self, name: &str) -> Result<WatchRule>;

    /// Removes a rule by name.
    ///
    /// # Errors
    ///
    /// Returns `AlarmError::WatchRuleNotFound` if no rule has that name.
    fn destroy(&self, name: &str) -> Result<()>;
}

fn not_found(name: &str) -> AlarmError {
    AlarmError::WatchRuleNotFound {
        name: name.to_string(),
    }
}

/// Watch rules kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryWatchRuleStore {
    rules: RwLock<HashMap<String, WatchRule>>,
}

impl InMemoryWatchRuleStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    /// Returns true if no rule is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }
}

impl WatchRuleStore for InMemoryWatchRuleStore {
    fn create(&self, rule: WatchRule) -> Result<()> {
        let mut rules = self.rules.write();
        if rules.contains_key(&rule.name) {
            return Err(AlarmError::WatchRuleExists { name: rule.name });
        }
        rules.insert(rule.name.clone(), rule);
        Ok(())
    }

    fn load(&self, name: &str) -> Result<WatchRule> {
        self.rules.read().get(name).cloned().ok_or_else(|| not_found(name))
    }

    fn destroy(&self, name: &str) -> Result<()> {
        self.rules
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| not_found(name))
    }
}

/// Watch rules persisted as a JSON snapshot in a directory.
///
/// The snapshot is rewritten after every mutation and read back on open.
#[derive(Debug)]
pub struct JsonFileWatchRuleStore {
    path: PathBuf,
    rules: RwLock<HashMap<String, WatchRule>>,
}

impl JsonFileWatchRuleStore {
    /// File name of the snapshot inside the store directory.
    pub const FILE_NAME: &'static str = "watch_rules.json";

    /// Opens the store in `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or an existing
    /// snapshot cannot be parsed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(Self::FILE_NAME);

        let rules: HashMap<String, WatchRule> = if path.exists() {
            serde_json::from_str(&fs::read_to_string(&path)?)?
        } else {
            HashMap::new()
        };
        debug!(count = rules.len(), path = %path.display(), "loaded watch rules");

        Ok(Self {
            path,
            rules: RwLock::new(rules),
        })
    }

    fn snapshot(&self, rules: &HashMap<String, WatchRule>) -> Result<()> {
        let content = serde_json::to_string_pretty(rules)?;
        let tmp = self.path.with_extension("json.tmp");
        let written = fs::write(&tmp, content).and_then(|()| fs::rename(&tmp, &self.path));
        if let Err(e) = written {
            warn!(error = %e, path = %self.path.display(), "failed to snapshot watch rules");
            if let Err(cleanup) = fs::remove_file(&tmp) {
                if cleanup.kind() != io::ErrorKind::NotFound {
                    warn!(error = %cleanup, path = %tmp.display(), "failed to remove snapshot temp file");
                }
            }
            return Err(e.into());
        }
        debug!(path = %self.path.display(), rules = rules.len(), "snapshotted watch rules");
        Ok(())
    }
}

impl WatchRuleStore for JsonFileWatchRuleStore {
    fn create(&self, rule: WatchRule) -> Result<()> {
        let mut rules = self.rules.write();
        if rules.contains_key(&rule.name) {
            return Err(AlarmError::WatchRuleExists { name: rule.name });
        }
        let name = rule.name.clone();
        rules.insert(name.clone(), rule);
        if let Err(e) = self.snapshot(&rules) {
            rules.remove(&name);
            return Err(e);
        }
        Ok(())
    }

    fn load(&self, name: &str) -> Result<WatchRule> {
        self.rules.read().get(name).cloned().ok_or_else(|| not_found(name))
    }

    fn destroy(&self, name: &str) -> Result<()> {
        let mut rules = self.rules.write();
        let removed = rules.remove(name).ok_or_else(|| not_found(name))?;
        if let Err(e) = self.snapshot(&rules) {
            rules.insert(name.to_string(), removed);
            return Err(e);
        }
        Ok(())
    }
}
