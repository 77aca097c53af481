//! Alarm service client interface and its in-memory implementation.
//!
//! [`AlarmApi`] is the seam between the adapters and the external alarm
//! service. [`HttpAlarmClient`](crate::http::HttpAlarmClient) talks to a
//! real service; [`InMemoryAlarmApi`] keeps alarms in a map and journals
//! every call so tests can assert on the exact payloads.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::AlarmServiceConfig;
use crate::error::{AlarmError, Result};
use crate::http::HttpAlarmClient;
use crate::types::PropertyMap;
use crate::watch::{InMemoryWatchRuleStore, JsonFileWatchRuleStore, WatchRuleStore};

/// An alarm as stored by the alarm service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alarm {
    /// Service-assigned identifier.
    pub alarm_id: String,
    /// Every other field of the alarm document.
    #[serde(flatten)]
    pub fields: PropertyMap,
}

/// Operations the adapters need from the alarm service.
pub trait AlarmApi: Send + Sync + fmt::Debug {
    /// Creates an alarm from a complete payload.
    ///
    /// # Errors
    ///
    /// Returns the service or transport error unchanged.
    fn create(&self, payload: &PropertyMap) -> Result<Alarm>;

    /// Applies changed fields to an existing alarm.
    ///
    /// # Errors
    ///
    /// Returns `AlarmError::AlarmNotFound` if the alarm does not exist.
    fn update(&self, alarm_id: &str, changes: &PropertyMap) -> Result<()>;

    /// Deletes an alarm.
    ///
    /// # Errors
    ///
    /// Returns `AlarmError::AlarmNotFound` if the alarm is already gone.
    fn delete(&self, alarm_id: &str) -> Result<()>;

    /// Fetches an alarm.
    ///
    /// # Errors
    ///
    /// Returns `AlarmError::AlarmNotFound` if the alarm does not exist.
    fn get(&self, alarm_id: &str) -> Result<Alarm>;
}

/// One call received by an [`InMemoryAlarmApi`].
#[derive(Debug, Clone, PartialEq)]
pub enum AlarmCall {
    /// `create` with its payload.
    Create(PropertyMap),
    /// `update` with its identifier and changed fields.
    Update {
        /// Target alarm.
        alarm_id: String,
        /// Changed fields.
        changes: PropertyMap,
    },
    /// `delete` with its identifier.
    Delete {
        /// Target alarm.
        alarm_id: String,
    },
}

/// Alarm service kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryAlarmApi {
    alarms: RwLock<HashMap<String, Alarm>>,
    calls: RwLock<Vec<AlarmCall>>,
    unavailable: AtomicBool,
}

impl InMemoryAlarmApi {
    /// Creates an empty service.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with a 503 until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns the calls received so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<AlarmCall> {
        self.calls.read().clone()
    }

    /// Returns the number of stored alarms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.alarms.read().len()
    }

    /// Returns true if no alarm is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alarms.read().is_empty()
    }

    /// Removes an alarm behind the adapters' back.
    pub fn remove_out_of_band(&self, alarm_id: &str) -> bool {
        self.alarms.write().remove(alarm_id).is_some()
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AlarmError::Api {
                status: 503,
                message: "alarm service unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn record(&self, call: AlarmCall) {
        self.calls.write().push(call);
    }
}

impl AlarmApi for InMemoryAlarmApi {
    fn create(&self, payload: &PropertyMap) -> Result<Alarm> {
        self.check_available()?;
        self.record(AlarmCall::Create(payload.clone()));

        let alarm = Alarm {
            alarm_id: Uuid::new_v4().to_string(),
            fields: payload.clone(),
        };
        self.alarms
            .write()
            .insert(alarm.alarm_id.clone(), alarm.clone());
        debug!(alarm_id = %alarm.alarm_id, "stored alarm");
        Ok(alarm)
    }

    fn update(&self, alarm_id: &str, changes: &PropertyMap) -> Result<()> {
        self.check_available()?;
        self.record(AlarmCall::Update {
            alarm_id: alarm_id.to_string(),
            changes: changes.clone(),
        });

        let mut alarms = self.alarms.write();
        let alarm = alarms.get_mut(alarm_id).ok_or_else(|| AlarmError::AlarmNotFound {
            id: alarm_id.to_string(),
        })?;
        for (key, value) in changes {
            alarm.fields.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    fn delete(&self, alarm_id: &str) -> Result<()> {
        self.check_available()?;
        self.record(AlarmCall::Delete {
            alarm_id: alarm_id.to_string(),
        });

        self.alarms
            .write()
            .remove(alarm_id)
            .map(|_| ())
            .ok_or_else(|| AlarmError::AlarmNotFound {
                id: alarm_id.to_string(),
            })
    }

    fn get(&self, alarm_id: &str) -> Result<Alarm> {
        self.check_available()?;
        self.alarms
            .read()
            .get(alarm_id)
            .cloned()
            .ok_or_else(|| AlarmError::AlarmNotFound {
                id: alarm_id.to_string(),
            })
    }
}

/// The external services an alarm adapter talks to.
#[derive(Debug, Clone)]
pub struct AlarmClients {
    /// Alarm service.
    pub alarms: Arc<dyn AlarmApi>,
    /// Legacy watch rule store.
    pub watch_rules: Arc<dyn WatchRuleStore>,
}

impl AlarmClients {
    /// Bundles the given clients.
    #[must_use]
    pub fn new(alarms: Arc<dyn AlarmApi>, watch_rules: Arc<dyn WatchRuleStore>) -> Self {
        Self {
            alarms,
            watch_rules,
        }
    }

    /// Fresh in-memory alarm service and watch rule store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryAlarmApi::new()),
            Arc::new(InMemoryWatchRuleStore::new()),
        )
    }

    /// HTTP alarm client plus, when a path is configured, the file-backed
    /// watch rule store.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn from_config(config: &AlarmServiceConfig) -> Result<Self> {
        config.validate()?;
        let alarms: Arc<dyn AlarmApi> = Arc::new(HttpAlarmClient::new(config)?);
        let watch_rules: Arc<dyn WatchRuleStore> = match &config.watch_rule_path {
            Some(path) => Arc::new(JsonFileWatchRuleStore::open(path)?),
            None => {
                warn!("no watch_rule_path configured, watch rules will not persist");
                Arc::new(InMemoryWatchRuleStore::new())
            }
        };
        Ok(Self::new(alarms, watch_rules))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> PropertyMap {
        let mut map = PropertyMap::new();
        map.insert("name".to_string(), json!("web-cpu"));
        map.insert("threshold".to_string(), json!(70));
        map
    }

    #[test]
    fn create_assigns_unique_ids() {
        let api = InMemoryAlarmApi::new();
        let a = api.create(&payload()).unwrap();
        let b = api.create(&payload()).unwrap();
        assert_ne!(a.alarm_id, b.alarm_id);
        assert_eq!(api.len(), 2);
        assert_eq!(api.get(&a.alarm_id).unwrap().fields["threshold"], json!(70));
    }

    #[test]
    fn update_merges_fields() {
        let api = InMemoryAlarmApi::new();
        let alarm = api.create(&payload()).unwrap();

        let mut changes = PropertyMap::new();
        changes.insert("threshold".to_string(), json!(90));
        changes.insert("enabled".to_string(), json!(false));
        api.update(&alarm.alarm_id, &changes).unwrap();

        let stored = api.get(&alarm.alarm_id).unwrap();
        assert_eq!(stored.fields["threshold"], json!(90));
        assert_eq!(stored.fields["enabled"], json!(false));
        assert_eq!(stored.fields["name"], json!("web-cpu"));
    }

    #[test]
    fn missing_alarm_is_not_found() {
        let api = InMemoryAlarmApi::new();
        assert!(api.get("nope").unwrap_err().is_not_found());
        assert!(api.update("nope", &PropertyMap::new()).unwrap_err().is_not_found());
        assert!(api.delete("nope").unwrap_err().is_not_found());
    }

    #[test]
    fn delete_twice_reports_not_found() {
        let api = InMemoryAlarmApi::new();
        let alarm = api.create(&payload()).unwrap();
        api.delete(&alarm.alarm_id).unwrap();
        assert!(api.is_empty());
        assert!(matches!(
            api.delete(&alarm.alarm_id),
            Err(AlarmError::AlarmNotFound { .. })
        ));
    }

    #[test]
    fn calls_are_journaled() {
        let api = InMemoryAlarmApi::new();
        let alarm = api.create(&payload()).unwrap();
        api.delete(&alarm.alarm_id).unwrap();

        assert_eq!(
            api.calls(),
            vec![
                AlarmCall::Create(payload()),
                AlarmCall::Delete {
                    alarm_id: alarm.alarm_id
                },
            ]
        );
    }

    #[test]
    fn unavailable_service_fails_every_call() {
        let api = InMemoryAlarmApi::new();
        api.set_unavailable(true);
        let err = api.create(&payload()).unwrap_err();
        assert!(matches!(err, AlarmError::Api { status: 503, .. }));
        assert!(!err.is_not_found());
        assert!(api.calls().is_empty());

        api.set_unavailable(false);
        assert!(api.create(&payload()).is_ok());
    }

    #[test]
    fn alarm_serializes_flat() {
        let alarm = Alarm {
            alarm_id: "a-1".to_string(),
            fields: payload(),
        };
        let value = serde_json::to_value(&alarm).unwrap();
        assert_eq!(
            value,
            json!({"alarm_id": "a-1", "name": "web-cpu", "threshold": 70})
        );
        let back: Alarm = serde_json::from_value(value).unwrap();
        assert_eq!(back, alarm);
    }

    #[test]
    fn in_memory_clients_start_empty() {
        let clients = AlarmClients::in_memory();
        assert!(clients.alarms.get("x").unwrap_err().is_not_found());
        assert!(clients.watch_rules.load("x").unwrap_err().is_not_found());
    }
}
