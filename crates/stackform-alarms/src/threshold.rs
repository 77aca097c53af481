//! Single-metric alarm resource (`OS::Ceilometer::Alarm`).
//!
//! Watches one meter and compares a statistic of it with a threshold. On
//! create it also registers a legacy watch rule so older monitoring APIs
//! posting against the resource are redirected to the alarm service.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::client::AlarmClients;
use crate::context::{ResourceContext, collect_properties};
use crate::error::{AlarmError, Result, ignore_not_found};
use crate::lifecycle::{AlarmResource, ResourceUpdate, delete_alarm, set_enabled};
use crate::schema::{METER_NAME, threshold_properties_schema};
use crate::transform::threshold_payload;
use crate::types::{LifecycleState, PropertyMap};
use crate::watch::{WatchRule, WatchState};

/// Adapter for a single-metric alarm.
#[derive(Debug)]
pub struct ThresholdAlarm {
    context: Arc<dyn ResourceContext>,
    clients: AlarmClients,
    resource_id: Option<String>,
    state: LifecycleState,
}

impl ThresholdAlarm {
    /// Registered resource type name.
    pub const TYPE_NAME: &'static str = "OS::Ceilometer::Alarm";

    /// Creates an adapter for a resource that has no alarm yet.
    #[must_use]
    pub fn new(context: Arc<dyn ResourceContext>, clients: AlarmClients) -> Self {
        Self {
            context,
            clients,
            resource_id: None,
            state: LifecycleState::Absent,
        }
    }

    /// Re-attaches the adapter to an alarm created earlier.
    #[must_use]
    pub fn with_resource_id(mut self, alarm_id: impl Into<String>) -> Self {
        self.attach(alarm_id.into());
        self
    }

    fn properties(&self) -> PropertyMap {
        collect_properties(self.context.as_ref(), &threshold_properties_schema())
    }

    /// Removes an alarm whose watch rule could not be registered.
    fn discard_alarm(&self, alarm_id: &str) {
        match ignore_not_found(self.clients.alarms.delete(alarm_id)) {
            Ok(()) => debug!(alarm_id, "discarded alarm without watch rule"),
            Err(e) => warn!(alarm_id, error = %e, "failed to discard alarm without watch rule"),
        }
    }

    fn current_meter_name(&self) -> Option<String> {
        self.context
            .get_property(METER_NAME)
            .and_then(|v| v.as_str().map(str::to_string))
    }
}

impl AlarmResource for ThresholdAlarm {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn resource_id(&self) -> Option<&str> {
        self.resource_id.as_deref()
    }

    fn state(&self) -> LifecycleState {
        self.state
    }

    fn attach(&mut self, alarm_id: String) {
        self.resource_id = Some(alarm_id);
        self.state = LifecycleState::Active;
    }

    fn validate(&self) -> Result<()> {
        self.context.validate()
    }

    fn create_payload(&self) -> Result<PropertyMap> {
        let properties = self.properties();
        let meter_name = properties.get(METER_NAME).and_then(Value::as_str);
        let mut payload = threshold_payload(self.context.as_ref(), &properties, meter_name);
        payload.insert("name".to_string(), json!(self.context.physical_name()));
        Ok(payload)
    }

    fn handle_create(&mut self) -> Result<()> {
        let payload = self.create_payload()?;
        let alarm = self.clients.alarms.create(&payload)?;
        let physical_name = self.context.physical_name();

        let rule = WatchRule::new(
            physical_name.as_str(),
            Value::Object(self.properties()),
            self.context.stack_id(),
        )
        .with_state(WatchState::CeilometerControlled);
        if let Err(e) = self.clients.watch_rules.create(rule) {
            self.discard_alarm(&alarm.alarm_id);
            return Err(e);
        }

        info!(
            resource = %physical_name,
            alarm_id = %alarm.alarm_id,
            "created threshold alarm"
        );
        self.resource_id = Some(alarm.alarm_id);
        self.state = LifecycleState::Active;
        Ok(())
    }

    fn handle_update(&mut self, update: &ResourceUpdate) -> Result<()> {
        let diff = &update.property_diff;
        if diff.is_empty() {
            debug!(resource = %self.context.physical_name(), "no property changes");
            return Ok(());
        }

        let alarm_id = self
            .resource_id
            .as_deref()
            .ok_or_else(|| AlarmError::NotCreated {
                resource: self.context.physical_name(),
            })?;

        let meter_name = diff
            .get(METER_NAME)
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| self.current_meter_name());
        let changes = threshold_payload(self.context.as_ref(), diff, meter_name.as_deref());
        self.clients.alarms.update(alarm_id, &changes)?;
        info!(alarm_id, fields = changes.len(), "updated threshold alarm");
        Ok(())
    }

    fn handle_suspend(&mut self) -> Result<()> {
        if set_enabled(self.clients.alarms.as_ref(), self.resource_id.as_deref(), false)? {
            self.state = LifecycleState::Suspended;
        }
        Ok(())
    }

    fn handle_resume(&mut self) -> Result<()> {
        if set_enabled(self.clients.alarms.as_ref(), self.resource_id.as_deref(), true)? {
            self.state = LifecycleState::Active;
        }
        Ok(())
    }

    fn handle_delete(&mut self) -> Result<()> {
        let physical_name = self.context.physical_name();
        let watch_rules = self.clients.watch_rules.as_ref();
        ignore_not_found(
            watch_rules
                .load(&physical_name)
                .and_then(|rule| watch_rules.destroy(&rule.name)),
        )?;

        delete_alarm(self.clients.alarms.as_ref(), self.resource_id.as_deref())?;
        self.state = LifecycleState::Deleted;
        Ok(())
    }
}
