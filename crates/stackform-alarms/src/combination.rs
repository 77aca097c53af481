//! Combination alarm resource (`OS::Ceilometer::CombinationAlarm`).
//!
//! Joins existing alarms with a boolean operator. The alarm service wants
//! the combined ids, the operator and the repeat flag nested in a
//! `combination_rule`, which the template does not mirror.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};

use crate::client::AlarmClients;
use crate::context::{ResourceContext, collect_properties};
use crate::error::{AlarmError, Result};
use crate::lifecycle::{AlarmResource, ResourceUpdate, delete_alarm, set_enabled};
use crate::schema::combination_properties_schema;
use crate::transform::{actions_to_urls, reformat_combination};
use crate::types::{LifecycleState, PropertyMap};

/// Alarm type sent to the service.
pub const COMBINATION_TYPE: &str = "combination";

/// Adapter for a combination alarm.
#[derive(Debug)]
pub struct CombinationAlarm {
    context: Arc<dyn ResourceContext>,
    clients: AlarmClients,
    resource_id: Option<String>,
    state: LifecycleState,
}

impl CombinationAlarm {
    /// Registered resource type name.
    pub const TYPE_NAME: &'static str = "OS::Ceilometer::CombinationAlarm";

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
}

impl AlarmResource for CombinationAlarm {
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
        let properties = collect_properties(self.context.as_ref(), &combination_properties_schema());
        let mut payload = actions_to_urls(self.context.as_ref(), &properties);
        payload.insert("name".to_string(), json!(self.context.physical_name()));
        payload.insert("type".to_string(), json!(COMBINATION_TYPE));
        Ok(reformat_combination(payload))
    }

    fn handle_create(&mut self) -> Result<()> {
        let payload = self.create_payload()?;
        let alarm = self.clients.alarms.create(&payload)?;
        info!(
            resource = %self.context.physical_name(),
            alarm_id = %alarm.alarm_id,
            "created combination alarm"
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

        let changes = reformat_combination(actions_to_urls(self.context.as_ref(), diff));
        self.clients.alarms.update(alarm_id, &changes)?;
        info!(alarm_id, fields = changes.len(), "updated combination alarm");
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
        delete_alarm(self.clients.alarms.as_ref(), self.resource_id.as_deref())?;
        self.state = LifecycleState::Deleted;
        Ok(())
    }
}
