//! Lifecycle callbacks the host engine invokes on an alarm resource.

use std::fmt;

use serde_json::{Value, json};
use tracing::{debug, info};

use crate::client::AlarmApi;
use crate::error::{Result, ignore_not_found};
use crate::schema::ENABLED;
use crate::types::{LifecycleState, PropertyMap};

/// An in-place update requested by the host engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceUpdate {
    /// The new resource definition as written in the template.
    pub definition: Value,
    /// Template-level differences, outside the properties.
    pub template_diff: PropertyMap,
    /// Properties whose value changed, with their new values.
    pub property_diff: PropertyMap,
}

impl ResourceUpdate {
    /// Creates an update carrying only changed properties.
    #[must_use]
    pub fn properties(property_diff: PropertyMap) -> Self {
        Self {
            property_diff,
            ..Self::default()
        }
    }
}

/// Lifecycle of one alarm resource.
///
/// Callbacks run synchronously, one at a time per resource. Failures are
/// returned to the host engine unchanged, which fails the stack operation.
pub trait AlarmResource: Send + fmt::Debug {
    /// Registered type name, e.g. `OS::Ceilometer::Alarm`.
    fn type_name(&self) -> &'static str;

    /// Identifier of the external alarm, `None` until created.
    fn resource_id(&self) -> Option<&str>;

    /// Where the last successful callback left the resource.
    fn state(&self) -> LifecycleState;

    /// Points the adapter at an alarm created by an earlier run.
    fn attach(&mut self, alarm_id: String);

    /// Validates the resource's properties through the host.
    ///
    /// # Errors
    ///
    /// Returns the host's validation error.
    fn validate(&self) -> Result<()>;

    /// The body `handle_create` would send, without sending it.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be assembled.
    fn create_payload(&self) -> Result<PropertyMap>;

    /// Creates the external alarm and records its identifier.
    ///
    /// # Errors
    ///
    /// Returns the alarm service error unchanged.
    fn handle_create(&mut self) -> Result<()>;

    /// Applies changed properties to the external alarm.
    ///
    /// # Errors
    ///
    /// Returns `AlarmError::NotCreated` without an identifier, otherwise the
    /// alarm service error unchanged.
    fn handle_update(&mut self, update: &ResourceUpdate) -> Result<()>;

    /// Disables the external alarm.
    ///
    /// # Errors
    ///
    /// Returns the alarm service error unchanged.
    fn handle_suspend(&mut self) -> Result<()>;

    /// Re-enables the external alarm.
    ///
    /// # Errors
    ///
    /// Returns the alarm service error unchanged.
    fn handle_resume(&mut self) -> Result<()>;

    /// Removes the external alarm; anything already gone is ignored.
    ///
    /// # Errors
    ///
    /// Returns alarm service errors other than not-found.
    fn handle_delete(&mut self) -> Result<()>;
}

/// Flips the `enabled` flag of an alarm, if one was created.
///
/// Returns false when there was no alarm to update.
pub(crate) fn set_enabled(
    alarms: &dyn AlarmApi,
    resource_id: Option<&str>,
    enabled: bool,
) -> Result<bool> {
    let Some(alarm_id) = resource_id else {
        debug!(enabled, "no alarm created yet, nothing to toggle");
        return Ok(false);
    };

    let mut changes = PropertyMap::new();
    changes.insert(ENABLED.to_string(), json!(enabled));
    alarms.update(alarm_id, &changes)?;
    info!(alarm_id, enabled, "toggled alarm");
    Ok(true)
}

/// Deletes an alarm, if one was created, treating not-found as done.
pub(crate) fn delete_alarm(alarms: &dyn AlarmApi, resource_id: Option<&str>) -> Result<()> {
    let Some(alarm_id) = resource_id else {
        debug!("no alarm created yet, nothing to delete");
        return Ok(());
    };

    ignore_not_found(alarms.delete(alarm_id))?;
    info!(alarm_id, "deleted alarm");
    Ok(())
}
