//! The host engine's view of a resource, as seen by an adapter.

use std::fmt;

use serde_json::Value;

use crate::error::Result;
use crate::schema::PropertySchema;
use crate::types::PropertyMap;

/// Capabilities the orchestration engine provides to a resource adapter.
///
/// The engine owns schema validation, the stack graph and name generation;
/// adapters only consume them through this trait.
pub trait ResourceContext: Send + Sync + fmt::Debug {
    /// Validates the resource's properties against its declared schema.
    ///
    /// # Errors
    ///
    /// Returns `AlarmError::InvalidProperty` for the first rejected property.
    fn validate(&self) -> Result<()>;

    /// Returns the validated value of a property, `None` when unset.
    fn get_property(&self, name: &str) -> Option<Value>;

    /// Looks up `attribute` of the stack resource named `resource_name`.
    ///
    /// Returns `None` if the stack has no resource of that name.
    fn resolve_attribute(&self, resource_name: &str, attribute: &str) -> Option<Value>;

    /// Returns the unique physical name generated for this resource.
    fn physical_name(&self) -> String;

    /// Returns the identifier of the owning stack.
    fn stack_id(&self) -> String;
}

/// Collects the declared properties of a resource.
///
/// Unset properties fall back to their schema default; properties that are
/// still unset, or null, are left out.
#[must_use]
pub fn collect_properties(context: &dyn ResourceContext, schema: &[PropertySchema]) -> PropertyMap {
    schema
        .iter()
        .filter_map(|prop| {
            context
                .get_property(prop.name)
                .filter(|value| !value.is_null())
                .or_else(|| prop.default.clone())
                .map(|value| (prop.name.to_string(), value))
        })
        .collect()
}
