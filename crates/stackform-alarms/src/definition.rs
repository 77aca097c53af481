//! Standalone resource definitions and the context built from them.
//!
//! A [`ResourceDefinition`] is the JSON form of one alarm resource plus the
//! attributes of the stack resources its actions may refer to. The
//! [`DefinitionContext`] serves it through [`ResourceContext`], which lets the
//! CLI and the test suite drive adapters without an orchestration engine.

use std::collections::HashMap;
use std::path::Path;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::context::ResourceContext;
use crate::error::{AlarmError, Result};
use crate::registry::registry;
use crate::types::PropertyMap;

/// Attribute values of one peer resource, keyed by attribute name.
pub type ResourceAttributes = HashMap<String, Value>;

/// One alarm resource as written in a definition file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDefinition {
    /// Registered resource type, e.g. `OS::Ceilometer::Alarm`.
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Logical resource name inside the stack.
    pub name: String,
    /// Name of the owning stack.
    #[serde(default = "default_stack_name")]
    pub stack_name: String,
    /// Identifier of the owning stack; generated when absent.
    #[serde(default)]
    pub stack_id: Option<String>,
    /// Fixed physical name; generated when absent.
    #[serde(default)]
    pub physical_name: Option<String>,
    /// Resource properties.
    #[serde(default)]
    pub properties: PropertyMap,
    /// Other resources of the stack and their attributes.
    #[serde(default)]
    pub stack_resources: HashMap<String, ResourceAttributes>,
}

fn default_stack_name() -> String {
    "stack".to_string()
}

impl ResourceDefinition {
    /// Creates a definition with no properties and no peer resources.
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
            stack_name: default_stack_name(),
            stack_id: None,
            physical_name: None,
            properties: PropertyMap::new(),
            stack_resources: HashMap::new(),
        }
    }

    /// Sets a property.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: Value) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    /// Sets the stack name.
    #[must_use]
    pub fn with_stack_name(mut self, stack_name: impl Into<String>) -> Self {
        self.stack_name = stack_name.into();
        self
    }

    /// Adds a peer resource exposing the given attributes.
    #[must_use]
    pub fn with_resource(mut self, name: impl Into<String>, attributes: ResourceAttributes) -> Self {
        self.stack_resources.insert(name.into(), attributes);
        self
    }

    /// Loads a definition from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AlarmError::Config(format!(
                "failed to read definition '{}': {e}",
                path.display()
            ))
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// [`ResourceContext`] backed by a [`ResourceDefinition`].
///
/// Properties and peer resources can be changed after construction, so a
/// caller can model a stack that evolves between lifecycle callbacks.
#[derive(Debug)]
pub struct DefinitionContext {
    resource_type: String,
    physical_name: String,
    stack_id: String,
    properties: RwLock<PropertyMap>,
    resources: RwLock<HashMap<String, ResourceAttributes>>,
}

impl DefinitionContext {
    /// Builds the context, generating the physical name and stack id if
    /// the definition does not fix them.
    #[must_use]
    pub fn new(definition: ResourceDefinition) -> Self {
        let physical_name = definition.physical_name.unwrap_or_else(|| {
            format!(
                "{}-{}-{}",
                definition.stack_name,
                definition.name,
                short_id()
            )
        });
        let stack_id = definition
            .stack_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Self {
            resource_type: definition.resource_type,
            physical_name,
            stack_id,
            properties: RwLock::new(definition.properties),
            resources: RwLock::new(definition.stack_resources),
        }
    }

    /// Returns the registered resource type.
    #[must_use]
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Replaces a property value.
    pub fn set_property(&self, name: impl Into<String>, value: Value) {
        self.properties.write().insert(name.into(), value);
    }

    /// Adds or replaces a peer resource.
    pub fn add_resource(&self, name: impl Into<String>, attributes: ResourceAttributes) {
        self.resources.write().insert(name.into(), attributes);
    }

    /// Removes a peer resource, returning true if it existed.
    pub fn remove_resource(&self, name: &str) -> bool {
        self.resources.write().remove(name).is_some()
    }
}

impl ResourceContext for DefinitionContext {
    fn validate(&self) -> Result<()> {
        let info = registry().get(&self.resource_type).ok_or_else(|| {
            AlarmError::invalid_property(
                "type",
                format!("unknown resource type '{}'", self.resource_type),
            )
        })?;

        let properties = self.properties.read();
        for prop in info.schema().iter().filter(|p| p.required) {
            if properties.get(prop.name).is_none_or(Value::is_null) {
                return Err(AlarmError::invalid_property(
                    prop.name,
                    "property is required",
                ));
            }
        }
        Ok(())
    }

    fn get_property(&self, name: &str) -> Option<Value> {
        self.properties.read().get(name).cloned()
    }

    fn resolve_attribute(&self, resource_name: &str, attribute: &str) -> Option<Value> {
        self.resources
            .read()
            .get(resource_name)
            .map(|attrs| attrs.get(attribute).cloned().unwrap_or(Value::Null))
    }

    fn physical_name(&self) -> String {
        self.physical_name.clone()
    }

    fn stack_id(&self) -> String {
        self.stack_id.clone()
    }
}

/// Short random suffix keeping generated physical names unique.
fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}
