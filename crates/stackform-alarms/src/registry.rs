//! Resource types exported to the host engine's plugin loader.
//!
//! The table is built once per process and never changes afterwards.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::client::AlarmClients;
use crate::combination::CombinationAlarm;
use crate::context::ResourceContext;
use crate::error::{AlarmError, Result};
use crate::lifecycle::AlarmResource;
use crate::schema::{PropertySchema, combination_properties_schema, threshold_properties_schema};
use crate::threshold::ThresholdAlarm;

/// Constructor of an adapter for one resource.
pub type AdapterFactory = fn(Arc<dyn ResourceContext>, AlarmClients) -> Box<dyn AlarmResource>;

/// Since when a resource type is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportStatus {
    /// Supported since the first release.
    Supported,
    /// Supported since the named release.
    Since(&'static str),
}

impl fmt::Display for SupportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Supported => write!(f, "supported"),
            Self::Since(version) => write!(f, "supported since {version}"),
        }
    }
}

/// A registered resource type.
#[derive(Clone)]
pub struct ResourceTypeInfo {
    type_name: &'static str,
    support_status: SupportStatus,
    schema: fn() -> Vec<PropertySchema>,
    factory: AdapterFactory,
}

impl ResourceTypeInfo {
    /// Type name as used in templates.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Support status of the type.
    #[must_use]
    pub const fn support_status(&self) -> SupportStatus {
        self.support_status
    }

    /// Declared property schema of the type.
    #[must_use]
    pub fn schema(&self) -> Vec<PropertySchema> {
        (self.schema)()
    }

    /// Builds an adapter for one resource of this type.
    #[must_use]
    pub fn instantiate(
        &self,
        context: Arc<dyn ResourceContext>,
        clients: AlarmClients,
    ) -> Box<dyn AlarmResource> {
        (self.factory)(context, clients)
    }
}

impl fmt::Debug for ResourceTypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceTypeInfo")
            .field("type_name", &self.type_name)
            .field("support_status", &self.support_status)
            .finish_non_exhaustive()
    }
}

/// Immutable table of resource types by name.
#[derive(Debug)]
pub struct ResourceRegistry {
    types: BTreeMap<&'static str, ResourceTypeInfo>,
}

impl ResourceRegistry {
    fn build() -> Self {
        let entries = [
            ResourceTypeInfo {
                type_name: ThresholdAlarm::TYPE_NAME,
                support_status: SupportStatus::Supported,
                schema: threshold_properties_schema,
                factory: threshold_adapter,
            },
            ResourceTypeInfo {
                type_name: CombinationAlarm::TYPE_NAME,
                support_status: SupportStatus::Since("2014.1"),
                schema: combination_properties_schema,
                factory: combination_adapter,
            },
        ];

        Self {
            types: entries.into_iter().map(|info| (info.type_name, info)).collect(),
        }
    }

    /// Looks up a type by name.
    #[must_use]
    pub fn get(&self, type_name: &str) -> Option<&ResourceTypeInfo> {
        self.types.get(type_name)
    }

    /// Iterates the registered types in name order.
    pub fn iter(&self) -> impl Iterator<Item = &ResourceTypeInfo> {
        self.types.values()
    }

    /// Returns the number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns true if no type is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Builds an adapter for a resource of the named type.
    ///
    /// # Errors
    ///
    /// Returns `AlarmError::InvalidProperty` on `type` if the type is unknown.
    pub fn instantiate(
        &self,
        type_name: &str,
        context: Arc<dyn ResourceContext>,
        clients: AlarmClients,
    ) -> Result<Box<dyn AlarmResource>> {
        self.get(type_name)
            .map(|info| info.instantiate(context, clients))
            .ok_or_else(|| {
                AlarmError::invalid_property("type", format!("unknown resource type '{type_name}'"))
            })
    }
}

fn threshold_adapter(
    context: Arc<dyn ResourceContext>,
    clients: AlarmClients,
) -> Box<dyn AlarmResource> {
    Box::new(ThresholdAlarm::new(context, clients))
}

fn combination_adapter(
    context: Arc<dyn ResourceContext>,
    clients: AlarmClients,
) -> Box<dyn AlarmResource> {
    Box::new(CombinationAlarm::new(context, clients))
}

static REGISTRY: Lazy<ResourceRegistry> = Lazy::new(ResourceRegistry::build);

/// Returns the process-wide resource type table.
#[must_use]
pub fn registry() -> &'static ResourceRegistry {
    &REGISTRY
}
