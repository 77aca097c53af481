//! Metering alarm resources for the Stackform orchestration engine.
//!
//! `stackform-alarms` lets a stack template declare alarms in an external
//! metering service and keeps them in step with the stack's lifecycle.
//!
//! # Resource types
//!
//! - **`OS::Ceilometer::Alarm`**: compares a statistic of one meter with a
//!   threshold. Also registers a watch rule so legacy monitoring requests
//!   are redirected to the alarm service.
//! - **`OS::Ceilometer::CombinationAlarm`**: joins existing alarms with
//!   `and`/`or`.
//!
//! Action lists may name other stack resources; those are replaced by the
//! resource's `AlarmUrl` attribute before the alarm service sees them.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use serde_json::json;
//! use stackform_alarms::{
//!     AlarmClients, AlarmResource, DefinitionContext, ResourceDefinition, registry,
//! };
//!
//! let definition = ResourceDefinition::new("OS::Ceilometer::Alarm", "cpu_high")
//!     .with_property("meter_name", json!("cpu_util"))
//!     .with_property("threshold", json!(70))
//!     .with_property("comparison_operator", json!("gt"))
//!     .with_property("matching_metadata", json!({"server_group": "web"}));
//!
//! let context = Arc::new(DefinitionContext::new(definition));
//! let mut alarm = registry()
//!     .instantiate("OS::Ceilometer::Alarm", context, AlarmClients::in_memory())
//!     .unwrap();
//!
//! let payload = alarm.create_payload().unwrap();
//! assert_eq!(payload["matching_metadata"], json!({"metadata.user_metadata.server_group": "web"}));
//!
//! alarm.handle_create().unwrap();
//! assert!(alarm.resource_id().is_some());
//! ```
//!
//! # Backends
//!
//! The adapters talk to the outside through [`AlarmApi`] and
//! [`WatchRuleStore`]. [`HttpAlarmClient`] and [`JsonFileWatchRuleStore`]
//! are the real implementations; the in-memory ones back tests.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod client;
pub mod combination;
pub mod config;
pub mod context;
pub mod definition;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod meters;
pub mod registry;
pub mod schema;
pub mod threshold;
pub mod transform;
pub mod types;
pub mod watch;

pub use client::{Alarm, AlarmApi, AlarmCall, AlarmClients, InMemoryAlarmApi};
pub use combination::CombinationAlarm;
pub use config::AlarmServiceConfig;
pub use context::ResourceContext;
pub use definition::{DefinitionContext, ResourceAttributes, ResourceDefinition};
pub use error::{AlarmError, Result};
pub use http::HttpAlarmClient;
pub use lifecycle::{AlarmResource, ResourceUpdate};
pub use registry::{ResourceRegistry, ResourceTypeInfo, SupportStatus, registry};
pub use schema::{PropertyKind, PropertySchema};
pub use threshold::ThresholdAlarm;
pub use types::{
    CombinationOperator, ComparisonOperator, LifecycleState, PropertyMap, Statistic,
};
pub use watch::{
    InMemoryWatchRuleStore, JsonFileWatchRuleStore, WatchRule, WatchRuleStore, WatchState,
};
