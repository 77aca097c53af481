//! Property-to-payload transformations.
//!
//! The alarm API expects a flatter, more namespaced document than the one
//! users write in templates:
//! - action entries naming a stack resource become that resource's `AlarmUrl`
//! - matching-metadata keys get the `metadata.<namespace>` prefix
//! - combination fields move into a nested `combination_rule`

use serde_json::Value;

use crate::context::ResourceContext;
use crate::meters::metadata_prefix;
use crate::schema::{ACTION_PROPERTIES, ALARM_IDS, MATCHING_METADATA, OPERATOR, REPEAT_ACTIONS};
use crate::types::PropertyMap;

/// Attribute of a stack resource holding its alarm webhook.
pub const ALARM_URL_ATTRIBUTE: &str = "AlarmUrl";

/// Key under which combination fields are nested.
pub const COMBINATION_RULE: &str = "combination_rule";

/// Namespace every matching-metadata key ends up under.
const METADATA_NAMESPACE: &str = "metadata.";

/// Returns the truthiness of a JSON value.
///
/// Null, false, zero and empty strings, lists and maps are falsy.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Resolves the entries of the three action lists.
///
/// An entry naming a resource of the stack is replaced by that resource's
/// `AlarmUrl` attribute, any other truthy entry is kept as a literal URL and
/// falsy entries are dropped. Resolution always uses the stack as it is now.
/// Other properties are copied unchanged.
#[must_use]
pub fn actions_to_urls(context: &dyn ResourceContext, properties: &PropertyMap) -> PropertyMap {
    properties
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::Array(actions) if ACTION_PROPERTIES.contains(&key.as_str()) => {
                    Value::Array(resolve_actions(context, actions))
                }
                other => other.clone(),
            };
            (key.clone(), value)
        })
        .collect()
}

fn resolve_actions(context: &dyn ResourceContext, actions: &[Value]) -> Vec<Value> {
    actions
        .iter()
        .filter_map(|action| {
            let target = action
                .as_str()
                .and_then(|name| context.resolve_attribute(name, ALARM_URL_ATTRIBUTE));
            match target {
                Some(url) => Some(url),
                None if is_truthy(action) => Some(action.clone()),
                None => None,
            }
        })
        .collect()
}

/// Rewrites one matching-metadata key to `metadata.<prefix><key>`.
///
/// Keys that already carry `<prefix>` or `metadata.<prefix>` are completed
/// rather than prefixed again, so the rewrite is idempotent.
#[must_use]
pub fn namespace_metadata_key(prefix: &str, key: &str) -> String {
    let qualified = format!("{METADATA_NAMESPACE}{prefix}");
    if key.starts_with(&qualified) {
        key.to_string()
    } else if key.starts_with(prefix) {
        format!("{METADATA_NAMESPACE}{key}")
    } else {
        format!("{qualified}{key}")
    }
}

/// Rewrites every key of a matching-metadata map, see [`namespace_metadata_key`].
#[must_use]
pub fn normalize_matching_metadata(prefix: &str, metadata: &PropertyMap) -> PropertyMap {
    metadata
        .iter()
        .map(|(key, value)| (namespace_metadata_key(prefix, key), value.clone()))
        .collect()
}

/// Builds the single-metric alarm payload from (a subset of) its properties.
///
/// `meter_name` selects the metadata namespace; it is passed separately so an
/// update that does not touch the meter still uses the resource's meter.
#[must_use]
pub fn threshold_payload(
    context: &dyn ResourceContext,
    properties: &PropertyMap,
    meter_name: Option<&str>,
) -> PropertyMap {
    let mut payload = actions_to_urls(context, properties);
    if let Some(Value::Object(metadata)) = properties.get(MATCHING_METADATA) {
        let prefix = metadata_prefix(meter_name);
        payload.insert(
            MATCHING_METADATA.to_string(),
            Value::Object(normalize_matching_metadata(prefix, metadata)),
        );
    }
    payload
}

/// Moves the combination fields into a nested `combination_rule`.
///
/// `alarm_ids`, `operator` and `repeat_actions` are always removed from the
/// top level; only truthy ones are kept in the rule, and the rule is only
/// added when it is non-empty.
#[must_use]
pub fn reformat_combination(mut properties: PropertyMap) -> PropertyMap {
    let rule: PropertyMap = [ALARM_IDS, OPERATOR, REPEAT_ACTIONS]
        .into_iter()
        .filter_map(|name| {
            properties
                .remove(name)
                .filter(is_truthy)
                .map(|value| (name.to_string(), value))
        })
        .collect();

    if !rule.is_empty() {
        properties.insert(COMBINATION_RULE.to_string(), Value::Object(rule));
    }
    properties
}
