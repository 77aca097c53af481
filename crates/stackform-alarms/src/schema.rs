//! Declared property schemas of the alarm resource types.
//!
//! The host engine validates templates against these declarations; the
//! adapters only read them for property names and defaults.

use serde_json::{Value, json};

use crate::types::{CombinationOperator, ComparisonOperator, Statistic};

/// Free-text description of the alarm.
pub const DESCRIPTION: &str = "description";
/// Whether alarm evaluation and actioning is enabled.
pub const ENABLED: &str = "enabled";
/// Actions fired on transition to alarm.
pub const ALARM_ACTIONS: &str = "alarm_actions";
/// Actions fired on transition to ok.
pub const OK_ACTIONS: &str = "ok_actions";
/// Actions fired on transition to insufficient data.
pub const INSUFFICIENT_DATA_ACTIONS: &str = "insufficient_data_actions";
/// Whether actions repeat while the alarm stays in a state.
pub const REPEAT_ACTIONS: &str = "repeat_actions";

/// Comparison between statistic and threshold.
pub const COMPARISON_OPERATOR: &str = "comparison_operator";
/// Number of periods to evaluate over.
pub const EVALUATION_PERIODS: &str = "evaluation_periods";
/// Meter watched by the alarm.
pub const METER_NAME: &str = "meter_name";
/// Evaluation period in seconds.
pub const PERIOD: &str = "period";
/// Meter statistic to evaluate.
pub const STATISTIC: &str = "statistic";
/// Threshold to evaluate against.
pub const THRESHOLD: &str = "threshold";
/// Resource metadata the meter must match.
pub const MATCHING_METADATA: &str = "matching_metadata";

/// Alarm identifiers joined by a combination alarm.
pub const ALARM_IDS: &str = "alarm_ids";
/// Operator joining the combined alarms.
pub const OPERATOR: &str = "operator";

/// The three action-list properties.
pub const ACTION_PROPERTIES: [&str; 3] = [ALARM_ACTIONS, OK_ACTIONS, INSUFFICIENT_DATA_ACTIONS];

/// Value type of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    /// UTF-8 string.
    String,
    /// Boolean flag.
    Boolean,
    /// Integral number.
    Integer,
    /// Any number.
    Number,
    /// Ordered list.
    List,
    /// String-keyed map.
    Map,
}

/// Constraint applied by the host's validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// The value must be one of these strings.
    AllowedValues(Vec<&'static str>),
    /// The list must hold at least `min` items.
    Length {
        /// Minimum number of items.
        min: usize,
    },
}

/// Declaration of one resource property.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySchema {
    /// Property name as written in templates.
    pub name: &'static str,
    /// Value type.
    pub kind: PropertyKind,
    /// Help text.
    pub description: &'static str,
    /// Whether the template must set the property.
    pub required: bool,
    /// Whether a change can be applied in place.
    pub update_allowed: bool,
    /// Value used when the template leaves the property unset.
    pub default: Option<Value>,
    /// Validation constraints.
    pub constraints: Vec<Constraint>,
}

impl PropertySchema {
    fn new(name: &'static str, kind: PropertyKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: false,
            update_allowed: false,
            default: None,
            constraints: Vec::new(),
        }
    }

    const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    const fn updatable(mut self) -> Self {
        self.update_allowed = true;
        self
    }

    fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }
}

/// Properties shared by every alarm type.
#[must_use]
pub fn common_properties_schema() -> Vec<PropertySchema> {
    use PropertyKind::{Boolean, List, String};

    vec![
        PropertySchema::new(DESCRIPTION, String, "Description for the alarm.").updatable(),
        PropertySchema::new(ENABLED, Boolean, "True if alarm evaluation/actioning is enabled.")
            .default_value(json!(true))
            .updatable(),
        PropertySchema::new(
            ALARM_ACTIONS,
            List,
            "A list of URLs (webhooks) to invoke when state transitions to alarm.",
        )
        .updatable(),
        PropertySchema::new(
            OK_ACTIONS,
            List,
            "A list of URLs (webhooks) to invoke when state transitions to ok.",
        )
        .updatable(),
        PropertySchema::new(
            INSUFFICIENT_DATA_ACTIONS,
            List,
            "A list of URLs (webhooks) to invoke when state transitions to insufficient-data.",
        )
        .updatable(),
        PropertySchema::new(
            REPEAT_ACTIONS,
            Boolean,
            "False to trigger actions when the threshold is reached AND the alarm's state has \
             changed. By default, actions are called each time the threshold is reached.",
        )
        .default_value(json!(true))
        .updatable(),
    ]
}

/// Properties of the single-metric alarm, common ones included.
#[must_use]
pub fn threshold_properties_schema() -> Vec<PropertySchema> {
    use PropertyKind::{Integer, Map, Number, String};

    let mut schema = vec![
        PropertySchema::new(
            COMPARISON_OPERATOR,
            String,
            "Operator used to compare specified statistic with threshold.",
        )
        .constraint(Constraint::AllowedValues(
            ComparisonOperator::ALL.iter().map(ComparisonOperator::as_str).collect(),
        ))
        .updatable(),
        PropertySchema::new(EVALUATION_PERIODS, Integer, "Number of periods to evaluate over.")
            .updatable(),
        PropertySchema::new(METER_NAME, String, "Meter name watched by the alarm.").required(),
        PropertySchema::new(PERIOD, Integer, "Period (seconds) to evaluate over.").updatable(),
        PropertySchema::new(STATISTIC, String, "Meter statistic to evaluate.")
            .constraint(Constraint::AllowedValues(
                Statistic::ALL.iter().map(Statistic::as_str).collect(),
            ))
            .updatable(),
        PropertySchema::new(THRESHOLD, Number, "Threshold to evaluate against.")
            .required()
            .updatable(),
        PropertySchema::new(
            MATCHING_METADATA,
            Map,
            "Meter should match this resource metadata (key=value) additionally to the meter_name.",
        )
        .default_value(json!({})),
    ];
    schema.extend(common_properties_schema());
    schema
}

/// Properties of the combination alarm, common ones included.
#[must_use]
pub fn combination_properties_schema() -> Vec<PropertySchema> {
    use PropertyKind::{List, String};

    let mut schema = vec![
        PropertySchema::new(ALARM_IDS, List, "List of alarm identifiers to combine.")
            .required()
            .constraint(Constraint::Length { min: 1 })
            .updatable(),
        PropertySchema::new(OPERATOR, String, "Operator used to combine the alarms.")
            .constraint(Constraint::AllowedValues(
                CombinationOperator::ALL.iter().map(CombinationOperator::as_str).collect(),
            ))
            .updatable(),
    ];
    schema.extend(common_properties_schema());
    schema
}
