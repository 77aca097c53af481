//! Core types shared by the alarm adapters.
//!
//! - [`ComparisonOperator`]: how a statistic is compared with the threshold
//! - [`Statistic`]: which aggregate of the meter is evaluated
//! - [`CombinationOperator`]: how combined alarms are joined
//! - [`LifecycleState`]: where an adapter is in the stack lifecycle
//! - [`PropertyMap`]: property name to JSON value mapping

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AlarmError;

/// A property mapping, also used as the alarm API payload.
pub type PropertyMap = serde_json::Map<String, serde_json::Value>;

/// Operator used to compare the evaluated statistic with the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonOperator {
    /// Greater than or equal.
    Ge,
    /// Greater than.
    Gt,
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
}

impl ComparisonOperator {
    /// Every operator, in declaration order.
    pub const ALL: [Self; 6] = [Self::Ge, Self::Gt, Self::Eq, Self::Ne, Self::Lt, Self::Le];

    /// Returns the wire name of the operator.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ge => "ge",
            Self::Gt => "gt",
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Lt => "lt",
            Self::Le => "le",
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ComparisonOperator {
    type Err = AlarmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| {
                AlarmError::invalid_property("comparison_operator", format!("unknown operator '{s}'"))
            })
    }
}

/// Meter statistic evaluated by a single-metric alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    /// Number of samples.
    Count,
    /// Average of the samples.
    Avg,
    /// Sum of the samples.
    Sum,
    /// Smallest sample.
    Min,
    /// Largest sample.
    Max,
}

impl Statistic {
    /// Every statistic, in declaration order.
    pub const ALL: [Self; 5] = [Self::Count, Self::Avg, Self::Sum, Self::Min, Self::Max];

    /// Returns the wire name of the statistic.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Avg => "avg",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Statistic {
    type Err = AlarmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stat| stat.as_str() == s)
            .ok_or_else(|| AlarmError::invalid_property("statistic", format!("unknown statistic '{s}'")))
    }
}

/// Boolean operator joining the alarms of a combination alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombinationOperator {
    /// All combined alarms must be in alarm.
    And,
    /// Any combined alarm may be in alarm.
    Or,
}

impl CombinationOperator {
    /// Every operator, in declaration order.
    pub const ALL: [Self; 2] = [Self::And, Self::Or];

    /// Returns the wire name of the operator.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

impl fmt::Display for CombinationOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CombinationOperator {
    type Err = AlarmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| AlarmError::invalid_property("operator", format!("unknown operator '{s}'")))
    }
}

/// Lifecycle position of an alarm adapter.
///
/// The host engine drives every transition; the adapter only records
/// where the last successful callback left it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    /// No external alarm has been created.
    #[default]
    Absent,
    /// The external alarm exists and is evaluating.
    Active,
    /// The external alarm exists but is disabled.
    Suspended,
    /// The external alarm was removed.
    Deleted,
}

impl LifecycleState {
    /// Returns the state as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
