//! HTTP client for the alarm service's v2 REST API.
//!
//! The adapters speak the legacy flat alarm shape. The v2 API nests the
//! threshold fields in a `threshold_rule` and expresses matching metadata as
//! a `query`, so every body is converted by [`v2_alarm_body`] before it is
//! sent.

use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde_json::{Value, json};
use tracing::{debug, trace};

use crate::client::{Alarm, AlarmApi};
use crate::config::AlarmServiceConfig;
use crate::error::{AlarmError, Result};
use crate::schema::{
    COMPARISON_OPERATOR, EVALUATION_PERIODS, MATCHING_METADATA, METER_NAME, PERIOD, STATISTIC,
    THRESHOLD,
};
use crate::transform::COMBINATION_RULE;
use crate::types::PropertyMap;

/// Rule object of a threshold alarm in the v2 API.
pub const THRESHOLD_RULE: &str = "threshold_rule";

/// Alarm type of a threshold alarm in the v2 API.
pub const THRESHOLD_TYPE: &str = "threshold";

/// Sample filter built from matching metadata.
pub const QUERY: &str = "query";

const THRESHOLD_RULE_FIELDS: [&str; 7] = [
    METER_NAME,
    COMPARISON_OPERATOR,
    THRESHOLD,
    STATISTIC,
    EVALUATION_PERIODS,
    PERIOD,
    QUERY,
];

/// Header carrying the auth token.
const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Blocking client for `/v2/alarms`.
///
/// Updates are read-merge-write: the alarm is fetched, the changed fields
/// are merged in and the whole document is put back.
#[derive(Debug, Clone)]
pub struct HttpAlarmClient {
    client: Client,
    endpoint: String,
    auth_token: Option<String>,
}

impl HttpAlarmClient {
    /// Builds a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `AlarmError::Transport` if the HTTP client cannot be built.
    pub fn new(config: &AlarmServiceConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        })
    }

    /// URL of the alarm collection.
    #[must_use]
    pub fn alarms_url(&self) -> String {
        format!("{}/v2/alarms", self.endpoint)
    }

    /// URL of one alarm.
    #[must_use]
    pub fn alarm_url(&self, alarm_id: &str) -> String {
        format!("{}/v2/alarms/{alarm_id}", self.endpoint)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.header(AUTH_TOKEN_HEADER, token),
            None => request,
        }
    }

    fn send(&self, request: RequestBuilder, alarm_id: Option<&str>) -> Result<Response> {
        let response = self.authorized(request).send()?;
        let status = response.status();
        trace!(status = status.as_u16(), "alarm service responded");
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(status_error(status, &body, alarm_id))
    }
}

/// Converts a legacy alarm body to the v2 document shape.
///
/// `matching_metadata` becomes a `query` of `eq` terms and the threshold
/// fields move into `threshold_rule`. Bodies carrying a `combination_rule`
/// are already in v2 shape. On create the result always has a type and a
/// rule; on update only when a rule field changed.
#[must_use]
pub fn v2_alarm_body(legacy: &PropertyMap, create: bool) -> PropertyMap {
    let mut body = legacy.clone();
    if body.contains_key(COMBINATION_RULE) {
        return body;
    }

    if let Some(metadata) = body.remove(MATCHING_METADATA) {
        let query: Vec<Value> = metadata
            .as_object()
            .into_iter()
            .flatten()
            .map(|(field, value)| json!({"field": field, "op": "eq", "value": value}))
            .collect();
        body.insert(QUERY.to_string(), Value::Array(query));
    }

    let rule: PropertyMap = THRESHOLD_RULE_FIELDS
        .into_iter()
        .filter_map(|field| body.remove(field).map(|value| (field.to_string(), value)))
        .collect();
    if create || !rule.is_empty() {
        body.entry("type").or_insert_with(|| json!(THRESHOLD_TYPE));
        body.insert(THRESHOLD_RULE.to_string(), Value::Object(rule));
    }
    body
}

/// Merges converted changes into a stored alarm document.
///
/// Nested objects such as `threshold_rule` are merged one level deep, so a
/// changed threshold keeps the rule's other fields.
fn merge_changes(document: &mut PropertyMap, changes: PropertyMap) {
    for (key, value) in changes {
        match value {
            Value::Object(nested) if document.get(&key).is_some_and(Value::is_object) => {
                if let Some(Value::Object(current)) = document.get_mut(&key) {
                    current.extend(nested);
                }
            }
            value => {
                document.insert(key, value);
            }
        }
    }
}

/// Maps a non-success response to an [`AlarmError`].
#[must_use]
pub fn status_error(status: StatusCode, body: &str, alarm_id: Option<&str>) -> AlarmError {
    match (status, alarm_id) {
        (StatusCode::NOT_FOUND, Some(id)) => AlarmError::AlarmNotFound { id: id.to_string() },
        _ => AlarmError::Api {
            status: status.as_u16(),
            message: if body.is_empty() {
                status.canonical_reason().unwrap_or("unknown").to_string()
            } else {
                body.to_string()
            },
        },
    }
}

impl AlarmApi for HttpAlarmClient {
    fn create(&self, payload: &PropertyMap) -> Result<Alarm> {
        debug!(url = %self.alarms_url(), "creating alarm");
        let body = v2_alarm_body(payload, true);
        let response = self.send(self.client.post(self.alarms_url()).json(&body), None)?;
        Ok(response.json()?)
    }

    fn update(&self, alarm_id: &str, changes: &PropertyMap) -> Result<()> {
        let mut alarm = self.get(alarm_id)?;
        merge_changes(&mut alarm.fields, v2_alarm_body(changes, false));
        debug!(alarm_id, fields = changes.len(), "updating alarm");
        self.send(
            self.client.put(self.alarm_url(alarm_id)).json(&alarm),
            Some(alarm_id),
        )?;
        Ok(())
    }

    fn delete(&self, alarm_id: &str) -> Result<()> {
        debug!(alarm_id, "deleting alarm");
        self.send(self.client.delete(self.alarm_url(alarm_id)), Some(alarm_id))?;
        Ok(())
    }

    fn get(&self, alarm_id: &str) -> Result<Alarm> {
        let response = self.send(self.client.get(self.alarm_url(alarm_id)), Some(alarm_id))?;
        Ok(response.json()?)
    }
}
