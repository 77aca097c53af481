//! End-to-end alarm lifecycles through the registry and in-memory services.

use std::sync::Arc;

use serde_json::{Value, json};

use stackform_alarms::{
    AlarmApi, AlarmCall, AlarmClients, AlarmError, AlarmResource, DefinitionContext,
    InMemoryAlarmApi, InMemoryWatchRuleStore, JsonFileWatchRuleStore, LifecycleState,
    PropertyMap, ResourceAttributes, ResourceDefinition, ResourceUpdate, WatchRuleStore,
    WatchState, registry,
};

struct Stack {
    api: Arc<InMemoryAlarmApi>,
    watch_rules: Arc<InMemoryWatchRuleStore>,
}

impl Stack {
    fn new() -> Self {
        Self {
            api: Arc::new(InMemoryAlarmApi::new()),
            watch_rules: Arc::new(InMemoryWatchRuleStore::new()),
        }
    }

    fn clients(&self) -> AlarmClients {
        AlarmClients::new(self.api.clone(), self.watch_rules.clone())
    }

    fn adapter(&self, definition: ResourceDefinition) -> Box<dyn AlarmResource> {
        let type_name = definition.resource_type.clone();
        let context = Arc::new(DefinitionContext::new(definition));
        registry()
            .instantiate(&type_name, context, self.clients())
            .unwrap()
    }
}

fn hook(url: &str) -> ResourceAttributes {
    let mut attrs = ResourceAttributes::new();
    attrs.insert("AlarmUrl".to_string(), json!(url));
    attrs
}

fn cpu_alarm() -> ResourceDefinition {
    let mut definition = ResourceDefinition::new("OS::Ceilometer::Alarm", "cpu_high")
        .with_stack_name("web")
        .with_property("meter_name", json!("cpu_util"))
        .with_property("statistic", json!("avg"))
        .with_property("period", json!(60))
        .with_property("evaluation_periods", json!(1))
        .with_property("threshold", json!(50))
        .with_property("comparison_operator", json!("gt"))
        .with_property("alarm_actions", json!(["ScaleUpPolicy", "http://ops/page", ""]))
        .with_property("matching_metadata", json!({"instance_type": "m1.small"}))
        .with_resource("ScaleUpPolicy", hook("http://heat/scale-up"));
    definition.physical_name = Some("web-cpu_high-abc".to_string());
    definition.stack_id = Some("stack-web".to_string());
    definition
}

fn combined_alarm() -> ResourceDefinition {
    ResourceDefinition::new("OS::Ceilometer::CombinationAlarm", "both_high")
        .with_stack_name("web")
        .with_property("alarm_ids", json!(["a", "b"]))
        .with_property("operator", json!("and"))
        .with_property("ok_actions", json!(["Pager"]))
        .with_resource("Pager", hook("http://pager/ok"))
}

fn created_payload(api: &InMemoryAlarmApi) -> PropertyMap {
    match api.calls().first() {
        Some(AlarmCall::Create(payload)) => payload.clone(),
        other => panic!("expected a create call, got {other:?}"),
    }
}

#[test]
fn test_threshold_alarm_full_lifecycle() {
    let stack = Stack::new();
    let mut alarm = stack.adapter(cpu_alarm());

    alarm.validate().unwrap();
    alarm.handle_create().unwrap();
    let alarm_id = alarm.resource_id().unwrap().to_string();
    assert_eq!(alarm.state(), LifecycleState::Active);

    let payload = created_payload(&stack.api);
    assert_eq!(payload["name"], json!("web-cpu_high-abc"));
    assert_eq!(
        payload["alarm_actions"],
        json!(["http://heat/scale-up", "http://ops/page"])
    );
    assert_eq!(
        payload["matching_metadata"],
        json!({"metadata.user_metadata.instance_type": "m1.small"})
    );
    assert_eq!(payload["enabled"], json!(true));
    assert_eq!(payload["repeat_actions"], json!(true));

    let rule = stack.watch_rules.load("web-cpu_high-abc").unwrap();
    assert_eq!(rule.state, WatchState::CeilometerControlled);
    assert_eq!(rule.stack_id, "stack-web");
    assert_eq!(rule.rule["alarm_actions"], json!(["ScaleUpPolicy", "http://ops/page", ""]));

    let mut diff = PropertyMap::new();
    diff.insert("threshold".to_string(), json!(80));
    alarm.handle_update(&ResourceUpdate::properties(diff)).unwrap();
    assert_eq!(stack.api.get(&alarm_id).unwrap().fields["threshold"], json!(80));

    alarm.handle_suspend().unwrap();
    assert_eq!(alarm.state(), LifecycleState::Suspended);
    assert_eq!(stack.api.get(&alarm_id).unwrap().fields["enabled"], json!(false));

    alarm.handle_resume().unwrap();
    assert_eq!(alarm.state(), LifecycleState::Active);
    assert_eq!(stack.api.get(&alarm_id).unwrap().fields["enabled"], json!(true));

    alarm.handle_delete().unwrap();
    assert_eq!(alarm.state(), LifecycleState::Deleted);
    assert!(stack.api.is_empty());
    assert!(stack.watch_rules.is_empty());
}

#[test]
fn test_non_compute_meter_keeps_metering_namespace() {
    let stack = Stack::new();
    let definition = ResourceDefinition::new("OS::Ceilometer::Alarm", "image_big")
        .with_property("meter_name", json!("image.size"))
        .with_property("threshold", json!(1024))
        .with_property("matching_metadata", json!({"metering.owner": "x", "zone": "a"}));
    let alarm = stack.adapter(definition);

    let payload = alarm.create_payload().unwrap();
    assert_eq!(
        payload["matching_metadata"],
        json!({"metadata.metering.owner": "x", "metadata.metering.zone": "a"})
    );
}

#[test]
fn test_combination_alarm_full_lifecycle() {
    let stack = Stack::new();
    let mut alarm = stack.adapter(combined_alarm());

    alarm.validate().unwrap();
    alarm.handle_create().unwrap();
    let alarm_id = alarm.resource_id().unwrap().to_string();

    let payload = created_payload(&stack.api);
    assert_eq!(payload["type"], json!("combination"));
    assert_eq!(payload["ok_actions"], json!(["http://pager/ok"]));
    assert_eq!(
        payload["combination_rule"],
        json!({"alarm_ids": ["a", "b"], "operator": "and", "repeat_actions": true})
    );
    assert!(!payload.contains_key("alarm_ids"));
    assert!(stack.watch_rules.is_empty());

    let mut diff = PropertyMap::new();
    diff.insert("alarm_ids".to_string(), json!(["a", "b", "c"]));
    alarm.handle_update(&ResourceUpdate::properties(diff)).unwrap();
    assert_eq!(
        stack.api.get(&alarm_id).unwrap().fields["combination_rule"],
        json!({"alarm_ids": ["a", "b", "c"]})
    );

    alarm.handle_suspend().unwrap();
    alarm.handle_resume().unwrap();
    alarm.handle_delete().unwrap();
    assert!(stack.api.is_empty());
}

#[test]
fn test_delete_twice_succeeds() {
    for definition in [cpu_alarm(), combined_alarm()] {
        let stack = Stack::new();
        let mut alarm = stack.adapter(definition);
        alarm.handle_create().unwrap();

        alarm.handle_delete().unwrap();
        alarm.handle_delete().unwrap();
        assert_eq!(alarm.state(), LifecycleState::Deleted);
    }
}

#[test]
fn test_delete_after_out_of_band_removal() {
    let stack = Stack::new();
    let mut alarm = stack.adapter(cpu_alarm());
    alarm.handle_create().unwrap();
    let alarm_id = alarm.resource_id().unwrap().to_string();

    assert!(stack.api.remove_out_of_band(&alarm_id));
    stack.watch_rules.destroy("web-cpu_high-abc").unwrap();

    alarm.handle_delete().unwrap();
    assert_eq!(alarm.state(), LifecycleState::Deleted);
}

#[test]
fn test_delete_propagates_service_failure() {
    let stack = Stack::new();
    let mut alarm = stack.adapter(combined_alarm());
    alarm.handle_create().unwrap();

    stack.api.set_unavailable(true);
    let err = alarm.handle_delete().unwrap_err();
    assert!(matches!(err, AlarmError::Api { status: 503, .. }));
    assert_eq!(alarm.state(), LifecycleState::Active);
}

#[test]
fn test_lifecycle_before_create_is_a_noop() {
    for definition in [cpu_alarm(), combined_alarm()] {
        let stack = Stack::new();
        let mut alarm = stack.adapter(definition);

        alarm.handle_suspend().unwrap();
        alarm.handle_resume().unwrap();
        alarm.handle_delete().unwrap();
        assert!(stack.api.calls().is_empty());
    }
}

#[test]
fn test_update_before_create_is_rejected() {
    let stack = Stack::new();
    let mut alarm = stack.adapter(combined_alarm());

    let mut diff = PropertyMap::new();
    diff.insert("operator".to_string(), json!("or"));
    let err = alarm
        .handle_update(&ResourceUpdate::properties(diff))
        .unwrap_err();
    assert!(matches!(err, AlarmError::NotCreated { .. }));
    assert!(stack.api.calls().is_empty());
}

#[test]
fn test_empty_update_sends_nothing() {
    let stack = Stack::new();
    let mut alarm = stack.adapter(cpu_alarm());
    alarm.handle_create().unwrap();

    alarm.handle_update(&ResourceUpdate::default()).unwrap();
    assert_eq!(stack.api.calls().len(), 1);
}

#[test]
fn test_missing_required_property_fails_validation() {
    let stack = Stack::new();
    let definition = ResourceDefinition::new("OS::Ceilometer::Alarm", "no_meter")
        .with_property("threshold", json!(10));
    let alarm = stack.adapter(definition);

    let err = alarm.validate().unwrap_err();
    assert!(matches!(err, AlarmError::InvalidProperty { ref name, .. } if name == "meter_name"));
}

#[test]
fn test_watch_rules_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let api = Arc::new(InMemoryAlarmApi::new());

    let store = Arc::new(JsonFileWatchRuleStore::open(dir.path()).unwrap());
    let context = Arc::new(DefinitionContext::new(cpu_alarm()));
    let mut alarm = registry()
        .instantiate(
            "OS::Ceilometer::Alarm",
            context,
            AlarmClients::new(api.clone(), store),
        )
        .unwrap();
    alarm.handle_create().unwrap();
    let alarm_id = alarm.resource_id().unwrap().to_string();

    let reopened = Arc::new(JsonFileWatchRuleStore::open(dir.path()).unwrap());
    let rule = reopened.load("web-cpu_high-abc").unwrap();
    assert_eq!(rule.rule["meter_name"], Value::from("cpu_util"));

    let context = Arc::new(DefinitionContext::new(cpu_alarm()));
    let mut reloaded = registry()
        .instantiate(
            "OS::Ceilometer::Alarm",
            context,
            AlarmClients::new(api.clone(), reopened.clone()),
        )
        .unwrap();
    reloaded.attach(alarm_id);
    reloaded.handle_delete().unwrap();

    assert!(api.is_empty());
    assert!(reopened.load("web-cpu_high-abc").unwrap_err().is_not_found());
}
