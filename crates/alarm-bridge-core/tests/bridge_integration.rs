use std::sync::Arc;
use std::time::Duration;

use alarm_bridge_core::codec::Record;
use alarm_bridge_core::memory::{InMemoryCapability, PromptAnswer};
use alarm_bridge_core::{
    AlarmCapability, AlarmId, AuthorizationState, BridgeConfig, CommandDispatcher, EventEmitter,
    Reply,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::timeout;

struct Bridge {
    capability: Arc<InMemoryCapability>,
    dispatcher: CommandDispatcher<InMemoryCapability>,
    emitter: EventEmitter<InMemoryCapability>,
}

impl Bridge {
    fn new(capability: InMemoryCapability) -> Self {
        let capability = Arc::new(capability);
        Self {
            dispatcher: CommandDispatcher::new(Arc::clone(&capability), BridgeConfig::default()),
            emitter: EventEmitter::new(Arc::clone(&capability)),
            capability,
        }
    }

    async fn call(&self, method: &str, args: Value) -> Reply {
        let Value::Object(args) = args else {
            panic!("arguments must be an object");
        };
        self.dispatcher.dispatch(method, &args).await
    }
}

async fn next_record(receiver: &mut UnboundedReceiver<Record>) -> Record {
    timeout(Duration::from_secs(2), receiver.recv())
        .await
        .expect("event within timeout")
        .expect("stream open")
}

fn scheduled_id(reply: Reply) -> String {
    match reply {
        Reply::Success(Value::String(id)) => id,
        other => panic!("expected alarm id, got {other:?}"),
    }
}

#[tokio::test]
async fn one_shot_alarm_flows_from_command_to_events() {
    let bridge = Bridge::new(InMemoryCapability::new());
    let (sender, mut events) = mpsc::unbounded_channel::<Record>();
    bridge.emitter.subscribe(sender);

    let id = scheduled_id(
        bridge
            .call(
                "scheduleOneShot",
                json!({
                    "timestamp": 1_893_456_000_000_i64,
                    "label": " Standup ",
                    "tintColor": "#ff3b30",
                }),
            )
            .await,
    );

    let added = next_record(&mut events).await;
    assert_eq!(
        Value::Object(added),
        json!({
            "id": id,
            "event": "add",
            "alarm": {
                "id": id,
                "schedule": { "type": "fixed", "timestamp": 1_893_456_000_000_i64 },
                "state": "scheduled",
                "label": " Standup ",
            },
        })
    );

    bridge.capability.fire(id.parse().unwrap()).await.unwrap();
    let updated = next_record(&mut events).await;
    assert_eq!(updated.get("event"), Some(&json!("update")));
    assert_eq!(updated["alarm"]["state"], json!("ringing"));

    assert_eq!(
        bridge.call("stop", json!({ "id": id })).await,
        Reply::Success(json!(true))
    );
    let removed = next_record(&mut events).await;
    assert_eq!(Value::Object(removed), json!({ "id": id, "event": "remove" }));
}

#[tokio::test]
async fn recurring_alarm_survives_stop() {
    let bridge = Bridge::new(InMemoryCapability::new());
    let id = scheduled_id(
        bridge
            .call(
                "scheduleRecurring",
                json!({ "weekdayMask": 0b001_0101, "hour": 6, "minute": 45 }),
            )
            .await,
    );
    let alarm_id: AlarmId = id.parse().unwrap();

    bridge.capability.fire(alarm_id).await.unwrap();
    assert_eq!(
        bridge.call("stop", json!({ "id": id })).await,
        Reply::Success(json!(true))
    );

    let Reply::Success(listed) = bridge.call("listAlarms", json!({})).await else {
        panic!("listAlarms should succeed");
    };
    assert_eq!(
        listed,
        json!([{
            "id": id,
            "schedule": { "type": "relative", "hour": 6, "minute": 45 },
            "state": "scheduled",
            "label": "Alarm",
        }])
    );
}

#[tokio::test]
async fn countdown_alarm_has_no_schedule_key() {
    let bridge = Bridge::new(InMemoryCapability::new());
    let id = scheduled_id(
        bridge
            .call(
                "scheduleCountdown",
                json!({ "countdownDurationInSeconds": 300, "repeatDurationInSeconds": 60 }),
            )
            .await,
    );

    let alarms = bridge.capability.list_alarms().await.unwrap();
    assert_eq!(alarms.len(), 1);
    assert_eq!(alarms[0].id.as_str(), id);

    let Reply::Success(listed) = bridge.call("listAlarms", json!({})).await else {
        panic!("listAlarms should succeed");
    };
    assert_eq!(
        listed,
        json!([{ "id": id, "state": "countdown", "label": "Alarm" }])
    );
}

#[tokio::test]
async fn denied_user_cannot_schedule_and_sees_no_events() {
    let bridge = Bridge::new(InMemoryCapability::new().with_prompt_answer(PromptAnswer::Deny));
    let (sender, mut events) = mpsc::unbounded_channel::<Record>();
    bridge.emitter.subscribe(sender);

    for _ in 0..2 {
        let reply = bridge
            .call("scheduleOneShot", json!({ "timestamp": 1_893_456_000_000_i64 }))
            .await;
        let Reply::Error(payload) = reply else {
            panic!("expected an error, got {reply:?}");
        };
        assert_eq!(payload.code, "NOT_AUTHORIZED");
    }

    assert_eq!(bridge.capability.prompt_invocations(), 1);
    assert_eq!(
        bridge.capability.current_authorization_state(),
        AuthorizationState::Denied
    );
    assert!(timeout(Duration::from_millis(100), events.recv())
        .await
        .is_err());
}

#[tokio::test]
async fn unknown_command_is_reported_as_not_implemented() {
    let bridge = Bridge::new(InMemoryCapability::new());
    assert_eq!(
        bridge.call("snooze", json!({ "id": AlarmId::new().as_str() })).await,
        Reply::NotImplemented
    );
    assert_eq!(bridge.capability.prompt_invocations(), 0);
}

#[tokio::test]
async fn resubscribing_replays_current_alarms() {
    let bridge = Bridge::new(InMemoryCapability::new());
    let id = scheduled_id(
        bridge
            .call("scheduleOneShot", json!({ "timestamp": 1_893_456_000_000_i64 }))
            .await,
    );

    let (first_sender, mut first) = mpsc::unbounded_channel::<Record>();
    let handle = bridge.emitter.subscribe(first_sender);
    assert_eq!(next_record(&mut first).await["id"], json!(id));
    assert!(bridge.emitter.cancel(handle));

    let (second_sender, mut second) = mpsc::unbounded_channel::<Record>();
    bridge.emitter.subscribe(second_sender);
    let replayed = next_record(&mut second).await;
    assert_eq!(replayed["event"], json!("add"));
    assert_eq!(replayed["id"], json!(id));
}
