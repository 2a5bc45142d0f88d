use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use permissions_broker::{
    GrantState, PermissionPrompter, PromptRequest, RequestIds, Resolution, SurfaceBinding,
};
use serde_json::json;
use smsbridge_core_types::{BridgeError, PermissionRight, PermissionStatus};
use smsbridge_event_bus::{
    event_channel, Clock, EventStreamBridge, InboundSms, InboundSmsAssembler, NotificationHub,
    SmsPart, SmsStatusAssembler, SmsStatusNotification, StreamEvent, StreamState,
    ThreadResolver,
};
use tokio::sync::mpsc::UnboundedReceiver;

#[derive(Default)]
struct StaticGrants {
    granted: Mutex<HashSet<PermissionRight>>,
}

impl StaticGrants {
    fn with(rights: &[PermissionRight]) -> Arc<Self> {
        Arc::new(Self {
            granted: Mutex::new(rights.iter().copied().collect()),
        })
    }
}

impl GrantState for StaticGrants {
    fn is_granted(&self, right: PermissionRight) -> bool {
        self.granted.lock().unwrap().contains(&right)
    }
}

#[derive(Default)]
struct RecordingPrompter {
    prompts: Mutex<Vec<PromptRequest>>,
}

impl RecordingPrompter {
    fn last(&self) -> PromptRequest {
        self.prompts.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait::async_trait]
impl PermissionPrompter for RecordingPrompter {
    async fn prompt(&self, request: PromptRequest) -> Result<(), BridgeError> {
        self.prompts.lock().unwrap().push(request);
        Ok(())
    }
}

struct Threads;

impl ThreadResolver for Threads {
    fn thread_id_for(&self, _address: &str) -> Result<i64, BridgeError> {
        Ok(4)
    }
}

struct FrozenClock;

impl Clock for FrozenClock {
    fn now_millis(&self) -> i64 {
        1_000
    }
}

const INBOUND_RIGHTS: [PermissionRight; 2] =
    [PermissionRight::ReceiveSms, PermissionRight::ReadSms];

fn inbound_bridge(
    grants: Arc<StaticGrants>,
) -> (EventStreamBridge<InboundSms>, Arc<NotificationHub<InboundSms>>) {
    let hub = NotificationHub::new();
    let bridge = EventStreamBridge::new(
        "recvSMS",
        INBOUND_RIGHTS.to_vec(),
        hub.clone(),
        Arc::new(InboundSmsAssembler::new(
            Arc::new(Threads),
            Arc::new(FrozenClock),
        )),
        grants,
        Arc::new(RequestIds::default()),
    );
    (bridge, hub)
}

fn sms(parts: &[&str]) -> InboundSms {
    InboundSms::new(
        parts
            .iter()
            .map(|body| SmsPart {
                originating_address: Some("555".into()),
                body: Some((*body).into()),
                timestamp_millis: 900,
                status_on_icc: 0,
            })
            .collect(),
    )
}

fn drain(rx: &mut UnboundedReceiver<StreamEvent>) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn granted_stream_forwards_events() {
    let (bridge, hub) = inbound_bridge(StaticGrants::with(&INBOUND_RIGHTS));
    let (sink, mut rx) = event_channel();

    bridge.on_open(sink).await.unwrap();
    assert_eq!(bridge.state(), StreamState::Listening);
    assert_eq!(hub.emit(sms(&["hi"])), 1);

    assert_eq!(
        drain(&mut rx),
        vec![StreamEvent::Data(json!({
            "address": "555",
            "date": 1_000,
            "date_sent": 900,
            "read": 0,
            "thread_id": 4,
            "body": "hi",
        }))]
    );
}

#[tokio::test]
async fn multipart_message_is_one_event() {
    let (bridge, hub) = inbound_bridge(StaticGrants::with(&INBOUND_RIGHTS));
    let (sink, mut rx) = event_channel();
    bridge.on_open(sink).await.unwrap();

    hub.emit(sms(&["split ", "in ", "three"]));

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    let StreamEvent::Data(event) = &events[0] else {
        panic!("expected data, got {:?}", events[0]);
    };
    assert_eq!(event["body"], "split in three");
}

#[tokio::test]
async fn malformed_notification_is_dropped_and_stream_stays_open() {
    let (bridge, hub) = inbound_bridge(StaticGrants::with(&INBOUND_RIGHTS));
    let (sink, mut rx) = event_channel();
    bridge.on_open(sink).await.unwrap();

    hub.emit(InboundSms::default());
    assert!(drain(&mut rx).is_empty());
    assert_eq!(bridge.state(), StreamState::Listening);

    hub.emit(sms(&["after"]));
    assert_eq!(drain(&mut rx).len(), 1);
}

#[tokio::test]
async fn denial_ends_the_stream_and_unregisters() {
    let (bridge, hub) = inbound_bridge(Arc::new(StaticGrants::default()));
    let prompter = Arc::new(RecordingPrompter::default());
    bridge.gate().bind_prompter(Some(prompter.clone()));
    let (sink, mut rx) = event_channel();

    bridge.on_open(sink).await.unwrap();
    let prompt = prompter.last();
    assert_eq!(prompt.rights, INBOUND_RIGHTS.to_vec());

    let resolution = bridge
        .on_permission_result(
            prompt.request_id,
            &[PermissionStatus::Granted, PermissionStatus::Denied],
        )
        .await;

    assert_eq!(resolution, Resolution::Handled);
    assert_eq!(drain(&mut rx), vec![StreamEvent::End]);
    assert_eq!(bridge.state(), StreamState::Idle);
    assert_eq!(hub.listener_count(), 0);
}

#[tokio::test]
async fn grant_after_prompt_keeps_listening() {
    let (bridge, hub) = inbound_bridge(Arc::new(StaticGrants::default()));
    let prompter = Arc::new(RecordingPrompter::default());
    bridge.gate().bind_prompter(Some(prompter.clone()));
    let (sink, mut rx) = event_channel();
    bridge.on_open(sink).await.unwrap();

    let id = prompter.last().request_id;
    let resolution = bridge
        .on_permission_result(id, &[PermissionStatus::Granted, PermissionStatus::Granted])
        .await;

    assert!(resolution.is_handled());
    assert_eq!(bridge.state(), StreamState::Listening);
    hub.emit(sms(&["ok"]));
    assert_eq!(drain(&mut rx).len(), 1);
}

#[tokio::test]
async fn missing_surface_ends_the_stream() {
    let (bridge, hub) = inbound_bridge(Arc::new(StaticGrants::default()));
    let (sink, mut rx) = event_channel();

    bridge.on_open(sink).await.unwrap();

    assert_eq!(drain(&mut rx), vec![StreamEvent::End]);
    assert_eq!(bridge.state(), StreamState::Idle);
    assert_eq!(hub.listener_count(), 0);
}

#[tokio::test]
async fn cancel_without_open_is_a_no_op() {
    let (bridge, hub) = inbound_bridge(StaticGrants::with(&INBOUND_RIGHTS));
    assert!(!bridge.on_cancel());
    assert_eq!(bridge.state(), StreamState::Idle);

    let (sink, mut rx) = event_channel();
    bridge.on_open(sink).await.unwrap();
    assert!(bridge.on_cancel());
    assert!(!bridge.on_cancel());
    assert_eq!(hub.listener_count(), 0);

    hub.emit(sms(&["late"]));
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn reopening_replaces_the_previous_subscription() {
    let (bridge, hub) = inbound_bridge(StaticGrants::with(&INBOUND_RIGHTS));
    let (first, mut first_rx) = event_channel();
    let (second, mut second_rx) = event_channel();

    bridge.on_open(first).await.unwrap();
    bridge.on_open(second).await.unwrap();
    assert_eq!(hub.listener_count(), 1);

    hub.emit(sms(&["x"]));
    assert!(drain(&mut first_rx).is_empty());
    assert_eq!(drain(&mut second_rx).len(), 1);
}

#[tokio::test]
async fn stale_denial_does_not_close_a_newer_subscription() {
    let (bridge, hub) = inbound_bridge(Arc::new(StaticGrants::default()));
    let prompter = Arc::new(RecordingPrompter::default());
    bridge.gate().bind_prompter(Some(prompter.clone()));

    let (first, _first_rx) = event_channel();
    bridge.on_open(first).await.unwrap();
    let stale = prompter.last().request_id;

    let (second, mut second_rx) = event_channel();
    bridge.on_open(second).await.unwrap();

    bridge
        .on_permission_result(stale, &[PermissionStatus::Denied])
        .await;

    assert_eq!(bridge.state(), StreamState::Listening);
    assert!(drain(&mut second_rx).is_empty());
    assert_eq!(hub.listener_count(), 1);
}

#[tokio::test]
async fn status_stream_reports_delivery_states() {
    let hub = NotificationHub::new();
    let bridge = EventStreamBridge::new(
        "statusSMS",
        vec![PermissionRight::ReceiveSms],
        hub.clone(),
        Arc::new(SmsStatusAssembler),
        StaticGrants::with(&[PermissionRight::ReceiveSms]),
        Arc::new(RequestIds::default()),
    );
    let (sink, mut rx) = event_channel();
    bridge.on_open(sink).await.unwrap();

    hub.emit(SmsStatusNotification::sent(9, true));
    hub.emit(SmsStatusNotification::delivered(9, true));
    hub.emit(SmsStatusNotification::sent(10, false));

    assert_eq!(
        drain(&mut rx),
        vec![
            StreamEvent::Data(json!({"sentId": 9, "state": "sent"})),
            StreamEvent::Data(json!({"sentId": 9, "state": "delivered"})),
            StreamEvent::Data(json!({"sentId": 10, "state": "fail"})),
        ]
    );
}

#[tokio::test]
async fn nothing_is_forwarded_while_the_prompt_is_open() {
    let (bridge, hub) = inbound_bridge(Arc::new(StaticGrants::default()));
    let prompter = Arc::new(RecordingPrompter::default());
    bridge.gate().bind_prompter(Some(prompter.clone()));
    let (sink, mut rx) = event_channel();
    bridge.on_open(sink).await.unwrap();

    hub.emit(sms(&["secret"]));
    assert!(drain(&mut rx).is_empty());

    bridge
        .on_permission_result(
            prompter.last().request_id,
            &[PermissionStatus::Granted, PermissionStatus::Granted],
        )
        .await;
    hub.emit(sms(&["after grant"]));
    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    let StreamEvent::Data(event) = &events[0] else {
        panic!("expected data, got {:?}", events[0]);
    };
    assert_eq!(event["body"], "after grant");
}

#[tokio::test]
async fn denied_stream_never_forwards_pending_notifications() {
    let (bridge, hub) = inbound_bridge(Arc::new(StaticGrants::default()));
    let prompter = Arc::new(RecordingPrompter::default());
    bridge.gate().bind_prompter(Some(prompter.clone()));
    let (sink, mut rx) = event_channel();
    bridge.on_open(sink).await.unwrap();

    hub.emit(sms(&["secret"]));
    bridge
        .on_permission_result(
            prompter.last().request_id,
            &[PermissionStatus::Denied, PermissionStatus::Denied],
        )
        .await;

    assert_eq!(drain(&mut rx), vec![StreamEvent::End]);
}

#[tokio::test]
async fn stale_grant_does_not_open_a_newer_subscription() {
    let (bridge, hub) = inbound_bridge(Arc::new(StaticGrants::default()));
    let prompter = Arc::new(RecordingPrompter::default());
    bridge.gate().bind_prompter(Some(prompter.clone()));

    let (first, _first_rx) = event_channel();
    bridge.on_open(first).await.unwrap();
    let stale = prompter.last().request_id;
    let (second, mut second_rx) = event_channel();
    bridge.on_open(second).await.unwrap();

    bridge
        .on_permission_result(stale, &[PermissionStatus::Granted, PermissionStatus::Granted])
        .await;
    hub.emit(sms(&["too early"]));
    assert!(drain(&mut second_rx).is_empty());
}
