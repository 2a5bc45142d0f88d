use permissions_broker::{
    Admission, GateOutcome, GrantState, OperationRunner, PendingOperation, PermissionGate,
    PermissionPrompter, PromptRequest, RequestId, RequestIds, Resolution, SurfaceBinding,
};
use smsbridge_core_types::{
    response_channel, BridgeError, PermissionRight, PermissionStatus, ResponseHandle,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

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

#[async_trait::async_trait]
impl PermissionPrompter for RecordingPrompter {
    async fn prompt(&self, request: PromptRequest) -> Result<(), BridgeError> {
        self.prompts.lock().unwrap().push(request);
        Ok(())
    }
}

struct FailingPrompter;

#[async_trait::async_trait]
impl PermissionPrompter for FailingPrompter {
    async fn prompt(&self, _request: PromptRequest) -> Result<(), BridgeError> {
        Err(BridgeError::Internal("surface gone".into()))
    }
}

#[derive(Default)]
struct EchoRunner {
    runs: AtomicUsize,
}

#[async_trait::async_trait]
impl OperationRunner<PendingOperation<String>> for EchoRunner {
    async fn run(&self, pending: PendingOperation<String>) {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let (request, sink) = pending.into_parts();
        sink.success(serde_json::json!(request));
    }
}

const READ: [PermissionRight; 1] = [PermissionRight::ReadSms];

fn gate(grants: Arc<StaticGrants>) -> PermissionGate<PendingOperation<String>> {
    PermissionGate::new(
        "messages",
        "permission denied",
        grants,
        Arc::new(RequestIds::default()),
    )
}

fn operation(value: &str) -> (PendingOperation<String>, ResponseHandle) {
    let (sink, handle) = response_channel();
    (PendingOperation::new("getInbox", value.to_string(), sink), handle)
}

#[tokio::test]
async fn granted_rights_run_before_request_returns() {
    let gate = gate(StaticGrants::with(&READ));
    let prompter = Arc::new(RecordingPrompter::default());
    gate.bind_prompter(Some(prompter.clone()));
    let runner = EchoRunner::default();
    let (op, mut handle) = operation("inbox");

    let admission = gate.request(&READ, op, &runner).await;

    assert_eq!(admission, Admission::Immediate);
    assert!(prompter.prompts.lock().unwrap().is_empty());
    let reply = handle.try_take().expect("reply already sent").unwrap();
    assert_eq!(reply.as_value(), Some(&serde_json::json!("inbox")));
}

#[tokio::test]
async fn missing_rights_issue_one_prompt_and_defer() {
    let gate = gate(StaticGrants::with(&[]));
    let prompter = Arc::new(RecordingPrompter::default());
    gate.bind_prompter(Some(prompter.clone()));
    let runner = EchoRunner::default();
    let (op, mut handle) = operation("inbox");

    let admission = gate.request(&READ, op, &runner).await;

    let Admission::Deferred(id) = admission else {
        panic!("expected a deferred admission, got {admission:?}");
    };
    let prompts = prompter.prompts.lock().unwrap().clone();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].request_id, id);
    assert_eq!(prompts[0].permissions, vec!["android.permission.READ_SMS"]);
    assert!(handle.try_take().is_none());
    assert!(gate.is_outstanding(id));
}

#[tokio::test]
async fn grant_resumes_the_parked_operation() {
    let gate = gate(StaticGrants::with(&[]));
    gate.bind_prompter(Some(Arc::new(RecordingPrompter::default())));
    let runner = EchoRunner::default();
    let (op, handle) = operation("sent");

    let Admission::Deferred(id) = gate.request(&READ, op, &runner).await else {
        panic!("expected deferral");
    };
    let resolution = gate
        .resolve(id, &[PermissionStatus::Granted], &runner)
        .await;

    assert_eq!(resolution, Resolution::Handled);
    let reply = handle.wait().await.unwrap();
    assert_eq!(reply.as_value(), Some(&serde_json::json!("sent")));
}

#[tokio::test]
async fn any_denied_right_fails_with_permission_denied() {
    let gate = gate(StaticGrants::with(&[]));
    gate.bind_prompter(Some(Arc::new(RecordingPrompter::default())));
    let runner = EchoRunner::default();
    let (op, handle) = operation("inbox");
    let rights = [PermissionRight::SendSms, PermissionRight::ReadPhoneState];

    let Admission::Deferred(id) = gate.request(&rights, op, &runner).await else {
        panic!("expected deferral");
    };
    gate.resolve(
        id,
        &[PermissionStatus::Granted, PermissionStatus::Denied],
        &runner,
    )
    .await;

    let err = handle.wait().await.unwrap_err();
    assert_eq!(err.code(), "#01");
    assert_eq!(err.to_string(), "permission denied");
    assert_eq!(runner.runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn duplicate_resolution_runs_once() {
    let gate = gate(StaticGrants::with(&[]));
    gate.bind_prompter(Some(Arc::new(RecordingPrompter::default())));
    let runner = EchoRunner::default();
    let (op, _handle) = operation("inbox");

    let Admission::Deferred(id) = gate.request(&READ, op, &runner).await else {
        panic!("expected deferral");
    };
    let first = gate.resolve(id, &[PermissionStatus::Granted], &runner).await;
    let second = gate.resolve(id, &[PermissionStatus::Granted], &runner).await;

    assert_eq!(first, Resolution::Handled);
    assert_eq!(second, Resolution::NotMine);
    assert_eq!(runner.runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn foreign_request_ids_are_not_mine() {
    let gate = gate(StaticGrants::with(&[]));
    let runner = EchoRunner::default();
    let resolution = gate
        .resolve(RequestId(9_999), &[PermissionStatus::Granted], &runner)
        .await;
    assert_eq!(resolution, Resolution::NotMine);
}

#[tokio::test]
async fn no_surface_rejects_without_parking() {
    let gate = gate(StaticGrants::with(&[]));
    let runner = EchoRunner::default();
    let (op, handle) = operation("inbox");

    let admission = gate.request(&READ, op, &runner).await;

    assert_eq!(admission, Admission::Rejected);
    assert_eq!(gate.outstanding(), 0);
    assert_eq!(handle.wait().await.unwrap_err(), BridgeError::NoSurface);
}

#[tokio::test]
async fn failed_prompt_releases_the_slot() {
    let gate = gate(StaticGrants::with(&[]));
    gate.bind_prompter(Some(Arc::new(FailingPrompter)));
    let runner = EchoRunner::default();
    let (op, handle) = operation("inbox");

    assert_eq!(gate.request(&READ, op, &runner).await, Admission::Rejected);
    assert_eq!(gate.outstanding(), 0);
    assert!(handle.wait().await.is_err());
}

#[tokio::test]
async fn dropped_operations_become_not_mine() {
    let gate = gate(StaticGrants::with(&[]));
    gate.bind_prompter(Some(Arc::new(RecordingPrompter::default())));
    let runner = EchoRunner::default();
    let (op, handle) = operation("inbox");

    let Admission::Deferred(id) = gate.request(&READ, op, &runner).await else {
        panic!("expected deferral");
    };
    assert_eq!(gate.drop_pending(), 1);

    assert_eq!(handle.wait().await.unwrap_err(), BridgeError::Abandoned);
    let resolution = gate.resolve(id, &[PermissionStatus::Granted], &runner).await;
    assert_eq!(resolution, Resolution::NotMine);
    assert_eq!(runner.runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn concurrent_requests_resolve_independently() {
    let gate = gate(StaticGrants::with(&[]));
    gate.bind_prompter(Some(Arc::new(RecordingPrompter::default())));
    let runner = EchoRunner::default();
    let (first_op, first) = operation("first");
    let (second_op, second) = operation("second");

    let Admission::Deferred(first_id) = gate.request(&READ, first_op, &runner).await else {
        panic!("expected deferral");
    };
    let Admission::Deferred(second_id) = gate.request(&READ, second_op, &runner).await else {
        panic!("expected deferral");
    };
    assert_ne!(first_id, second_id);

    gate.resolve(second_id, &[PermissionStatus::Granted], &runner)
        .await;
    gate.resolve(first_id, &[PermissionStatus::Denied], &runner)
        .await;

    assert_eq!(
        second.wait().await.unwrap().as_value(),
        Some(&serde_json::json!("second"))
    );
    assert_eq!(first.wait().await.unwrap_err().code(), "#01");
}

#[tokio::test]
async fn audit_events_follow_the_prompt_lifecycle() {
    let gate = gate(StaticGrants::with(&[]));
    gate.bind_prompter(Some(Arc::new(RecordingPrompter::default())));
    let mut rx = gate.subscribe();
    let runner = EchoRunner::default();
    let (op, _handle) = operation("inbox");

    let Admission::Deferred(id) = gate.request(&READ, op, &runner).await else {
        panic!("expected deferral");
    };
    gate.resolve(id, &[PermissionStatus::Granted], &runner).await;

    let prompted = rx.recv().await.expect("prompted event");
    assert_eq!(prompted.outcome, GateOutcome::Prompted);
    assert_eq!(prompted.request_id, Some(id));
    let granted = rx.recv().await.expect("granted event");
    assert_eq!(granted.outcome, GateOutcome::Granted);
    assert_eq!(granted.capability, "messages");
}
