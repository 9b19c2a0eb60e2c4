//! End-to-end behaviour of a mounted form session:
//! - checkbox and select branches appear and disappear with their trigger
//! - multi-select toggling and outside clicks
//! - submission outcomes and the messages shown for them
//! - the snapshot/flatten round trip

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use intake::outside::Area;
use intake::store::flatten;
use intake::submit::{REJECTED_MESSAGE, SUCCESS_MESSAGE, TRANSPORT_MESSAGE};
use intake::{
    DispatchError, DispatchReceipt, Dispatcher, FieldKind, FieldNode, FieldOption, FieldPath,
    FieldValue, FormSchema, FormSession, IntakeError, PointerBus, StatusKind, SubmissionStatus,
    SubmitOutcome, render_visible,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

#[derive(Clone, Copy)]
enum Reply {
    Ok,
    Reject,
}

struct Recording {
    reply: Reply,
    calls: AtomicUsize,
    last: std::sync::Mutex<Option<Value>>,
}

impl Recording {
    fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
            last: std::sync::Mutex::new(None),
        })
    }
}

#[async_trait]
impl Dispatcher for Recording {
    async fn dispatch(&self, snapshot: &Value) -> Result<DispatchReceipt, DispatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(snapshot.clone());
        match self.reply {
            Reply::Ok => Ok(DispatchReceipt {
                status: 200,
                body: r#"{"message":"Emails sent successfully"}"#.into(),
            }),
            Reply::Reject => Err(DispatchError::Rejected {
                status: 500,
                body: r#"{"error":"Failed to send emails"}"#.into(),
            }),
        }
    }
}

fn schema() -> FormSchema {
    FormSchema::new(
        "Service Request",
        vec![
            FieldNode::new("requestorInfo", "Requestor", FieldKind::Section)
                .child(FieldNode::new("email", "Email", FieldKind::Email).required(true)),
            FieldNode::new("hasInsurance", "Insured?", FieldKind::Checkbox)
                .child(FieldNode::new("insurerName", "Insurer", FieldKind::Text)),
            FieldNode::new("urgency", "Urgency", FieldKind::Select)
                .options([
                    FieldOption::new("routine", "Routine"),
                    FieldOption::new("emergency", "Emergency"),
                ])
                .child(
                    FieldNode::new("dispatchTime", "Dispatch time", FieldKind::Date)
                        .when("emergency"),
                ),
            FieldNode::new("services", "Services", FieldKind::Multiselect).options([
                FieldOption::new("A", "A"),
                FieldOption::new("B", "B"),
                FieldOption::new("C", "C"),
            ]),
        ],
    )
}

fn visible(session: &FormSession) -> Vec<String> {
    session
        .visible_fields()
        .iter()
        .map(|f| f.path.to_string())
        .collect()
}

fn p(raw: &str) -> FieldPath {
    FieldPath::parse(raw).unwrap()
}

#[test]
fn checkbox_branch_follows_its_value() {
    let mut session = FormSession::mount(schema(), Recording::new(Reply::Ok)).unwrap();
    assert!(!visible(&session).contains(&"hasInsurance.insurerName".to_string()));

    let rerendered = session.write(&p("hasInsurance"), FieldValue::Bool(true));
    assert_eq!(rerendered, vec![p("hasInsurance")]);
    assert!(visible(&session).contains(&"hasInsurance.insurerName".to_string()));

    session.write(&p("hasInsurance"), FieldValue::Bool(false));
    assert!(!visible(&session).contains(&"hasInsurance.insurerName".to_string()));
}

#[test]
fn select_branch_shows_matching_child_only() {
    let mut session = FormSession::mount(schema(), Recording::new(Reply::Ok)).unwrap();
    session.write(&p("urgency"), FieldValue::text("routine"));
    assert!(!visible(&session).iter().any(|s| s.starts_with("urgency.")));

    session.write(&p("urgency"), FieldValue::text("emergency"));
    assert!(visible(&session).contains(&"urgency.dispatchTime".to_string()));
}

#[test]
fn multiselect_toggle_sequence() {
    let mut session = FormSession::mount(schema(), Recording::new(Reply::Ok)).unwrap();
    let services = p("services");
    session.toggle_option(&services, "B");
    session.toggle_option(&services, "A");
    session.toggle_option(&services, "B");
    assert_eq!(session.read(&services), FieldValue::list(["A"]));
    assert_eq!(
        session.multiselect_display(&services).map(|d| d.summary().to_string()),
        Some("1 selected".to_string())
    );
}

#[test]
fn outside_click_closes_open_multiselect() {
    let session = FormSession::mount(schema(), Recording::new(Reply::Ok)).unwrap();
    let services = p("services");
    session.boundary().set(Area::new(0, 0, 40, 20));
    session.toggle_open(&services);

    session.pointer_down(10, 10);
    assert!(session.is_open(&services));

    session.pointer_down(60, 10);
    assert!(!session.is_open(&services));
}

#[test]
fn hidden_values_are_retained_in_snapshot() {
    let mut session = FormSession::mount(schema(), Recording::new(Reply::Ok)).unwrap();
    session.write(&p("hasInsurance"), FieldValue::Bool(true));
    session.write(&p("hasInsurance.insurerName"), FieldValue::text("Acme"));
    session.write(&p("hasInsurance"), FieldValue::Bool(false));
    assert_eq!(
        session.snapshot()["hasInsurance"],
        json!({ "@value": false, "insurerName": "Acme" })
    );
}

#[test]
fn snapshot_round_trips() {
    let mut session = FormSession::mount(schema(), Recording::new(Reply::Ok)).unwrap();
    session.write(&p("requestorInfo.email"), FieldValue::text("x@y.com"));
    session.write(&p("urgency"), FieldValue::text("emergency"));
    session.write(&p("urgency.dispatchTime"), FieldValue::text("2024-05-01T10:00"));
    session.toggle_option(&p("services"), "C");
    assert_eq!(flatten(&session.snapshot()), session.store().entries());
}

#[test]
fn non_finite_number_survives_the_round_trip() {
    let mut session = FormSession::mount(schema(), Recording::new(Reply::Ok)).unwrap();
    session.write(&p("crew"), FieldValue::Number(f64::NAN));
    session.write(&p("budget"), FieldValue::Number(f64::INFINITY));
    assert_eq!(session.read(&p("crew")), FieldValue::text("NaN"));
    assert_eq!(session.snapshot()["budget"], json!("inf"));
    assert_eq!(flatten(&session.snapshot()), session.store().entries());
}

#[test]
fn reset_returns_to_the_initial_form() {
    let mut session = FormSession::mount(schema(), Recording::new(Reply::Ok)).unwrap();
    let initial = visible(&session);
    session.write(&p("hasInsurance"), FieldValue::Bool(true));
    session.write(&p("hasInsurance.insurerName"), FieldValue::text("Acme"));
    session.toggle_open(&p("services"));

    let rerendered = session.reset();
    assert_eq!(rerendered, vec![p("hasInsurance")]);
    assert_eq!(visible(&session), initial);
    assert_eq!(session.read(&p("hasInsurance")), FieldValue::Bool(false));
    assert_eq!(session.read(&p("hasInsurance.insurerName")), FieldValue::text(""));
    assert!(!session.is_open(&p("services")));
}

#[test]
fn rendering_is_a_function_of_the_snapshot() {
    let mut session = FormSession::mount(schema(), Recording::new(Reply::Ok)).unwrap();
    session.write(&p("hasInsurance"), FieldValue::Bool(true));
    session.write(&p("urgency"), FieldValue::text("emergency"));
    let first = visible(&session);
    let pure: Vec<String> = render_visible(&session.schema().fields, session.store())
        .iter()
        .map(|f| f.path.to_string())
        .collect();
    assert_eq!(first, pure);
    assert_eq!(visible(&session), first);
}

#[test]
fn invalid_ids_fail_mount_and_release_the_listener() {
    let bus = PointerBus::new();
    let bad = FormSchema::new(
        "bad",
        vec![FieldNode::new("a.b", "Dotted", FieldKind::Text)],
    );
    let err = FormSession::mount_with_bus(bad, Recording::new(Reply::Ok), bus.clone()).unwrap_err();
    assert!(matches!(err, IntakeError::InvalidFieldId { .. }));
    assert_eq!(bus.listener_count(), 0);

    let session = FormSession::mount_with_bus(schema(), Recording::new(Reply::Ok), bus.clone()).unwrap();
    assert_eq!(bus.listener_count(), 1);
    drop(session);
    assert_eq!(bus.listener_count(), 0);
}

#[test]
fn sessions_do_not_share_state() {
    let mut a = FormSession::mount(schema(), Recording::new(Reply::Ok)).unwrap();
    let b = FormSession::mount(schema(), Recording::new(Reply::Ok)).unwrap();
    a.write(&p("urgency"), FieldValue::text("routine"));
    b.toggle_open(&p("services"));
    a.pointer_down(0, 0);
    assert_eq!(b.read(&p("urgency")), FieldValue::text(""));
    assert!(b.is_open(&p("services")));
}

#[tokio::test]
async fn successful_submission() {
    let dispatcher = Recording::new(Reply::Ok);
    let mut session = FormSession::mount(schema(), dispatcher.clone()).unwrap();
    session.write(&p("requestorInfo.email"), FieldValue::text("x@y.com"));
    session.toggle_option(&p("services"), "A");

    let outcome = session.submit().await;
    assert!(matches!(outcome, SubmitOutcome::Succeeded(_)));
    assert_eq!(session.status(), SubmissionStatus::Succeeded);
    let message = session.message().unwrap();
    assert_eq!(message.kind, StatusKind::Success);
    assert_eq!(message.text, SUCCESS_MESSAGE);

    let sent = dispatcher.last.lock().unwrap().clone().unwrap();
    assert_eq!(sent["requestorInfo"]["email"], json!("x@y.com"));
    assert_eq!(sent["services"], json!(["A"]));
}

#[tokio::test]
async fn rejected_submission_shows_generic_message() {
    let session = FormSession::mount(schema(), Recording::new(Reply::Reject)).unwrap();
    session.submit().await;
    match session.status() {
        SubmissionStatus::Failed { reason } => assert!(reason.contains("500")),
        other => panic!("expected failure, got {other:?}"),
    }
    let message = session.message().unwrap();
    assert_eq!(message.kind, StatusKind::Error);
    assert_eq!(message.text, REJECTED_MESSAGE);
    assert_ne!(message.text, TRANSPORT_MESSAGE);
}

#[tokio::test]
async fn begin_submit_blocks_second_attempt() {
    let dispatcher = Recording::new(Reply::Ok);
    let session = FormSession::mount(schema(), dispatcher.clone()).unwrap();
    let snapshot = session.begin_submit().expect("first submission starts");
    assert!(session.begin_submit().is_none());
    assert!(matches!(session.submit().await, SubmitOutcome::Ignored));

    session.pipeline().dispatch(snapshot).await;
    assert_eq!(dispatcher.calls.load(Ordering::SeqCst), 1);
    assert!(session.begin_submit().is_some());
}
