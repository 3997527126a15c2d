use super::*;
use crate::{
    gateway::RemotePayload,
    status::StatusMessage,
    store::WeekStore,
    test_support::{failure, presentation, week, FakeServer},
};
use reqwest::{Method, StatusCode};
use serde_json::json;

struct Harness {
    server: Arc<FakeServer>,
    store: SharedStore,
    messages: Arc<MessageSurface>,
    controller: InteractionController,
}

fn harness(server: FakeServer) -> Harness {
    let server = Arc::new(server);
    let (events, _) = broadcast::channel(64);
    let store = WeekStore::shared();
    let messages = Arc::new(MessageSurface::new(events.clone()));
    let controller = InteractionController::new(
        server.clone() as Arc<dyn RemoteGateway>,
        Arc::clone(&store),
        Arc::clone(&messages),
        events,
    );
    Harness {
        server,
        store,
        messages,
        controller,
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("date")
}

async fn message(h: &Harness) -> Option<StatusMessage> {
    h.messages.current().await
}

#[tokio::test]
async fn creating_same_week_twice_sends_one_request() {
    let h = harness(FakeServer::default());

    let first = h.controller.create_week(date(2024, 1, 1)).await;
    assert_eq!(first, ActionOutcome::Created(WeekId::from("2024-W01")));
    assert_eq!(
        message(&h).await,
        Some(StatusMessage::new(MessageKind::Success, "Week created"))
    );

    let second = h.controller.create_week(date(2024, 1, 4)).await;
    assert_eq!(second, ActionOutcome::OpenedExisting(WeekId::from("2024-W01")));
    assert_eq!(h.server.calls_to(Method::POST, "/weeks"), 1);
    assert_eq!(
        message(&h).await,
        Some(StatusMessage::new(MessageKind::Info, WEEK_EXISTS_MESSAGE))
    );
    assert_eq!(
        h.store.read().await.selection(),
        Some(&WeekId::from("2024-W01"))
    );
}

#[tokio::test]
async fn create_sends_derived_identifier_and_selects_it() {
    let h = harness(FakeServer::default());

    h.controller.create_week(date(2021, 1, 1)).await;

    assert_eq!(
        h.server.last_body(Method::POST, "/weeks"),
        Some(json!({"week_id": "2020-W53"}))
    );
    let store = h.store.read().await;
    assert!(store.contains(&WeekId::from("2020-W53")));
    assert_eq!(store.selection(), Some(&WeekId::from("2020-W53")));
}

#[tokio::test]
async fn lost_create_race_opens_existing_week_without_error() {
    let h = harness(FakeServer::default());
    h.server.race_create("2024-W10");

    let outcome = h.controller.create_week(date(2024, 3, 4)).await;

    assert_eq!(outcome, ActionOutcome::JoinedExisting(WeekId::from("2024-W10")));
    let store = h.store.read().await;
    assert_eq!(store.selection(), Some(&WeekId::from("2024-W10")));
    assert!(store.contains(&WeekId::from("2024-W10")));
    let shown = message(&h).await.expect("message");
    assert_eq!(shown.kind, MessageKind::Info);
    assert_eq!(shown.text, WEEK_EXISTS_MESSAGE);
}

#[tokio::test]
async fn conflict_without_identifier_is_an_error() {
    let h = harness(FakeServer::default());
    h.server.script(
        Method::POST,
        "/weeks",
        Err(failure(
            StatusCode::CONFLICT,
            json!({"code": "WEEK_EXISTS", "message": "Week already exists"}),
        )),
    );

    let outcome = h.controller.create_week(date(2024, 3, 4)).await;

    assert_eq!(outcome, ActionOutcome::Failed("Week already exists".into()));
    assert_eq!(message(&h).await.expect("message").kind, MessageKind::Error);
    assert_eq!(h.store.read().await.selection(), None);
}

#[tokio::test]
async fn other_create_failures_leave_state_untouched() {
    let h = harness(FakeServer::default());
    h.server.script(
        Method::POST,
        "/weeks",
        Err(failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({"code": "DB", "message": "db down"}),
        )),
    );

    let outcome = h.controller.create_week(date(2024, 5, 1)).await;

    assert_eq!(outcome, ActionOutcome::Failed("db down".into()));
    assert_eq!(
        message(&h).await,
        Some(StatusMessage::new(MessageKind::Error, "db down"))
    );
    assert_eq!(h.server.calls_to(Method::GET, "/weeks"), 0);
    let store = h.store.read().await;
    assert!(store.weeks().is_empty());
    assert_eq!(store.selection(), None);
}

#[tokio::test]
async fn create_falls_back_to_derived_identifier_when_reply_omits_it() {
    let h = harness(FakeServer::default());
    h.server.script(
        Method::POST,
        "/weeks",
        Ok(RemotePayload::Json(json!({"message": "ok"}))),
    );

    let outcome = h.controller.create_week(date(2024, 1, 1)).await;

    assert_eq!(outcome, ActionOutcome::Created(WeekId::from("2024-W01")));
    assert_eq!(
        message(&h).await,
        Some(StatusMessage::new(MessageKind::Success, "ok"))
    );
}

#[tokio::test]
async fn vote_refreshes_once_and_shows_server_count() {
    let h = harness(FakeServer::with_weeks(vec![
        week("2024-W01", vec![presentation(1, "Graph nets", 2)]),
        week("2024-W02", vec![presentation(2, "Compilers", 0)]),
    ]));
    h.controller.refresh().await.expect("initial refresh");
    h.controller.select_week(WeekId::from("2024-W01")).await;
    // Someone else voted meanwhile; the client has not seen it yet.
    h.server.set_votes(1, 9);
    let refreshes_before = h.server.calls_to(Method::GET, "/weeks");

    let outcome = h.controller.vote(PresentationId(1)).await;

    assert_eq!(outcome, ActionOutcome::Voted(PresentationId(1)));
    assert_eq!(
        h.server.calls_to(Method::GET, "/weeks"),
        refreshes_before + 1
    );
    assert_eq!(
        h.server.last_body(Method::POST, "/presentations/1/vote"),
        Some(json!({}))
    );
    let store = h.store.read().await;
    assert_eq!(store.selection(), Some(&WeekId::from("2024-W01")));
    assert_eq!(store.presentations()[0].votes, 10);
    assert_eq!(
        message(&h).await,
        Some(StatusMessage::new(MessageKind::Success, "Vote counted"))
    );
}

#[tokio::test]
async fn failed_vote_reports_error_without_touching_counts() {
    let h = harness(FakeServer::with_weeks(vec![week(
        "2024-W01",
        vec![presentation(1, "Graph nets", 2)],
    )]));
    h.controller.refresh().await.expect("initial refresh");
    h.controller.select_week(WeekId::from("2024-W01")).await;
    let refreshes_before = h.server.calls_to(Method::GET, "/weeks");

    let outcome = h.controller.vote(PresentationId(99)).await;

    assert_eq!(outcome, ActionOutcome::Failed("Presentation not found".into()));
    assert_eq!(h.server.calls_to(Method::GET, "/weeks"), refreshes_before);
    assert_eq!(h.store.read().await.presentations()[0].votes, 2);
    assert_eq!(message(&h).await.expect("message").kind, MessageKind::Error);
}

#[tokio::test]
async fn select_week_is_local_and_clears_message() {
    let h = harness(FakeServer::with_weeks(vec![week("2024-W01", Vec::new())]));
    h.messages.show(MessageKind::Error, "stale").await;

    let outcome = h.controller.select_week(WeekId::from("2024-W01")).await;

    assert_eq!(outcome, ActionOutcome::Selected(WeekId::from("2024-W01")));
    assert_eq!(h.server.total_calls(), 0);
    assert_eq!(message(&h).await, None);
}

#[tokio::test]
async fn date_input_is_validated_before_deriving() {
    let h = harness(FakeServer::default());

    assert_eq!(
        h.controller.create_week_from_input("").await,
        ActionOutcome::Skipped
    );
    assert_eq!(h.server.total_calls(), 0);

    let outcome = h.controller.create_week_from_input("2024-02-31").await;
    assert!(matches!(outcome, ActionOutcome::Failed(_)));
    assert_eq!(message(&h).await.expect("message").kind, MessageKind::Error);
    assert_eq!(h.server.total_calls(), 0);

    let outcome = h.controller.create_week_from_input("+262142-12-31").await;
    assert!(matches!(outcome, ActionOutcome::Failed(_)));
    assert_eq!(h.server.total_calls(), 0);

    let outcome = h.controller.create_week_from_input("2024-02-29").await;
    assert_eq!(outcome, ActionOutcome::Created(WeekId::from("2024-W09")));
}

#[tokio::test]
async fn reload_reports_failure_in_message_region() {
    let h = harness(FakeServer::with_weeks(vec![week("2024-W01", Vec::new())]));
    h.server.script(
        Method::GET,
        "/weeks",
        Err(failure(StatusCode::BAD_GATEWAY, json!({"message": "upstream down"}))),
    );

    let outcome = h.controller.reload().await;
    assert_eq!(outcome, ActionOutcome::Failed("upstream down".into()));
    assert_eq!(
        message(&h).await,
        Some(StatusMessage::new(MessageKind::Error, "upstream down"))
    );
    assert!(h.store.read().await.weeks().is_empty());

    assert_eq!(h.controller.reload().await, ActionOutcome::Refreshed);
    assert_eq!(h.store.read().await.weeks().len(), 1);
}

#[tokio::test]
async fn dismiss_clears_message() {
    let h = harness(FakeServer::default());
    h.messages.show(MessageKind::Info, "hello").await;

    h.controller.dismiss_message().await;

    assert_eq!(message(&h).await, None);
}
