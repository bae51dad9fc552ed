//! Integration tests for the event stream consumer.

use hoist_api::{BuildEvent, BuildStatus, EventEnvelope};
use hoist_client::{Client, Error};
use hoist_sse::{EventWriter, Frame, END_EVENT};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Render a full SSE response body the way the server side would.
async fn wire_for(events: Vec<(u64, &str, serde_json::Value)>, end_id: Option<u64>) -> Vec<u8> {
    let mut writer = EventWriter::new(Vec::new());
    for (id, name, payload) in events {
        writer.emit(id, name, &payload).await.unwrap();
    }
    if let Some(id) = end_id {
        writer.end(id).await.unwrap();
    }
    writer.into_inner()
}

async fn mount_events(server: &MockServer, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path("/api/v1/builds/3/events"))
        .and(header("accept", "text/event-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn streams_frames_in_order_until_the_end_sentinel() {
    let server = MockServer::start().await;
    let body = wire_for(
        vec![
            (1, "status", serde_json::json!({"status": "started"})),
            (2, "log", serde_json::json!({"payload": "sup\n"})),
        ],
        Some(2),
    )
    .await;
    mount_events(&server, body).await;

    let client = Client::builder(server.uri()).unwrap().build().unwrap();
    let mut session = client.build_events(3).await.unwrap();

    let first = session.next_event().await.unwrap().unwrap();
    assert_eq!(first.id, Some(1));
    assert_eq!(first.name, "status");

    let second = session.next_event().await.unwrap().unwrap();
    assert_eq!(second.id, Some(2));
    assert_eq!(second.name, "log");
    assert_eq!(second.data, r#"{"payload":"sup\n"}"#);

    // The reserved sentinel ends the stream cleanly.
    assert!(session.next_event().await.unwrap().is_none());
    // And the session stays ended rather than erroring.
    assert!(session.next_event().await.unwrap().is_none());

    session.close();
}

#[tokio::test]
async fn frames_decode_into_typed_build_events() {
    let server = MockServer::start().await;
    let body = wire_for(
        vec![(1, "status", serde_json::json!({"status": "succeeded"}))],
        Some(1),
    )
    .await;
    mount_events(&server, body).await;

    let client = Client::builder(server.uri()).unwrap().build().unwrap();
    let mut session = client.build_events(3).await.unwrap();

    let frame = session.next_event().await.unwrap().unwrap();
    let envelope = EventEnvelope { event: frame.name.clone(), data: frame.parse().unwrap() };
    let event = BuildEvent::from_envelope(envelope).unwrap();
    assert_eq!(event, BuildEvent::Status { status: BuildStatus::Succeeded });
}

#[tokio::test]
async fn a_dropped_connection_is_an_error_not_a_clean_end() {
    let server = MockServer::start().await;
    // Two frames, no end sentinel: the body just stops.
    let body = wire_for(
        vec![
            (1, "log", serde_json::json!({"payload": "a"})),
            (2, "log", serde_json::json!({"payload": "b"})),
        ],
        None,
    )
    .await;
    mount_events(&server, body).await;

    let client = Client::builder(server.uri()).unwrap().build().unwrap();
    let mut session = client.build_events(3).await.unwrap();

    assert!(session.next_event().await.unwrap().is_some());
    assert!(session.next_event().await.unwrap().is_some());

    let err = session.next_event().await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "got {err:?}");
}

#[tokio::test]
async fn auth_failure_surfaces_at_connect_time() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/builds/3/events"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = Client::builder(server.uri()).unwrap().build().unwrap();
    let err = client.build_events(3).await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized), "got {err:?}");
}

#[tokio::test]
async fn forbidden_also_surfaces_at_connect_time() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/builds/3/events"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let client = Client::builder(server.uri()).unwrap().build().unwrap();
    let err = client.build_events(3).await.unwrap_err();
    assert!(matches!(err, Error::Forbidden), "got {err:?}");
}

#[tokio::test]
async fn end_frames_written_by_hand_match_the_writer() {
    // The consumer and producer agree on the sentinel's spelling.
    let frame = Frame { id: Some(9), name: END_EVENT.to_string(), data: String::new() };
    assert!(frame.encode().contains("event: end"));
}
