use std::net::SocketAddr;
use std::time::Duration;

use canvas::capture::SequentialIds;
use canvas::doc::Geometry;
use canvas::selection::SelectionCountError;
use frames::{EventType, encode_event};
use futures_util::SinkExt;
use relay::AppState;
use relay::routes::app;
use tokio::time::{Instant as TokioInstant, sleep, timeout};
use tokio_tungstenite::tungstenite::Message;

use super::*;
use canvas::engine::CaptureError;

async fn spawn_relay() -> (SocketAddr, AppState) {
    let state = AppState::new(64);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let router = app(state.clone(), None);
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    (addr, state)
}

async fn wait_for_sessions(state: &AppState, count: usize) {
    let deadline = TokioInstant::now() + Duration::from_secs(2);
    while state.hub.session_count().await != count {
        assert!(TokioInstant::now() < deadline, "sessions never reached {count}");
        sleep(Duration::from_millis(10)).await;
    }
}

fn config(addr: SocketAddr) -> ClientConfig {
    ClientConfig::new(format!("ws://{addr}/ws"))
}

async fn pair(addr: SocketAddr, state: &AppState, interval: Duration) -> (Session<SequentialIds>, Session<SequentialIds>) {
    let a = Session::connect_with_ids(&config(addr).with_move_interval(interval), SequentialIds::new("a"))
        .await
        .expect("connect a");
    let b = Session::connect_with_ids(&config(addr), SequentialIds::new("b")).await.expect("connect b");
    wait_for_sessions(state, 2).await;
    (a, b)
}

async fn next(session: &mut Session<SequentialIds>) -> (Event, RemoteOutcome) {
    timeout(Duration::from_millis(500), session.apply_next())
        .await
        .expect("receive timed out")
        .expect("session error")
}

// =============================================================
// Peer convergence
// =============================================================

#[tokio::test]
async fn placed_rectangle_appears_on_peer_with_same_bounds() {
    let (addr, state) = spawn_relay().await;
    let (mut a, mut b) = pair(addr, &state, Duration::ZERO).await;

    let id = a.place_shape(ShapeType::Rectangle).await.expect("place");
    assert_eq!(id, "a-1");

    let (event, outcome) = next(&mut b).await;
    assert_eq!(event.event_type(), EventType::AddShape);
    assert_eq!(outcome, RemoteOutcome::Applied);

    let theirs = b.engine().object("a-1").expect("mirrored");
    let ours = a.engine().object("a-1").expect("local");
    assert_eq!(theirs, ours);
    assert_eq!(theirs.geometry, Geometry::Rectangle { width: 100.0, height: 100.0 });
    assert_eq!((theirs.transform.left, theirs.transform.top), (0.0, 0.0));
}

#[tokio::test]
async fn arrow_follows_moved_shape_on_peer() {
    let (addr, state) = spawn_relay().await;
    let (mut a, mut b) = pair(addr, &state, Duration::ZERO).await;

    let s1 = a.place_shape(ShapeType::Rectangle).await.expect("s1");
    let s2 = a
        .place_shape_with(ShapeType::Circle, &ObjectOptions::position(300.0, 0.0))
        .await
        .expect("s2");
    assert!(a.select(&s1));
    assert!(a.select(&s2));
    let line_id = a.create_arrow().await.expect("arrow");
    assert!(a.move_object(&s1, 0.0, 200.0, MovePhase::Modified).await.expect("move"));

    // addShape, addShape, addArrow, modifyShape, updateArrow
    let mut types = Vec::new();
    for _ in 0..5 {
        let (event, outcome) = next(&mut b).await;
        assert_eq!(outcome, RemoteOutcome::Applied, "{event:?}");
        types.push(event.event_type());
    }
    assert_eq!(
        types,
        [EventType::AddShape, EventType::AddShape, EventType::AddArrow, EventType::ModifyShape, EventType::UpdateArrow]
    );

    let Some(Geometry::Line { x1, y1, .. }) = b.engine().object(&line_id).map(|o| o.geometry.clone()) else {
        panic!("line missing on peer");
    };
    assert_eq!((x1, y1), (50.0, 250.0));
    assert_eq!(a.engine().object(&line_id), b.engine().object(&line_id));
    let head = a.engine().arrows.get(&line_id).expect("binding").arrow_head_id.clone();
    assert_eq!(a.engine().object(&head), b.engine().object(&head));
}

#[tokio::test]
async fn stroke_and_clear_reach_peer() {
    let (addr, state) = spawn_relay().await;
    let (mut a, mut b) = pair(addr, &state, Duration::ZERO).await;

    let points = [Point::new(0.0, 0.0), Point::new(10.0, 5.0), Point::new(20.0, 0.0)];
    let id = a.draw_stroke(points).await.expect("stroke").expect("non-empty");
    let (event, _) = next(&mut b).await;
    assert_eq!(event.event_type(), EventType::Draw);
    assert_eq!(b.engine().object(&id), a.engine().object(&id));

    a.clear().await.expect("clear");
    let (event, outcome) = next(&mut b).await;
    assert_eq!(event, Event::clear());
    assert_eq!(outcome, RemoteOutcome::Applied);
    assert!(b.engine().registry.is_empty());
    assert!(a.engine().registry.is_empty());
}

#[tokio::test]
async fn empty_stroke_sends_nothing() {
    let (addr, state) = spawn_relay().await;
    let (mut a, mut b) = pair(addr, &state, Duration::ZERO).await;

    assert_eq!(a.draw_stroke(Vec::new()).await.expect("stroke"), None);
    assert!(timeout(Duration::from_millis(100), b.apply_next()).await.is_err());
}

#[tokio::test]
async fn arrow_with_one_selected_shape_fails_without_sending() {
    let (addr, state) = spawn_relay().await;
    let (mut a, mut b) = pair(addr, &state, Duration::ZERO).await;

    let s1 = a.place_shape(ShapeType::Circle).await.expect("s1");
    next(&mut b).await;
    a.select(&s1);

    let err = a.create_arrow().await.unwrap_err();
    assert!(matches!(err, ClientError::Capture(CaptureError::Selection(SelectionCountError { selected: 1 }))));
    assert!(timeout(Duration::from_millis(100), b.apply_next()).await.is_err());
}

#[tokio::test]
async fn modify_of_unknown_object_is_dropped_not_fatal() {
    let (addr, state) = spawn_relay().await;
    let (mut a, mut b) = pair(addr, &state, Duration::ZERO).await;

    // b never saw the shape: place it on a, then swallow the addShape on b
    // by clearing b's mirror locally.
    let id = a.place_shape(ShapeType::Rectangle).await.expect("place");
    next(&mut b).await;
    b.engine_mut().registry.clear_all();

    a.move_object(&id, 5.0, 5.0, MovePhase::Modified).await.expect("move");
    let (_, outcome) = next(&mut b).await;
    assert_eq!(outcome, RemoteOutcome::Dropped(canvas::engine::DropReason::UnknownObject(id)));

    // The session is still usable afterwards.
    a.place_shape(ShapeType::Circle).await.expect("place");
    assert_eq!(next(&mut b).await.1, RemoteOutcome::Applied);
}

// =============================================================
// Transport
// =============================================================

#[tokio::test]
async fn undecodable_messages_are_skipped() {
    let (addr, state) = spawn_relay().await;
    let mut b = Session::connect_with_ids(&config(addr), SequentialIds::new("b")).await.expect("connect b");
    let (mut raw, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws")).await.expect("connect raw");
    wait_for_sessions(&state, 2).await;

    raw.send(Message::Binary(vec![0xff, 0x00, 0x13].into())).await.expect("garbage");
    raw.send(Message::Text("not json".into())).await.expect("text");
    let valid = encode_event(&Event::clear()).expect("encode");
    raw.send(Message::Binary(valid.into())).await.expect("valid");

    let (event, _) = next(&mut b).await;
    assert_eq!(event, Event::clear());
}

#[tokio::test]
async fn json_text_events_are_accepted() {
    let (addr, state) = spawn_relay().await;
    let mut b = Session::connect_with_ids(&config(addr), SequentialIds::new("b")).await.expect("connect b");
    let (mut raw, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws")).await.expect("connect raw");
    wait_for_sessions(&state, 2).await;

    raw.send(Message::Text(r#"{"type":"clear","payload":{}}"#.into())).await.expect("text");
    let (event, _) = next(&mut b).await;
    assert_eq!(event, Event::clear());
}

#[tokio::test]
async fn payload_less_text_clear_empties_the_mirror() {
    let (addr, state) = spawn_relay().await;
    let (mut a, mut b) = pair(addr, &state, Duration::ZERO).await;
    let (mut raw, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws")).await.expect("connect raw");
    wait_for_sessions(&state, 3).await;

    a.place_shape(ShapeType::Rectangle).await.expect("place");
    next(&mut b).await;
    assert_eq!(b.engine().registry.len(), 1);

    raw.send(Message::Text(r#"{"type":"clear"}"#.into())).await.expect("bare clear");
    let (event, outcome) = next(&mut b).await;
    assert_eq!(event, Event::clear());
    assert_eq!(outcome, RemoteOutcome::Applied);
    assert!(b.engine().registry.is_empty());

    raw.send(Message::Text(r#"{"type":"clear","payload":null}"#.into())).await.expect("null clear");
    let (event, _) = next(&mut a).await;
    assert_eq!(event, Event::clear());
    assert!(a.engine().registry.is_empty());
}

#[tokio::test]
async fn connect_to_nothing_fails() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let err = Session::connect(&config(addr)).await.err().expect("must fail");
    assert!(matches!(err, ClientError::WsConnect(_)));
}

// =============================================================
// Coalescing
// =============================================================

#[tokio::test]
async fn drag_is_coalesced_and_final_position_lands() {
    let (addr, state) = spawn_relay().await;
    let (mut a, mut b) = pair(addr, &state, Duration::from_secs(60)).await;

    let id = a.place_shape(ShapeType::Rectangle).await.expect("place");
    next(&mut b).await;

    for step in 1..=10 {
        let phase = if step == 10 { MovePhase::Modified } else { MovePhase::Moving };
        a.move_object(&id, f64::from(step), 0.0, phase).await.expect("move");
    }

    // first tick goes out immediately, the rest collapse into the final flush
    let (first, _) = next(&mut b).await;
    let (last, _) = next(&mut b).await;
    assert_eq!(first.event_type(), EventType::ModifyShape);
    assert_eq!(last.event_type(), EventType::ModifyShape);
    assert!(timeout(Duration::from_millis(100), b.apply_next()).await.is_err());
    assert_eq!(b.engine().object(&id).map(|o| o.transform.left), Some(10.0));
}

// =============================================================
// Event loop
// =============================================================

#[tokio::test]
async fn run_executes_commands_and_applies_inbound() {
    let (addr, state) = spawn_relay().await;
    let (a, mut b) = pair(addr, &state, Duration::from_millis(20)).await;
    let (tx, rx) = mpsc::channel(8);
    let handle = tokio::spawn(a.run(rx));

    tx.send(SessionCommand::PlaceShape { shape: ShapeType::Circle, overrides: ObjectOptions::default() })
        .await
        .expect("send");
    let (event, _) = next(&mut b).await;
    let id = event.target_id().expect("id").to_owned();

    for left in [1.0, 2.0, 3.0] {
        tx.send(SessionCommand::Move { id: id.clone(), left, top: 0.0, phase: MovePhase::Moving })
            .await
            .expect("send");
    }
    // the held move is released by the deadline tick, not by another command
    let mut left = 0.0;
    while left < 3.0 {
        next(&mut b).await;
        left = b.engine().object(&id).map_or(0.0, |o| o.transform.left);
    }

    b.place_shape(ShapeType::Rectangle).await.expect("peer place");
    let (reply, count) = oneshot::channel();
    tx.send(SessionCommand::Sync(reply)).await.expect("sync");
    // Sync is answered in order with the inbound stream, so poll until a has both.
    let mut objects = count.await.expect("reply");
    while objects < 2 {
        let (reply, count) = oneshot::channel();
        tx.send(SessionCommand::Sync(reply)).await.expect("sync");
        objects = count.await.expect("reply");
    }

    tx.send(SessionCommand::Close).await.expect("close");
    let engine = timeout(Duration::from_secs(1), handle).await.expect("join").expect("task").expect("run");
    assert_eq!(engine.registry.len(), 2);
}

#[tokio::test]
async fn run_ends_with_ws_closed_when_relay_closes() {
    // A relay that completes the handshake and immediately closes.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let mut socket = tokio_tungstenite::accept_async(stream).await.expect("handshake");
        socket.close(None).await.expect("close");
    });

    let a = Session::connect_with_ids(&config(addr), SequentialIds::new("a")).await.expect("connect");
    let (_tx, rx) = mpsc::channel(1);
    let result = timeout(Duration::from_secs(1), a.run(rx)).await.expect("run returned");
    assert!(matches!(result, Err(ClientError::WsClosed)));
}

#[tokio::test]
async fn apply_next_reports_ws_closed() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let mut socket = tokio_tungstenite::accept_async(stream).await.expect("handshake");
        socket.close(None).await.expect("close");
    });

    let mut a = Session::connect_with_ids(&config(addr), SequentialIds::new("a")).await.expect("connect");
    let err = timeout(Duration::from_secs(1), a.apply_next()).await.expect("returned").unwrap_err();
    assert!(matches!(err, ClientError::WsClosed));
}
