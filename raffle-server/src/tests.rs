use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use raffle_core::config::{AdminConfig, DrawConfig, ServerConfig};
use raffle_core::guard::RequesterId;
use raffle_core::orchestrator::cancel_pair;
use raffle_core::store::MemoryDrawStore;
use raffle_sdk::client::{AdminClient, DrawSession, WinnerClient};
use raffle_sdk::objects::draw::SelectionStatsQuery;
use raffle_sdk::objects::winners::ListWinnersQuery;
use raffle_sdk::objects::ws::WsServerMessage;
use raffle_sdk::objects::{
    ADMIN_AUTH_HEADER, DrawCompleted, DrawRequest, REQUESTER_HEADER, SelectionStatsResponse,
    WinnerPageResponse,
};
use raffle_sdk::client::ClientError;
use tower::ServiceExt;
use url::Url;
use uuid::Uuid;

use crate::config::runtime::SharedConfig;
use crate::server::build_router;
use crate::state::AppState;

const ADMIN_SECRET: &str = "draw-operator";

fn shared_config() -> SharedConfig {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(ADMIN_SECRET.as_bytes(), &salt)
        .unwrap()
        .to_string();
    SharedConfig::new(
        ServerConfig {
            listen: "127.0.0.1:0".parse().unwrap(),
        },
        AdminConfig::new(hash),
        DrawConfig::default(),
    )
}

/// Two active participants in Toshkent, one in an inactive region.
async fn populated_store() -> Arc<MemoryDrawStore> {
    let store = Arc::new(MemoryDrawStore::new());
    let toshkent = store.add_region("Toshkent", true).await;
    let chilonzor = store.add_district(toshkent, "Chilonzor", true).await;
    store.add_participant(chilonzor, "Aliyev Vali", true).await;
    store.add_participant(chilonzor, "Karimova Nodira", true).await;

    let closed = store.add_region("Xorazm", false).await;
    let urganch = store.add_district(closed, "Urganch", true).await;
    store.add_participant(urganch, "Rahimov Bobur", true).await;
    store
}

async fn app() -> (Router, Arc<MemoryDrawStore>) {
    let (router, _, store) = app_with_state().await;
    (router, store)
}

async fn app_with_state() -> (Router, AppState, Arc<MemoryDrawStore>) {
    let store = populated_store().await;
    let state = AppState::new(store.clone(), shared_config()).await;
    (build_router(state.clone()), state, store)
}

async fn get(router: &Router, uri: &str, requester: Option<&str>) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().uri(uri);
    if let Some(requester) = requester {
        builder = builder.header(REQUESTER_HEADER, requester);
    }
    send(router, builder.body(Body::empty()).unwrap()).await
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

fn reset_request(secret: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/v1/admin/winners/reset");
    if let Some(secret) = secret {
        builder = builder.header(ADMIN_AUTH_HEADER, secret);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (router, _) = app().await;
    let (status, body) = get(&router, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_ready_follows_store() {
    let (router, store) = app().await;
    let (status, body) = get(&router, "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ready");

    store.set_unavailable(true);
    let (status, body) = get(&router, "/ready", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["database"], "unreachable");
}

#[tokio::test]
async fn test_requester_is_required() {
    let (router, _) = app().await;
    let (status, _) = get(&router, "/api/v1/winners", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = get(&router, "/api/v1/winners?requester=kiosk", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_empty_winner_endpoints() {
    let (router, _) = app().await;

    let (status, body) = get(&router, "/api/v1/winners", Some("kiosk")).await;
    assert_eq!(status, StatusCode::OK);
    let page: WinnerPageResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(page.total, 0);
    assert_eq!(page.limit, 20);

    let (status, body) = get(&router, "/api/v1/winners/latest", Some("kiosk")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"null");

    let uri = format!("/api/v1/winners/{}", Uuid::now_v7());
    let (status, _) = get(&router, &uri, Some("kiosk")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_selection_stats_skip_inactive_region() {
    let (router, _) = app().await;
    let (status, body) = get(&router, "/api/v1/draw/stats", Some("kiosk")).await;
    assert_eq!(status, StatusCode::OK);
    let stats: SelectionStatsResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(stats.active_regions, 1);
    assert_eq!(stats.active_participants, 2);
    assert_eq!(stats.eligible_participants, 2);
    assert_eq!(stats.winners, 0);
}

#[tokio::test]
async fn test_reset_requires_admin_secret() {
    let (router, _) = app().await;

    let (status, _) = send(&router, reset_request(None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&router, reset_request(Some("guess"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&router, reset_request(Some(ADMIN_SECRET))).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["deletedCount"], 0);
}

fn draw_request(requester: &str, body: Option<&str>) -> Request<Body> {
    let builder = Request::builder()
        .method("POST")
        .uri("/api/v1/draw")
        .header(REQUESTER_HEADER, requester);
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_owned()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[tokio::test]
async fn test_draw_over_http() {
    let (router, state, store) = app_with_state().await;

    let (status, body) = send(
        &router,
        draw_request("kiosk", Some(r#"{"excludePreviousWinners":true}"#)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let first: DrawCompleted = serde_json::from_slice(&body).unwrap();
    assert_eq!(first.winner.region.nomi, "Toshkent");
    assert_eq!(first.stats.total_eligible_participants, 2);

    // No body: the configured default (exclude) applies.
    let (status, body) = send(&router, draw_request("kiosk", None)).await;
    assert_eq!(status, StatusCode::OK);
    let second: DrawCompleted = serde_json::from_slice(&body).unwrap();
    assert_ne!(second.winner.participant.id, first.winner.participant.id);

    let (status, body) = send(&router, draw_request("kiosk", None)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(!body.is_empty());
    assert_eq!(store.winner_count().await, 2);

    // A draw already running for the requester.
    let _permit = state
        .draws
        .guard()
        .try_acquire(&RequesterId::from("kiosk"), cancel_pair().0)
        .unwrap();
    let (status, body) = send(&router, draw_request("kiosk", None)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, b"A draw is already in progress");

    let (status, _) = send(&router, draw_request("", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_http_draw_storage_failure_is_internal() {
    let (router, store) = app().await;
    store.set_unavailable(true);
    let (status, body) = send(&router, draw_request("kiosk", None)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, b"Internal error");
}

// ---------------------------------------------------------------------------
// Live server
// ---------------------------------------------------------------------------

async fn serve(router: Router) -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    Url::parse(&format!("http://{addr}")).unwrap()
}

/// Read frames until the draw's terminal frame and its announcement (if
/// any) have both arrived.
async fn drain_draw(session: &mut DrawSession) -> Vec<WsServerMessage> {
    let mut frames = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), async {
        let mut terminal = false;
        let mut announced = false;
        while let Some(frame) = session.next_message().await {
            let frame = frame.unwrap();
            match &frame {
                WsServerMessage::Completed(DrawCompleted { repeat, .. }) => {
                    terminal = true;
                    announced |= *repeat;
                }
                WsServerMessage::Error { .. } | WsServerMessage::Cancelled { .. } => {
                    terminal = true;
                    announced = true;
                }
                WsServerMessage::NewWinner { .. } => announced = true,
                _ => {}
            }
            frames.push(frame);
            if terminal && announced {
                break;
            }
        }
    })
    .await
    .unwrap();
    frames
}

#[tokio::test]
async fn test_draw_over_websocket() {
    let (router, store) = app().await;
    let base = serve(router).await;

    let mut session = DrawSession::connect(&base, "kiosk").await.unwrap();
    session.select(Some(true)).await.unwrap();
    let frames = drain_draw(&mut session).await;

    assert!(matches!(frames.first(), Some(WsServerMessage::Started { .. })));
    let percents: Vec<u8> = frames
        .iter()
        .filter_map(|frame| match frame {
            WsServerMessage::Progress(p) => Some(p.percent),
            _ => None,
        })
        .collect();
    assert_eq!(percents, vec![5, 15, 35, 45, 55, 70, 85, 95, 100]);

    let completed = frames
        .iter()
        .find_map(|frame| match frame {
            WsServerMessage::Completed(c) => Some(c.clone()),
            _ => None,
        })
        .unwrap();
    assert!(!completed.repeat);
    assert_eq!(completed.winner.region.nomi, "Toshkent");
    assert!(frames.iter().any(|frame| matches!(
        frame,
        WsServerMessage::NewWinner { winner } if winner.id == completed.winner.id
    )));
    assert_eq!(store.winner_count().await, 1);

    // Winner endpoints see the new record.
    let winners = WinnerClient::new(base.clone(), "kiosk");
    let page = winners.list_winners(&ListWinnersQuery::default()).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id, completed.winner.id);
    let latest = winners.latest_winner().await.unwrap().unwrap();
    assert_eq!(latest.id, completed.winner.id);
    assert_eq!(
        winners.get_winner(completed.winner.id).await.unwrap(),
        completed.winner
    );
    let stats = winners.winner_stats().await.unwrap();
    assert_eq!(stats.total, 1);
    let eligible = winners
        .selection_stats(&SelectionStatsQuery {
            exclude_previous_winners: Some(true),
        })
        .await
        .unwrap();
    assert_eq!(eligible.eligible_participants, 1);

    // Second draw with exclusion picks the other participant, third finds nobody.
    session.select(None).await.unwrap();
    let frames = drain_draw(&mut session).await;
    let second = frames
        .iter()
        .find_map(|frame| match frame {
            WsServerMessage::Completed(c) => Some(c.winner.clone()),
            _ => None,
        })
        .unwrap();
    assert_ne!(second.participant.id, completed.winner.participant.id);

    session.select(Some(true)).await.unwrap();
    let frames = drain_draw(&mut session).await;
    assert!(matches!(frames.last(), Some(WsServerMessage::Error { .. })));
    assert_eq!(store.winner_count().await, 2);

    // Reset makes everyone eligible again.
    let admin = AdminClient::new(base.clone(), ADMIN_SECRET);
    assert_eq!(admin.reset_winners().await.unwrap().deleted_count, 2);
    assert_eq!(admin.reset_winners().await.unwrap().deleted_count, 0);

    session.select(Some(true)).await.unwrap();
    let frames = drain_draw(&mut session).await;
    assert!(
        frames
            .iter()
            .any(|frame| matches!(frame, WsServerMessage::Completed(_)))
    );

    session.close().await.unwrap();
}

#[tokio::test]
async fn test_other_sessions_see_new_winner() {
    let (router, _) = app().await;
    let base = serve(router).await;

    let mut observer = DrawSession::connect(&base, "screen").await.unwrap();
    // A reply proves the observer's session loop is subscribed.
    observer.cancel().await.unwrap();
    let reply = tokio::time::timeout(Duration::from_secs(5), observer.next_message())
        .await
        .unwrap();
    assert!(matches!(reply, Some(Ok(WsServerMessage::Error { .. }))));

    let mut drawer = DrawSession::connect(&base, "kiosk").await.unwrap();
    drawer.select(Some(true)).await.unwrap();
    drain_draw(&mut drawer).await;

    let frame = tokio::time::timeout(Duration::from_secs(5), observer.next_message())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(matches!(frame, WsServerMessage::NewWinner { .. }));
}

#[tokio::test]
async fn test_websocket_without_requester_is_closed() {
    let (router, _) = app().await;
    let base = serve(router).await;

    let mut session = DrawSession::connect(&base, "").await.unwrap();
    let frame = tokio::time::timeout(Duration::from_secs(5), session.next_message())
        .await
        .unwrap();
    assert!(matches!(frame, Some(Ok(WsServerMessage::Error { .. }))));
    let next = tokio::time::timeout(Duration::from_secs(5), session.next_message())
        .await
        .unwrap();
    assert!(next.is_none());
}

#[tokio::test]
async fn test_winner_client_draws_over_http() {
    let (router, state, _) = app_with_state().await;
    let base = serve(router).await;
    let client = WinnerClient::new(base, "kiosk");

    let completed = client
        .draw(&DrawRequest {
            exclude_previous_winners: false,
        })
        .await
        .unwrap();
    assert!(!completed.repeat);

    let _permit = state
        .draws
        .guard()
        .try_acquire(&RequesterId::from("kiosk"), cancel_pair().0)
        .unwrap();
    match client.draw(&DrawRequest::default()).await {
        Err(ClientError::Api { status, .. }) => assert_eq!(status.as_u16(), 409),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_cancel_from_sibling_session() {
    let (router, state, _) = app_with_state().await;
    let base = serve(router).await;

    // A draw held open for the requester, started by neither socket.
    let (cancel, mut signal) = cancel_pair();
    let _permit = state
        .draws
        .guard()
        .try_acquire(&RequesterId::from("kiosk"), cancel)
        .unwrap();

    let mut sibling = DrawSession::connect(&base, "kiosk").await.unwrap();
    sibling.cancel().await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), signal.cancelled())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_disconnect_leaves_later_draw_running() {
    let (router, state, _) = app_with_state().await;
    let base = serve(router).await;

    let mut session = DrawSession::connect(&base, "kiosk").await.unwrap();
    session.select(Some(false)).await.unwrap();
    drain_draw(&mut session).await;

    // The socket's own draw is over; this one belongs to someone else.
    let (cancel, signal) = cancel_pair();
    let _permit = state
        .draws
        .guard()
        .try_acquire(&RequesterId::from("kiosk"), cancel)
        .unwrap();
    session.close().await.unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!signal.is_cancelled());
}
