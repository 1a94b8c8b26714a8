//! WebSocket behavior over a real socket: server on an ephemeral port, a
//! tokio-tungstenite client on the other end.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

use dashlink::api::{build_router, serve, AppState};
use dashlink::hub::{
    BroadcastScheduler, ConnectionRegistry, HubConfig, ShutdownCoordinator, TickOutcome,
    NORMAL_CLOSURE, SHUTDOWN_REASON,
};
use dashlink::snapshot::{decode_binary, SnapshotBuilder};
use dashlink::sources::{
    MediaCache, PlaybackStatus, PlayerInfo, SimulatedDiagnostics, SimulatedPlayer,
};

const TIMEOUT: Duration = Duration::from_secs(5);

/// WebSocket close code for "going away"
const GOING_AWAY: u16 = 1001;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

struct TestHub {
    url: String,
    registry: Arc<ConnectionRegistry>,
    scheduler: BroadcastScheduler,
}

/// Boot a hub on 127.0.0.1:0 with simulated sources
async fn boot_hub() -> TestHub {
    let info = PlayerInfo::new("spotify")
        .track(
            "Midnight City",
            "M83",
            "Hurry Up, We're Dreaming",
            Duration::from_secs(243),
        )
        .status(PlaybackStatus::Playing);
    let media = MediaCache::fixed(Some(info));
    let builder = Arc::new(SnapshotBuilder::new(
        Arc::new(SimulatedDiagnostics::new()),
        media.clone(),
        Duration::from_millis(500),
    ));
    let registry = Arc::new(ConnectionRegistry::new(HubConfig::default()));
    let scheduler = BroadcastScheduler::new(
        Arc::clone(&builder),
        Arc::clone(&registry),
        Duration::from_millis(500),
    );

    let state = AppState::new(
        Arc::clone(&registry),
        builder,
        media,
        Arc::new(SimulatedPlayer::new()),
    );
    let router = build_router(state, None);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(serve(listener, router, std::future::pending::<()>()));

    TestHub {
        url: format!("ws://{addr}/api/ws"),
        registry,
        scheduler,
    }
}

async fn connect(url: &str) -> WsStream {
    let (ws, _response) = timeout(TIMEOUT, connect_async(url))
        .await
        .expect("connect timed out")
        .expect("connect failed");
    ws
}

/// Wait until the registry holds exactly `expected` connections
async fn wait_for_count(registry: &ConnectionRegistry, expected: usize) {
    timeout(TIMEOUT, async {
        while registry.connection_count().await != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("registry never reached {expected} connections"));
}

/// Next data or close message, skipping control frames
async fn next_message(ws: &mut WsStream) -> Message {
    timeout(TIMEOUT, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                Some(Ok(message)) => return message,
                Some(Err(e)) => panic!("receive error: {e}"),
                None => panic!("stream ended"),
            }
        }
    })
    .await
    .expect("no message before timeout")
}

fn close_parts(message: Message) -> (u16, String) {
    match message {
        Message::Close(Some(CloseFrame { code, reason })) => {
            (u16::from(code), reason.into_owned())
        }
        other => panic!("expected close frame, got {other:?}"),
    }
}

#[tokio::test]
async fn test_tick_reaches_socket_as_binary_snapshot() {
    let hub = boot_hub().await;
    let mut ws = connect(&hub.url).await;
    wait_for_count(&hub.registry, 1).await;

    match hub.scheduler.tick().await {
        TickOutcome::Delivered(report) => assert_eq!(report.delivered, 1),
        TickOutcome::Skipped(e) => panic!("tick skipped: {e}"),
    }

    match next_message(&mut ws).await {
        Message::Binary(bytes) => {
            let snapshot = decode_binary(&bytes).unwrap();
            let music = snapshot.music.expect("music panel");
            assert_eq!(music.title, "Midnight City");
            assert_eq!(music.playback_status, "playing");
            assert!(snapshot.car.is_some());
        }
        other => panic!("expected binary snapshot, got {other:?}"),
    }
}

#[tokio::test]
async fn test_text_frame_echoed_over_socket() {
    let hub = boot_hub().await;
    let mut ws = connect(&hub.url).await;
    wait_for_count(&hub.registry, 1).await;

    ws.send(Message::Text("hello dashboard".to_string()))
        .await
        .unwrap();
    assert_eq!(
        next_message(&mut ws).await,
        Message::Text("hello dashboard".to_string())
    );

    // Binary from the client is ignored; the connection stays up
    ws.send(Message::Binary(vec![1, 2, 3])).await.unwrap();
    ws.send(Message::Text("still here".to_string())).await.unwrap();
    assert_eq!(
        next_message(&mut ws).await,
        Message::Text("still here".to_string())
    );
    assert_eq!(hub.registry.connection_count().await, 1);
}

#[tokio::test]
async fn test_echo_keeps_order_with_broadcasts() {
    let hub = boot_hub().await;
    let mut ws = connect(&hub.url).await;
    wait_for_count(&hub.registry, 1).await;

    // The snapshot is queued before the text arrives, so it goes out first
    assert!(matches!(hub.scheduler.tick().await, TickOutcome::Delivered(_)));
    ws.send(Message::Text("after tick".to_string())).await.unwrap();

    assert!(matches!(next_message(&mut ws).await, Message::Binary(_)));
    assert_eq!(
        next_message(&mut ws).await,
        Message::Text("after tick".to_string())
    );
}

#[tokio::test]
async fn test_client_close_deregisters() {
    let hub = boot_hub().await;
    let mut first = connect(&hub.url).await;
    let _second = connect(&hub.url).await;
    wait_for_count(&hub.registry, 2).await;

    first.close(None).await.unwrap();
    wait_for_count(&hub.registry, 1).await;

    // The survivor still gets broadcasts
    match hub.scheduler.tick().await {
        TickOutcome::Delivered(report) => {
            assert_eq!(report.delivered, 1);
            assert_eq!(report.failed, 0);
        }
        TickOutcome::Skipped(e) => panic!("tick skipped: {e}"),
    }
}

#[tokio::test]
async fn test_drain_closes_socket_and_turns_away_latecomers() {
    let hub = boot_hub().await;
    let mut ws = connect(&hub.url).await;
    wait_for_count(&hub.registry, 1).await;

    let coordinator = ShutdownCoordinator::new(Arc::clone(&hub.registry), TIMEOUT);
    let outcome = coordinator.drain().await;
    assert!(outcome.is_graceful(), "{outcome:?}");

    let (code, reason) = close_parts(next_message(&mut ws).await);
    assert_eq!(code, NORMAL_CLOSURE);
    assert_eq!(reason, SHUTDOWN_REASON);
    wait_for_count(&hub.registry, 0).await;

    // The upgrade still completes, but the hub refuses the connection
    let mut late = connect(&hub.url).await;
    let (code, _reason) = close_parts(next_message(&mut late).await);
    assert_eq!(code, GOING_AWAY);
    assert_eq!(hub.registry.connection_count().await, 0);
}
