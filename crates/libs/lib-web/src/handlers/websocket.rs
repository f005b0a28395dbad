//! # WebSocket Handler
//!
//! `GET /ws?projectId=<uuid>[&token=<jwt>]` upgrades to a collaboration session.
//!
//! The handshake is checked by the gateway before the upgrade, so a refused
//! client gets a plain HTTP 401/403 with the JSON error body. An admitted
//! connection joins its project room at once and then runs two halves:
//!
//! - a writer task draining the member queue into the socket
//! - a reader loop feeding text frames to the session
//!
//! Whichever half ends first ends the connection and removes it from the room.
//!
//! ```javascript
//! const ws = new WebSocket(`ws://localhost:3000/ws?projectId=${id}&token=${jwt}`);
//! ws.send(JSON.stringify({ event: 'project-message', data: { message: 'hi @AI', sender } }));
//! ```

use crate::chat::gateway::{self, Handshake, HandshakeQuery};
use crate::chat::rooms::EventReceiver;
use crate::chat::session::{Session, SessionPhase};
use crate::server::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, error, info, warn};

pub async fn collab_websocket(
    ws: WebSocketUpgrade,
    Query(query): Query<HandshakeQuery>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> Response {
    let client_ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| addr.ip().to_string());

    info!(
        client_ip = %client_ip,
        project_id = ?query.project_id,
        "[WS] CONNECT_ATTEMPT ip={} project={:?}",
        client_ip,
        query.project_id
    );

    let handshake = Handshake::from_request(query, &headers);
    let session = match gateway::admit(&state, handshake).await {
        Ok(session) => session,
        Err(e) => {
            warn!(client_ip = %client_ip, error = %e, "[WS] REJECTED ip={}", client_ip);
            return e.into_response();
        }
    };

    ws.on_upgrade(move |socket| run_session(socket, state, session, client_ip))
        .into_response()
}

async fn run_session(socket: WebSocket, state: AppState, mut session: Session, client_ip: String) {
    let connection_id = session.connection_id;
    let connection_start = Instant::now();

    let Some(events) = session.join(&state.rooms).await else {
        warn!(connection_id = %connection_id, "[WS] Server shutting down, closing new connection");
        let mut socket = socket;
        let _ = socket.send(Message::Close(None)).await;
        return;
    };

    info!(
        connection_id = %connection_id,
        project_id = %session.project_id,
        user_id = %session.identity.user_id,
        client_ip = %client_ip,
        "[WS] CONNECTED connection_id={} project={}",
        connection_id,
        session.project_id
    );

    let (sink, stream) = socket.split();
    let messages_sent = Arc::new(AtomicU64::new(0));
    let mut send_task = tokio::spawn(write_events(sink, events, Arc::clone(&messages_sent)));

    let messages_received = tokio::select! {
        received = read_frames(stream, &mut session, &state) => received,
        result = &mut send_task => {
            if let Err(e) = result {
                error!(connection_id = %connection_id, error = ?e, "[WS] SEND_TASK_ERROR");
            }
            0
        }
    };

    session.disconnect(&state.rooms).await;
    send_task.abort();

    let duration = connection_start.elapsed();
    info!(
        connection_id = %connection_id,
        project_id = %session.project_id,
        duration_ms = duration.as_millis(),
        messages_sent = messages_sent.load(Ordering::Relaxed),
        messages_received,
        "[WS] DISCONNECTED connection_id={} duration={:.2}s",
        connection_id,
        duration.as_secs_f64()
    );
}

/// Drain the member queue into the socket until either side closes.
async fn write_events(
    mut sink: futures_util::stream::SplitSink<WebSocket, Message>,
    events: EventReceiver,
    sent: Arc<AtomicU64>,
) {
    let mut events = UnboundedReceiverStream::new(events);

    while let Some(event) = events.next().await {
        let json = match serde_json::to_string(&event) {
            Ok(json) => json,
            Err(e) => {
                error!(error = %e, "[WS] SERIALIZE_ERROR");
                continue;
            }
        };

        if let Err(e) = sink.send(Message::Text(json.into())).await {
            debug!(error = %e, "[WS] SEND_ERROR");
            return;
        }
        sent.fetch_add(1, Ordering::Relaxed);
    }

    // Queue dropped: the room manager was closed.
    let _ = sink.send(Message::Close(None)).await;
}

/// Feed inbound frames to the session until the client goes away.
///
/// Returns the number of text frames handled.
async fn read_frames(mut stream: SplitStream<WebSocket>, session: &mut Session, state: &AppState) -> u64 {
    let mut received = 0;

    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                received += 1;
                debug!(
                    connection_id = %session.connection_id,
                    size = text.len(),
                    "[WS] MESSAGE_RECEIVED"
                );
                session.handle_frame(&state.rooms, &state.bridge, text.as_str()).await;
            }
            Ok(Message::Binary(data)) => {
                debug!(connection_id = %session.connection_id, size = data.len(), "[WS] Binary frame ignored");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(frame)) => {
                let code = frame.map(|f| u16::from(f.code)).unwrap_or_default();
                info!(connection_id = %session.connection_id, code, "[WS] CLOSE_RECEIVED");
                break;
            }
            Err(e) => {
                warn!(connection_id = %session.connection_id, error = %e, "[WS] RECV_ERROR");
                break;
            }
        }
    }

    if session.phase() == SessionPhase::Joined {
        debug!(connection_id = %session.connection_id, "[WS] Closed before sending any event");
    }
    received
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::generator::TextGenerator;
    use crate::chat::test_support::{test_state_with, token_for, StubGenerator};
    use crate::chat::AiBridge;
    use crate::server::create_router;
    use futures_util::Stream;
    use lib_core::dto::ServerEvent;
    use serde_json::json;
    use std::time::Duration;
    use tokio_tungstenite::tungstenite;
    use uuid::Uuid;

    type Frame = Result<tungstenite::Message, tungstenite::Error>;

    async fn serve(state: AppState) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = create_router(state, &[]);
        tokio::spawn(async move {
            axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
                .await
                .unwrap();
        });
        addr
    }

    async fn next_event<S: Stream<Item = Frame> + Unpin>(ws: &mut S) -> ServerEvent {
        loop {
            let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
                .await
                .expect("timed out waiting for event")
                .unwrap()
                .unwrap();
            if frame.is_text() {
                return serde_json::from_str(frame.to_text().unwrap()).unwrap();
            }
        }
    }

    async fn wait_for_members(state: &AppState, project_id: Uuid, expected: usize) {
        for _ in 0..100 {
            if state.rooms.member_count(project_id).await == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("room never reached {} members", expected);
    }

    #[tokio::test]
    async fn test_ai_mention_reaches_whole_room_over_socket() {
        // Arrange
        let stub = StubGenerator::answering(Ok("{\"text\":\"function factorial(n) {}\"}"));
        let state = test_state_with(AiBridge::new(Some(stub.clone() as Arc<dyn TextGenerator>), "@AI", false)).await;
        let addr = serve(state.clone()).await;
        let project_id = Uuid::new_v4();
        let url = |email: &str| {
            format!(
                "ws://{}/ws?projectId={}&token={}",
                addr,
                project_id,
                token_for(Uuid::new_v4(), email)
            )
        };

        let (mut ada, _) = tokio_tungstenite::connect_async(url("ada@example.com")).await.unwrap();
        let (mut bob, _) = tokio_tungstenite::connect_async(url("bob@example.com")).await.unwrap();
        wait_for_members(&state, project_id, 2).await;

        // Act
        let frame = json!({
            "event": "project-message",
            "data": {
                "message": "Build a factorial function @AI",
                "sender": { "id": "u1", "email": "ada@example.com" }
            }
        });
        ada.send(tungstenite::Message::text(frame.to_string())).await.unwrap();

        // Assert
        match next_event(&mut bob).await {
            ServerEvent::ProjectMessage(payload) => {
                assert_eq!(payload.message(), "Build a factorial function @AI");
                assert_eq!(payload.sender().email, "ada@example.com");
            }
            other => panic!("unexpected event: {:?}", other),
        }
        for ws in [&mut bob, &mut ada] {
            match next_event(ws).await {
                ServerEvent::ProjectMessage(payload) => {
                    assert!(payload.sender().is_assistant());
                    assert_eq!(payload.message(), "{\"text\":\"function factorial(n) {}\"}");
                }
                other => panic!("unexpected event: {:?}", other),
            }
        }
        assert_eq!(*stub.prompts.lock().unwrap(), vec!["Build a factorial function".to_string()]);
    }

    #[tokio::test]
    async fn test_handshake_without_token_is_refused() {
        let state = test_state_with(AiBridge::new(None, "@AI", false)).await;
        let addr = serve(state.clone()).await;
        let url = format!("ws://{}/ws?projectId={}", addr, Uuid::new_v4());

        let err = tokio_tungstenite::connect_async(url).await.unwrap_err();

        match err {
            tungstenite::Error::Http(response) => assert_eq!(response.status(), 401),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(state.rooms.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_disconnect_removes_member() {
        let state = test_state_with(AiBridge::new(None, "@AI", false)).await;
        let addr = serve(state.clone()).await;
        let project_id = Uuid::new_v4();
        let url = format!(
            "ws://{}/ws?projectId={}&token={}",
            addr,
            project_id,
            token_for(Uuid::new_v4(), "ada@example.com")
        );

        let (mut ada, _) = tokio_tungstenite::connect_async(url).await.unwrap();
        wait_for_members(&state, project_id, 1).await;
        ada.close(None).await.unwrap();

        wait_for_members(&state, project_id, 0).await;
        assert_eq!(state.rooms.room_count().await, 0);
    }
}
