use axum::{
    extract::{
        State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use raffle_core::guard::{DrawId, RequesterId};
use raffle_sdk::objects::DrawRequest;
use raffle_sdk::objects::ws::{WsClientMessage, WsCloseCode, WsServerMessage};
use tokio::sync::broadcast::error::RecvError;

use crate::api::extractors::{Requester, RequesterError};
use crate::state::AppState;

/// `GET /draw/ws` – WebSocket draw session.
///
/// The requester comes from the `Raffle-Requester` header or the
/// `requester` query parameter. Without one the socket is accepted and
/// immediately closed with [`WsCloseCode::MISSING_REQUESTER`].
pub(super) async fn draw_ws(
    State(state): State<AppState>,
    requester: Result<Requester, RequesterError>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        match requester {
            Ok(Requester(id)) => handle_draw_ws(socket, state, id).await,
            Err(e) => close_with(socket, WsCloseCode::MISSING_REQUESTER, &e.to_string()).await,
        }
    })
}

/// Drives one connection until the client leaves.
///
/// Relays this requester's draw events, every winner announcement, and the
/// client's `select` / `cancel` commands. `cancel` stops the requester's
/// draw whichever socket started it. When the socket goes away, the last
/// draw it started is cancelled if still running.
async fn handle_draw_ws(mut socket: WebSocket, state: AppState, requester: RequesterId) {
    // Register before the first command so `Started` is never missed.
    let mut events = state.draws.channel().register(requester.clone());
    let mut winners = state.draws.channel().subscribe_winners();
    let mut started: Option<DrawId> = None;

    tracing::debug!(requester = %requester, "WS: draw session opened");

    let failure = loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    break Some("Draw events closed");
                };
                if send_json(&mut socket, &WsServerMessage::from(event)).await.is_err() {
                    break None;
                }
            }

            announcement = winners.recv() => {
                match announcement {
                    Ok(announcement) => {
                        let msg = WsServerMessage::from(announcement);
                        if send_json(&mut socket, &msg).await.is_err() {
                            break None;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        tracing::warn!(
                            requester = %requester,
                            skipped = n,
                            "WS: winner broadcast lagged"
                        );
                    }
                    Err(RecvError::Closed) => break Some("Winner broadcast closed"),
                }
            }

            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if handle_client_message(&mut socket, &state, &requester, text.as_str(), &mut started)
                            .await
                            .is_err()
                        {
                            break None;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break None,
                    Some(Ok(_)) => {}
                }
            }
        }
    };

    if let Some(reason) = failure {
        tracing::error!(requester = %requester, reason, "WS: closing draw session");
        let _ = send_close(&mut socket, WsCloseCode::INTERNAL_ERROR, reason).await;
    }
    if let Some(id) = started {
        if state.draws.cancel_draw(&requester, id) {
            tracing::info!(requester = %requester, draw = id, "WS: client left, cancelling draw");
        }
    }
    tracing::debug!(requester = %requester, "WS: draw session closed");
}

async fn handle_client_message(
    socket: &mut WebSocket,
    state: &AppState,
    requester: &RequesterId,
    text: &str,
    started: &mut Option<DrawId>,
) -> Result<(), ()> {
    let command = match serde_json::from_str::<WsClientMessage>(text) {
        Ok(command) => command,
        Err(e) => {
            tracing::debug!(requester = %requester, error = %e, "WS: unreadable client message");
            return send_error(socket, "Invalid message").await;
        }
    };

    match command {
        WsClientMessage::Select {
            exclude_previous_winners,
        } => {
            let exclude_previous_winners = match exclude_previous_winners {
                Some(flag) => flag,
                None => state.default_exclusion().await,
            };
            let request = DrawRequest {
                exclude_previous_winners,
            };
            match state.draws.start(requester.clone(), request) {
                Ok(handle) => {
                    *started = Some(handle.id());
                    Ok(())
                }
                Err(e) => send_error(socket, &e.reason()).await,
            }
        }
        WsClientMessage::Cancel => {
            if state.draws.cancel(requester) {
                Ok(())
            } else {
                send_error(socket, "No draw in progress").await
            }
        }
    }
}

async fn send_error(socket: &mut WebSocket, reason: &str) -> Result<(), ()> {
    send_json(
        socket,
        &WsServerMessage::Error {
            reason: reason.to_owned(),
        },
    )
    .await
}

async fn close_with(mut socket: WebSocket, code: u16, reason: &str) {
    let _ = send_error(&mut socket, reason).await;
    let _ = send_close(&mut socket, code, reason).await;
}

async fn send_close(socket: &mut WebSocket, code: u16, reason: &str) -> Result<(), axum::Error> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
}

/// Serialize `value` as JSON and send it as a text WebSocket frame.
///
/// Returns `Err(())` if the send fails (client disconnected).
async fn send_json<T: serde::Serialize>(socket: &mut WebSocket, value: &T) -> Result<(), ()> {
    let json = serde_json::to_string(value).map_err(|_| ())?;
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}
