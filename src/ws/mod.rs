pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use handlers::Subscription;

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle one WebSocket connection: forward room broadcasts, dispatch client
/// messages, and run the implicit-leave cleanup when the transport closes.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let connection_id = ulid::Ulid::new().to_string();
    tracing::info!(%connection_id, "client connected");

    let (mut sender, mut receiver) = socket.split();

    // Ambient room membership: which session this connection is in, and the
    // subscription to that room's broadcast channel.
    let mut session_id: Option<String> = None;
    let mut room_rx: Option<broadcast::Receiver<ServerMessage>> = None;

    loop {
        tokio::select! {
            // Forward room broadcasts to this member
            room_msg = async {
                match &mut room_rx {
                    Some(rx) => rx.recv().await,
                    None => std::future::pending().await,
                }
            } => {
                match room_msg {
                    Ok(msg) => {
                        let room_gone = matches!(msg, ServerMessage::SessionDeleted);
                        if send_message(&mut sender, &msg).await.is_err() {
                            break;
                        }
                        if room_gone {
                            session_id = None;
                            room_rx = None;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(%connection_id, skipped, "connection lagged behind room broadcasts");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        // The session was torn down; the channel is gone
                        session_id = None;
                        room_rx = None;
                    }
                }
            }

            // Handle client messages
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                tracing::debug!(%connection_id, msg = ?client_msg, "received message");
                                let dispatch = handlers::handle_message(
                                    client_msg,
                                    &connection_id,
                                    session_id.as_deref(),
                                    &state,
                                )
                                .await;

                                match dispatch.subscription {
                                    Subscription::Enter { session_id: id, receiver } => {
                                        session_id = Some(id);
                                        room_rx = Some(receiver);
                                    }
                                    Subscription::Exit => {
                                        session_id = None;
                                        room_rx = None;
                                    }
                                    Subscription::Unchanged => {}
                                }

                                let mut send_failed = false;
                                for msg in dispatch.replies {
                                    if send_message(&mut sender, &msg).await.is_err() {
                                        send_failed = true;
                                        break;
                                    }
                                }
                                if send_failed {
                                    break;
                                }
                            }
                            Err(e) => {
                                tracing::warn!(%connection_id, error = %e, "failed to parse client message");
                                let error = ServerMessage::Error {
                                    code: "PARSE_ERROR".to_string(),
                                    msg: format!("Invalid message format: {}", e),
                                };
                                let _ = send_message(&mut sender, &error).await;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => break,
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(%connection_id, error = %e, "websocket error");
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    // Implicit leave: the transport closed without a leave-session frame
    state.disconnect(&connection_id).await;
    tracing::info!(%connection_id, "client disconnected");
}

async fn send_message(
    sender: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), axum::Error> {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await,
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize server message");
            Ok(())
        }
    }
}
