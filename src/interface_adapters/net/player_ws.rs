// Front Door half for the `/player` path: upgrades the socket, spawns a
// Player actor, and shuttles frames between the socket and its mailbox.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::SinkExt;
use tokio::sync::mpsc;
use tracing::{debug, info, info_span, warn};

use crate::domain::player::PlayerOutboundEvent;
use crate::interface_adapters::protocol::{decode_player_frame, player_push_to_wire};
use crate::interface_adapters::state::AppState;
use crate::use_cases::spawn_player;

pub async fn player_ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let span = info_span!("player_conn");
    let _enter = span.enter();

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<PlayerOutboundEvent>();
    let player = spawn_player(state.session.clone(), state.session_tokens.clone(), outbound_tx);

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match decode_player_frame(&text) {
                            Ok(envelope) => player.recv_message(envelope.into()).await,
                            Err(err) => warn!(error = %err, "malformed player frame, dropping"),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("player socket closed");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(error = %err, "player socket read error");
                        break;
                    }
                }
            }
            outgoing = outbound_rx.recv() => {
                match outgoing {
                    Some(PlayerOutboundEvent::Push(push)) => {
                        let envelope = player_push_to_wire(push);
                        if !send_json(&mut socket, &envelope).await {
                            break;
                        }
                    }
                    Some(PlayerOutboundEvent::Kickout) => {
                        let _ = socket.send(Message::Text("kickout".into())).await;
                        let _ = socket.close().await;
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    player.logout().await;
    info!("player disconnected");
}

async fn send_json(socket: &mut WebSocket, value: &impl serde::Serialize) -> bool {
    match serde_json::to_string(value) {
        Ok(text) => socket.send(Message::Text(text.into())).await.is_ok(),
        Err(err) => {
            warn!(error = %err, "failed to serialize player push");
            true
        }
    }
}
