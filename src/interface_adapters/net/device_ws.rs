// Front Door half for the `/Game` path: upgrades the socket, spawns a
// Device actor, and shuttles frames between the socket and its mailbox.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::SinkExt;
use tokio::sync::mpsc;
use tracing::{debug, info, info_span, warn};

use crate::domain::device::DeviceOutboundEvent;
use crate::interface_adapters::protocol::{decode_device_frame, device_event_to_wire};
use crate::interface_adapters::state::AppState;
use crate::use_cases::spawn_device;

pub async fn device_ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let span = info_span!("device_conn");
    let _enter = span.enter();

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<DeviceOutboundEvent>();
    let device = spawn_device(
        state.session.clone(),
        state.device_tokens.clone(),
        state.back_office.clone(),
        outbound_tx,
    );

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match decode_device_frame(&text) {
                            Ok(envelope) => device.recv_message(envelope.into()).await,
                            Err(err) => warn!(error = %err, "malformed device frame, dropping"),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("device socket closed");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(error = %err, "device socket read error");
                        break;
                    }
                }
            }
            outgoing = outbound_rx.recv() => {
                match outgoing {
                    Some(DeviceOutboundEvent::Kickout) => {
                        let _ = socket.send(Message::Text("kickout".into())).await;
                        let _ = socket.close().await;
                        break;
                    }
                    Some(event) => {
                        if let Some(envelope) = device_event_to_wire(event) {
                            if !send_json(&mut socket, &envelope).await {
                                break;
                            }
                        }
                    }
                    None => break,
                }
            }
        }
    }

    device.logout().await;
    info!("device disconnected");
}

async fn send_json(socket: &mut WebSocket, value: &impl serde::Serialize) -> bool {
    match serde_json::to_string(value) {
        Ok(text) => socket.send(Message::Text(text.into())).await.is_ok(),
        Err(err) => {
            warn!(error = %err, "failed to serialize device push");
            true
        }
    }
}
