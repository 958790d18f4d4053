// Front Door HTTP surface: the back-office-facing `/api` endpoint.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::warn;

use crate::domain::device::ControlOutcome;
use crate::interface_adapters::http::{DataResponse, ErrorResponse};
use crate::interface_adapters::protocol::{ApiRequest, DeviceInfoDto, StartPlayPayload, offline_device_info};
use crate::interface_adapters::state::AppState;

pub async fn api_handler(State(state): State<Arc<AppState>>, Json(request): Json<ApiRequest>) -> impl IntoResponse {
    match request {
        ApiRequest::StartPlay(payload) => start_play(&state, payload).await,
        ApiRequest::GetDeviceInfos(names) => get_device_infos(&state, names).await,
    }
}

async fn start_play(state: &AppState, payload: StartPlayPayload) -> axum::response::Response {
    let StartPlayPayload {
        user_token,
        device_name,
        result,
    } = payload;

    let Some(user_id) = parse_prefix_id(&user_token) else {
        return bad_request("invalid user token");
    };

    let Some(player) = state.session.get_player(user_id).await else {
        return bad_request("player not online");
    };

    let Some(stored) = player.get_token().await else {
        return bad_request("player not online");
    };
    if stored != user_token {
        return bad_request("user token mismatch");
    }

    let Some(device) = state.session.get_game(device_name.clone()).await else {
        return bad_request("device not online");
    };

    match device.control("start", user_id, result).await {
        Some(ControlOutcome::Ok) => (StatusCode::OK, Json(DataResponse { data: "ok" })).into_response(),
        Some(ControlOutcome::Busy) => bad_request("busy"),
        Some(ControlOutcome::Unknown(message)) => bad_request(&message),
        None => {
            warn!(device_name = %device_name, "device did not respond to start control");
            bad_request("device unresponsive")
        }
    }
}

async fn get_device_infos(state: &AppState, names: Vec<String>) -> axum::response::Response {
    let handles = state.session.get_games(names.clone()).await;
    let mut infos: HashMap<String, DeviceInfoDto> = HashMap::with_capacity(names.len());
    for (name, handle) in names.into_iter().zip(handles) {
        let info = match handle {
            Some(handle) => handle
                .get_device_info()
                .await
                .map(DeviceInfoDto::from)
                .unwrap_or_else(|| offline_device_info(name.clone())),
            None => offline_device_info(name.clone()),
        };
        infos.insert(name, info);
    }
    (StatusCode::OK, Json(DataResponse { data: infos })).into_response()
}

fn bad_request(message: &str) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// Parses the `"<id>:<rest>"` token shape shared by the login handshake.
fn parse_prefix_id(token: &str) -> Option<u64> {
    let (prefix, _rest) = token.split_once(':')?;
    if prefix.is_empty() {
        return None;
    }
    let id: u64 = prefix.parse().ok()?;
    if id == 0 { None } else { Some(id) }
}
