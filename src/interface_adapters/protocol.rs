// Wire protocol DTOs and conversions between the `{type, data}` JSON
// envelopes used on the wire and the domain's typed inbound/push messages.

use serde::{Deserialize, Serialize};

use crate::domain::device::{DeviceInbound, DeviceOutboundEvent};
use crate::domain::errors::RelayError;
use crate::domain::player::{PlayerInbound, PlayerPush, RoomEventKind};

/// Decodes a player wire frame, wrapping `serde_json`'s error in the
/// codec's own error taxonomy rather than leaking `serde_json::Error`
/// past this module.
pub fn decode_player_frame(text: &str) -> Result<PlayerClientEnvelope, RelayError> {
    serde_json::from_str(text).map_err(|err| RelayError::Decode(err.to_string()))
}

/// Decodes a device wire frame. See [`decode_player_frame`].
pub fn decode_device_frame(text: &str) -> Result<DeviceClientEnvelope, RelayError> {
    serde_json::from_str(text).map_err(|err| RelayError::Decode(err.to_string()))
}

// ---------------------------------------------------------------------
// Player wire protocol
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PlayerClientEnvelope {
    #[serde(rename = "heartBeat")]
    HeartBeat(String),
    #[serde(rename = "login")]
    Login(String),
    #[serde(rename = "joinGameRoom")]
    JoinGameRoom(String),
    #[serde(rename = "leaveGameRoom")]
    LeaveGameRoom(String),
    #[serde(rename = "controlGame")]
    ControlGame(ControlGamePayload),
    #[serde(rename = "watchGameRooms")]
    WatchGameRooms(Vec<String>),
    #[serde(rename = "unwatchGameRooms")]
    UnwatchGameRooms(Vec<String>),
    #[serde(rename = "broadcastMessage")]
    BroadcastMessage(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ControlGamePayload {
    #[serde(rename = "controlType")]
    pub control_type: String,
    #[serde(default)]
    pub result: i64,
}

impl From<PlayerClientEnvelope> for PlayerInbound {
    fn from(envelope: PlayerClientEnvelope) -> Self {
        match envelope {
            PlayerClientEnvelope::HeartBeat(payload) => PlayerInbound::HeartBeat(payload),
            PlayerClientEnvelope::Login(token) => PlayerInbound::Login(token),
            PlayerClientEnvelope::JoinGameRoom(name) => PlayerInbound::JoinGameRoom(name),
            PlayerClientEnvelope::LeaveGameRoom(name) => PlayerInbound::LeaveGameRoom(name),
            PlayerClientEnvelope::ControlGame(payload) => PlayerInbound::ControlGame {
                control_type: payload.control_type,
                result: payload.result,
            },
            PlayerClientEnvelope::WatchGameRooms(names) => PlayerInbound::WatchGameRooms(names),
            PlayerClientEnvelope::UnwatchGameRooms(names) => PlayerInbound::UnwatchGameRooms(names),
            PlayerClientEnvelope::BroadcastMessage(text) => PlayerInbound::BroadcastMessage(text),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum PlayerServerEnvelope {
    #[serde(rename = "heartBeat")]
    HeartBeat(String),
    #[serde(rename = "login")]
    Login(LoginResultDto),
    #[serde(rename = "GameStatus")]
    GameStatus(GameStatusDto),
    #[serde(rename = "GamePassTime")]
    GamePassTime(i64),
    #[serde(rename = "GameResult")]
    GameResult(String),
    #[serde(rename = "playerMessage")]
    PlayerMessage(RoomEventDto),
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResultDto {
    pub code: u8,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GameStatusDto {
    #[serde(rename = "deviceName")]
    pub device_name: String,
    #[serde(rename = "deviceStatus")]
    pub device_status: String,
    #[serde(rename = "curPlayer")]
    pub cur_player: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum RoomEventDto {
    #[serde(rename = "join")]
    Join(RoomMembershipDto),
    #[serde(rename = "leave")]
    Leave(RoomMembershipDto),
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomMembershipDto {
    pub player: u64,
    pub count: usize,
    pub players: Vec<u64>,
}

/// Translates a player push into its wire envelope. Kickout never reaches
/// here: it is handled in the net adapter as a raw literal frame.
pub fn player_push_to_wire(push: PlayerPush) -> PlayerServerEnvelope {
    match push {
        PlayerPush::HeartBeat(payload) => PlayerServerEnvelope::HeartBeat(payload),
        PlayerPush::LoginResult { code, message } => {
            PlayerServerEnvelope::Login(LoginResultDto { code, message })
        }
        PlayerPush::GameStatus {
            device_name,
            device_status,
            cur_player,
        } => PlayerServerEnvelope::GameStatus(GameStatusDto {
            device_name,
            device_status,
            cur_player,
        }),
        PlayerPush::GamePassTime(seconds) => PlayerServerEnvelope::GamePassTime(seconds),
        PlayerPush::GameResult(result) => PlayerServerEnvelope::GameResult(result),
        PlayerPush::RoomEvent {
            kind,
            player,
            count,
            players,
        } => {
            let membership = RoomMembershipDto { player, count, players };
            PlayerServerEnvelope::PlayerMessage(match kind {
                RoomEventKind::Join => RoomEventDto::Join(membership),
                RoomEventKind::Leave => RoomEventDto::Leave(membership),
            })
        }
    }
}

// ---------------------------------------------------------------------
// Device wire protocol
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum DeviceClientEnvelope {
    #[serde(rename = "heartBeat")]
    HeartBeat(String),
    #[serde(rename = "login")]
    Login(String),
    #[serde(rename = "status")]
    Status(DeviceStatusPayload),
    #[serde(rename = "result")]
    Result(DeviceResultPayload),
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceStatusPayload {
    #[serde(rename = "deviceStatus")]
    pub device_status: String,
    #[serde(rename = "curPlayer")]
    pub cur_player: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceResultPayload {
    #[serde(rename = "playResult")]
    pub play_result: String,
    #[serde(rename = "curPlayer")]
    pub cur_player: u64,
}

impl From<DeviceClientEnvelope> for DeviceInbound {
    fn from(envelope: DeviceClientEnvelope) -> Self {
        match envelope {
            DeviceClientEnvelope::HeartBeat(payload) => DeviceInbound::HeartBeat(payload),
            DeviceClientEnvelope::Login(token) => DeviceInbound::Login(token),
            DeviceClientEnvelope::Status(payload) => DeviceInbound::Status {
                device_status: payload.device_status,
                cur_player: payload.cur_player,
            },
            DeviceClientEnvelope::Result(payload) => DeviceInbound::Result {
                play_result: payload.play_result,
                cur_player: payload.cur_player,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum DeviceServerEnvelope {
    #[serde(rename = "heartBeat")]
    HeartBeat(String),
    #[serde(rename = "login")]
    Login(LoginResultDto),
    #[serde(rename = "control")]
    Control(ControlDto),
    #[serde(rename = "broadcastMessage")]
    BroadcastMessage(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ControlDto {
    #[serde(rename = "controlType")]
    pub control_type: String,
    #[serde(rename = "playerId", skip_serializing_if = "Option::is_none")]
    pub player_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<i64>,
}

/// Translates a device outbound event into its wire envelope. Kickout never
/// reaches here, same as the player side.
pub fn device_event_to_wire(event: DeviceOutboundEvent) -> Option<DeviceServerEnvelope> {
    match event {
        DeviceOutboundEvent::HeartBeat(payload) => Some(DeviceServerEnvelope::HeartBeat(payload)),
        DeviceOutboundEvent::LoginResult { code, message } => {
            Some(DeviceServerEnvelope::Login(LoginResultDto { code, message }))
        }
        DeviceOutboundEvent::Control {
            control_type,
            player_id,
            result,
        } => {
            let carries_player = matches!(control_type.as_str(), "start" | "retry");
            Some(DeviceServerEnvelope::Control(ControlDto {
                control_type,
                player_id: carries_player.then_some(player_id),
                result: carries_player.then_some(result),
            }))
        }
        DeviceOutboundEvent::BroadcastMessage(text) => Some(DeviceServerEnvelope::BroadcastMessage(text)),
        DeviceOutboundEvent::Kickout => None,
    }
}

// ---------------------------------------------------------------------
// Back-office HTTP API
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ApiRequest {
    #[serde(rename = "startPlay")]
    StartPlay(StartPlayPayload),
    #[serde(rename = "getDeviceInfos")]
    GetDeviceInfos(Vec<String>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartPlayPayload {
    #[serde(rename = "userToken")]
    pub user_token: String,
    #[serde(rename = "deviceName")]
    pub device_name: String,
    #[serde(default)]
    pub result: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfoDto {
    #[serde(rename = "deviceName")]
    pub device_name: String,
    #[serde(rename = "deviceStatus")]
    pub device_status: String,
    #[serde(rename = "curPlayer")]
    pub cur_player: u64,
}

impl From<crate::domain::device::DeviceInfo> for DeviceInfoDto {
    fn from(info: crate::domain::device::DeviceInfo) -> Self {
        Self {
            device_name: info.device_name,
            device_status: info.device_status,
            cur_player: info.cur_player,
        }
    }
}

/// Substituted for any device name the session has no live actor for, or
/// whose actor fails to answer `GetDeviceInfo` in time.
pub fn offline_device_info(device_name: String) -> DeviceInfoDto {
    DeviceInfoDto {
        device_name,
        device_status: "error".to_string(),
        cur_player: 0,
    }
}
