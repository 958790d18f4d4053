// Message contract for a Device actor: one task per connected claw-machine
// socket, owning the room roster and play-state for that device.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use super::mailbox::{Destroyed, call, cast};
use super::player::PlayerHandle;
use super::session::PlayerId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceStatus {
    Error,
    Ready,
    Playing,
    Other(String),
}

impl DeviceStatus {
    pub fn as_wire(&self) -> String {
        match self {
            DeviceStatus::Error => "error".to_string(),
            DeviceStatus::Ready => "ready".to_string(),
            DeviceStatus::Playing => "playing".to_string(),
            DeviceStatus::Other(value) => value.clone(),
        }
    }

    pub fn from_wire(value: &str) -> Self {
        match value {
            "error" => DeviceStatus::Error,
            "ready" => DeviceStatus::Ready,
            "playing" => DeviceStatus::Playing,
            other => DeviceStatus::Other(other.to_string()),
        }
    }

    /// Statuses an external watcher (not in the room) is allowed to observe
    /// regardless of whether it is the active player. Transient statuses
    /// outside this set leak only to the current player.
    pub fn visible_to_watchers(&self) -> bool {
        matches!(
            self,
            DeviceStatus::Ready | DeviceStatus::Playing | DeviceStatus::Error
        )
    }
}

#[derive(Debug, Clone)]
pub enum DeviceInbound {
    HeartBeat(String),
    Login(String),
    Status {
        device_status: String,
        cur_player: PlayerId,
    },
    Result {
        play_result: String,
        cur_player: PlayerId,
    },
}

#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub device_name: String,
    pub device_status: String,
    pub cur_player: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlOutcome {
    Ok,
    Busy,
    Unknown(String),
}

pub enum DeviceCall {
    Kickout(oneshot::Sender<()>),
    Logout(oneshot::Sender<()>),
    Join(PlayerId, PlayerHandle, oneshot::Sender<()>),
    Leave(PlayerId, oneshot::Sender<()>),
    Control {
        control_type: String,
        player_id: PlayerId,
        result: i64,
        reply: oneshot::Sender<ControlOutcome>,
    },
    BroadcastMessage(String, oneshot::Sender<()>),
    GetDeviceInfo(oneshot::Sender<DeviceInfo>),
}

pub enum DeviceCast {
    Inbound(DeviceInbound),
}

/// What the net adapter's writer task must push toward the physical device.
#[derive(Debug, Clone)]
pub enum DeviceOutboundEvent {
    HeartBeat(String),
    LoginResult { code: u8, message: String },
    Control {
        control_type: String,
        player_id: PlayerId,
        result: i64,
    },
    BroadcastMessage(String),
    /// Mirrors the player-side kickout wire behavior: a literal `kickout`
    /// frame followed by a close, used when a second login takes over this
    /// device name.
    Kickout,
}

#[derive(Clone)]
pub struct DeviceHandle {
    call_tx: mpsc::Sender<DeviceCall>,
    cast_tx: mpsc::Sender<DeviceCast>,
    destroyed: Destroyed,
    pub device_name: Arc<str>,
}

impl DeviceHandle {
    pub fn new(
        device_name: impl Into<Arc<str>>,
        call_tx: mpsc::Sender<DeviceCall>,
        cast_tx: mpsc::Sender<DeviceCast>,
        destroyed: Destroyed,
    ) -> Self {
        Self {
            call_tx,
            cast_tx,
            destroyed,
            device_name: device_name.into(),
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    pub async fn recv_message(&self, message: DeviceInbound) {
        cast(&self.cast_tx, &self.destroyed, DeviceCast::Inbound(message)).await;
    }

    pub async fn kickout(&self) {
        call(&self.call_tx, &self.destroyed, DeviceCall::Kickout).await;
    }

    pub async fn logout(&self) {
        call(&self.call_tx, &self.destroyed, DeviceCall::Logout).await;
    }

    pub async fn join(&self, player_id: PlayerId, player: PlayerHandle) {
        call(&self.call_tx, &self.destroyed, |reply| {
            DeviceCall::Join(player_id, player, reply)
        })
        .await;
    }

    pub async fn leave(&self, player_id: PlayerId) {
        call(&self.call_tx, &self.destroyed, |reply| {
            DeviceCall::Leave(player_id, reply)
        })
        .await;
    }

    pub async fn control(
        &self,
        control_type: impl Into<String>,
        player_id: PlayerId,
        result: i64,
    ) -> Option<ControlOutcome> {
        let control_type = control_type.into();
        call(&self.call_tx, &self.destroyed, |reply| DeviceCall::Control {
            control_type,
            player_id,
            result,
            reply,
        })
        .await
    }

    pub async fn broadcast_message(&self, text: impl Into<String>) {
        let text = text.into();
        call(&self.call_tx, &self.destroyed, |reply| {
            DeviceCall::BroadcastMessage(text, reply)
        })
        .await;
    }

    pub async fn get_device_info(&self) -> Option<DeviceInfo> {
        call(&self.call_tx, &self.destroyed, DeviceCall::GetDeviceInfo).await
    }
}
