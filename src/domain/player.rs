// Message contract for a Player actor: one task per connected player socket.

use tokio::sync::{mpsc, oneshot};

use super::mailbox::{Destroyed, call, cast};
use super::session::{DeviceName, PlayerId};

/// Decoded inbound wire message, produced by the net adapter from the raw
/// `{type, data}` frame and handed to the player actor as a cast.
#[derive(Debug, Clone)]
pub enum PlayerInbound {
    HeartBeat(String),
    Login(String),
    JoinGameRoom(DeviceName),
    LeaveGameRoom(DeviceName),
    ControlGame { control_type: String, result: i64 },
    WatchGameRooms(Vec<DeviceName>),
    UnwatchGameRooms(Vec<DeviceName>),
    BroadcastMessage(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomEventKind {
    Join,
    Leave,
}

/// Content pushed toward the player's own socket, originating either from
/// the player actor itself (heartbeat echo, login result) or from a device
/// actor relaying room/status events.
#[derive(Debug, Clone)]
pub enum PlayerPush {
    HeartBeat(String),
    LoginResult { code: u8, message: String },
    GameStatus {
        device_name: DeviceName,
        device_status: String,
        cur_player: PlayerId,
    },
    GamePassTime(i64),
    GameResult(String),
    RoomEvent {
        kind: RoomEventKind,
        player: PlayerId,
        count: usize,
        players: Vec<PlayerId>,
    },
}

/// What the net adapter's writer task must do with a player actor's output.
/// Kickout is modeled separately from `PlayerPush` because it is not a JSON
/// envelope: it is the literal `kickout` byte sequence followed by a close.
#[derive(Debug, Clone)]
pub enum PlayerOutboundEvent {
    Push(PlayerPush),
    Kickout,
}

pub enum PlayerCast {
    Inbound(PlayerInbound),
    Push(PlayerPush),
}

pub enum PlayerCall {
    Kickout(oneshot::Sender<()>),
    Logout(oneshot::Sender<()>),
    GetToken(oneshot::Sender<String>),
}

#[derive(Clone)]
pub struct PlayerHandle {
    call_tx: mpsc::Sender<PlayerCall>,
    cast_tx: mpsc::Sender<PlayerCast>,
    destroyed: Destroyed,
}

impl PlayerHandle {
    pub fn new(
        call_tx: mpsc::Sender<PlayerCall>,
        cast_tx: mpsc::Sender<PlayerCast>,
        destroyed: Destroyed,
    ) -> Self {
        Self {
            call_tx,
            cast_tx,
            destroyed,
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    pub async fn recv_message(&self, message: PlayerInbound) {
        cast(&self.cast_tx, &self.destroyed, PlayerCast::Inbound(message)).await;
    }

    pub async fn push(&self, message: PlayerPush) {
        cast(&self.cast_tx, &self.destroyed, PlayerCast::Push(message)).await;
    }

    pub async fn kickout(&self) {
        call(&self.call_tx, &self.destroyed, PlayerCall::Kickout).await;
    }

    pub async fn logout(&self) {
        call(&self.call_tx, &self.destroyed, PlayerCall::Logout).await;
    }

    pub async fn get_token(&self) -> Option<String> {
        call(&self.call_tx, &self.destroyed, PlayerCall::GetToken).await
    }
}
