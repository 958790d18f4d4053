// Message contract for the single Session Registry actor: the process-wide
// lookup of online players, online devices, and per-device watcher lists.

use tokio::sync::{mpsc, oneshot};

use super::device::DeviceHandle;
use super::mailbox::{Destroyed, call};
use super::player::PlayerHandle;

pub type PlayerId = u64;
pub type DeviceName = String;

/// Every Session operation is a call: the registry's own task is the sole
/// writer of its maps, so there is no cast channel here -- callers always
/// need to observe that their mutation has taken effect before acting on it.
pub enum SessionCall {
    AddGame(DeviceName, DeviceHandle, oneshot::Sender<()>),
    GetGames(Vec<DeviceName>, oneshot::Sender<Vec<Option<DeviceHandle>>>),
    GetGame(DeviceName, oneshot::Sender<Option<DeviceHandle>>),
    RemoveGame(DeviceName, oneshot::Sender<()>),
    GetGameSubs(DeviceName, oneshot::Sender<Vec<PlayerId>>),
    AddPlayer(PlayerId, PlayerHandle, oneshot::Sender<()>),
    GetPlayer(PlayerId, oneshot::Sender<Option<PlayerHandle>>),
    RemovePlayer(PlayerId, oneshot::Sender<()>),
    AddGameSubs(PlayerId, Vec<DeviceName>, oneshot::Sender<()>),
    RemoveGameSubs(PlayerId, Vec<DeviceName>, oneshot::Sender<()>),
    ClearGameSubs(PlayerId, oneshot::Sender<()>),
}

#[derive(Clone)]
pub struct SessionHandle {
    call_tx: mpsc::Sender<SessionCall>,
    destroyed: Destroyed,
}

impl SessionHandle {
    pub fn new(call_tx: mpsc::Sender<SessionCall>) -> Self {
        Self {
            call_tx,
            destroyed: Destroyed::new(),
        }
    }

    pub async fn add_game(&self, name: DeviceName, handle: DeviceHandle) {
        call(&self.call_tx, &self.destroyed, |reply| {
            SessionCall::AddGame(name, handle, reply)
        })
        .await;
    }

    pub async fn get_games(&self, names: Vec<DeviceName>) -> Vec<Option<DeviceHandle>> {
        call(&self.call_tx, &self.destroyed, |reply| {
            SessionCall::GetGames(names, reply)
        })
        .await
        .unwrap_or_default()
    }

    pub async fn get_game(&self, name: DeviceName) -> Option<DeviceHandle> {
        call(&self.call_tx, &self.destroyed, |reply| {
            SessionCall::GetGame(name, reply)
        })
        .await
        .flatten()
    }

    pub async fn remove_game(&self, name: DeviceName) {
        call(&self.call_tx, &self.destroyed, |reply| {
            SessionCall::RemoveGame(name, reply)
        })
        .await;
    }

    pub async fn get_game_subs(&self, name: DeviceName) -> Vec<PlayerId> {
        call(&self.call_tx, &self.destroyed, |reply| {
            SessionCall::GetGameSubs(name, reply)
        })
        .await
        .unwrap_or_default()
    }

    pub async fn add_player(&self, id: PlayerId, handle: PlayerHandle) {
        call(&self.call_tx, &self.destroyed, |reply| {
            SessionCall::AddPlayer(id, handle, reply)
        })
        .await;
    }

    pub async fn get_player(&self, id: PlayerId) -> Option<PlayerHandle> {
        call(&self.call_tx, &self.destroyed, |reply| {
            SessionCall::GetPlayer(id, reply)
        })
        .await
        .flatten()
    }

    pub async fn remove_player(&self, id: PlayerId) {
        call(&self.call_tx, &self.destroyed, |reply| {
            SessionCall::RemovePlayer(id, reply)
        })
        .await;
    }

    pub async fn add_game_subs(&self, id: PlayerId, names: Vec<DeviceName>) {
        if names.is_empty() {
            return;
        }
        call(&self.call_tx, &self.destroyed, |reply| {
            SessionCall::AddGameSubs(id, names, reply)
        })
        .await;
    }

    pub async fn remove_game_subs(&self, id: PlayerId, names: Vec<DeviceName>) {
        if names.is_empty() {
            return;
        }
        call(&self.call_tx, &self.destroyed, |reply| {
            SessionCall::RemoveGameSubs(id, names, reply)
        })
        .await;
    }

    pub async fn clear_game_subs(&self, id: PlayerId) {
        call(&self.call_tx, &self.destroyed, |reply| {
            SessionCall::ClearGameSubs(id, reply)
        })
        .await;
    }
}
