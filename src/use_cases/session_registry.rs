// The session registry actor: a single task owning the three maps that tie
// player ids, device names, and device watcher lists together. No lock is
// used anywhere here -- the task itself is the serialization point.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::mpsc;

use crate::domain::device::DeviceHandle;
use crate::domain::mailbox::CAST_CHANNEL_CAPACITY;
use crate::domain::player::PlayerHandle;
use crate::domain::session::{DeviceName, PlayerId, SessionCall, SessionHandle};

#[derive(Default)]
struct SessionState {
    players: HashMap<PlayerId, PlayerHandle>,
    devices: HashMap<DeviceName, DeviceHandle>,
    watchers: HashMap<DeviceName, Vec<PlayerId>>,
}

/// Spawns the session registry and returns a cloneable handle to it. There is
/// exactly one of these per running relay.
pub fn spawn_session_registry() -> SessionHandle {
    let (call_tx, call_rx) = mpsc::channel(CAST_CHANNEL_CAPACITY);
    tokio::spawn(run(call_rx));
    SessionHandle::new(call_tx)
}

async fn run(mut call_rx: mpsc::Receiver<SessionCall>) {
    let mut state = SessionState::default();
    loop {
        let outcome = AssertUnwindSafe(drain(&mut state, &mut call_rx))
            .catch_unwind()
            .await;
        match outcome {
            Ok(()) => return,
            Err(panic) => {
                tracing::error!(?panic, "session registry panicked, restarting");
                tokio::time::sleep(Duration::from_secs(3)).await;
            }
        }
    }
}

async fn drain(state: &mut SessionState, call_rx: &mut mpsc::Receiver<SessionCall>) {
    while let Some(message) = call_rx.recv().await {
        handle(state, message);
    }
}

fn handle(state: &mut SessionState, message: SessionCall) {
    match message {
        SessionCall::AddGame(name, handle, reply) => {
            state.devices.insert(name, handle);
            let _ = reply.send(());
        }
        SessionCall::GetGames(names, reply) => {
            let result = names
                .iter()
                .map(|name| state.devices.get(name).cloned())
                .collect();
            let _ = reply.send(result);
        }
        SessionCall::GetGame(name, reply) => {
            let _ = reply.send(state.devices.get(&name).cloned());
        }
        SessionCall::RemoveGame(name, reply) => {
            state.devices.remove(&name);
            state.watchers.remove(&name);
            let _ = reply.send(());
        }
        SessionCall::GetGameSubs(name, reply) => {
            let _ = reply.send(state.watchers.get(&name).cloned().unwrap_or_default());
        }
        SessionCall::AddPlayer(id, handle, reply) => {
            state.players.insert(id, handle);
            let _ = reply.send(());
        }
        SessionCall::GetPlayer(id, reply) => {
            let _ = reply.send(state.players.get(&id).cloned());
        }
        SessionCall::RemovePlayer(id, reply) => {
            state.players.remove(&id);
            let _ = reply.send(());
        }
        SessionCall::AddGameSubs(id, names, reply) => {
            // Append without de-duplicating: a player who subscribes to the
            // same device twice shows up twice in its watcher list. Players
            // deduplicate their own watch list before calling this.
            for name in names {
                state.watchers.entry(name).or_default().push(id);
            }
            let _ = reply.send(());
        }
        SessionCall::RemoveGameSubs(id, names, reply) => {
            for name in names {
                if let Some(list) = state.watchers.get_mut(&name) {
                    list.retain(|&watcher| watcher != id);
                }
            }
            let _ = reply.send(());
        }
        SessionCall::ClearGameSubs(id, reply) => {
            for list in state.watchers.values_mut() {
                list.retain(|&watcher| watcher != id);
            }
            let _ = reply.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_game_subs_does_not_deduplicate() {
        let session = spawn_session_registry();
        session
            .add_game_subs(18, vec!["D1".to_string(), "D2".to_string(), "D1".to_string()])
            .await;
        let watchers = session.get_game_subs("D1".to_string()).await;
        assert_eq!(watchers, vec![18, 18]);
    }

    #[tokio::test]
    async fn clear_game_subs_removes_every_occurrence() {
        let session = spawn_session_registry();
        session
            .add_game_subs(18, vec!["D1".to_string(), "D1".to_string()])
            .await;
        session.clear_game_subs(18).await;
        assert!(session.get_game_subs("D1".to_string()).await.is_empty());
    }

    #[tokio::test]
    async fn remove_game_clears_its_watcher_list() {
        let session = spawn_session_registry();
        session.add_game_subs(18, vec!["D1".to_string()]).await;
        session.remove_game("D1".to_string()).await;
        assert!(session.get_game_subs("D1".to_string()).await.is_empty());
    }

    #[tokio::test]
    async fn get_games_preserves_input_order_including_misses() {
        let session = spawn_session_registry();
        let result = session
            .get_games(vec!["missing-a".to_string(), "missing-b".to_string()])
            .await;
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|entry| entry.is_none()));
    }
}
