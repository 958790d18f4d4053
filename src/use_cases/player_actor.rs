// The player actor: one task per connected player socket, processing inbound
// wire messages and lifecycle calls from the session registry, the front
// door, and whichever device it is currently in a room with.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::mpsc;

use crate::domain::device::DeviceHandle;
use crate::domain::mailbox::{CAST_CHANNEL_CAPACITY, Destroyed};
use crate::domain::player::{PlayerCall, PlayerCast, PlayerHandle, PlayerInbound, PlayerOutboundEvent, PlayerPush};
use crate::domain::ports::SessionTokenStore;
use crate::domain::session::{PlayerId, SessionHandle};

/// Player actors that keep panicking are retired rather than restarted
/// forever; the socket that fed them is almost certainly also broken.
const MAX_RESTARTS: u32 = 5;
const RESTART_BACKOFF: Duration = Duration::from_secs(3);

struct PlayerState {
    user_id: PlayerId,
    token: String,
    current_room: Option<DeviceHandle>,
    watch_list: Vec<String>,
    kicked_out: bool,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            user_id: 0,
            token: String::new(),
            current_room: None,
            watch_list: Vec::new(),
            kicked_out: false,
        }
    }
}

struct PlayerCtx {
    session: SessionHandle,
    session_tokens: Arc<dyn SessionTokenStore>,
    outbound: mpsc::UnboundedSender<PlayerOutboundEvent>,
    handle: PlayerHandle,
    destroyed: Destroyed,
}

impl PlayerCtx {
    fn emit(&self, push: PlayerPush) {
        let _ = self.outbound.send(PlayerOutboundEvent::Push(push));
    }
}

/// Spawns a player actor and returns a handle that the front door, the
/// session registry, and any device the player joins can all address.
pub fn spawn_player(
    session: SessionHandle,
    session_tokens: Arc<dyn SessionTokenStore>,
    outbound: mpsc::UnboundedSender<PlayerOutboundEvent>,
) -> PlayerHandle {
    let (call_tx, call_rx) = mpsc::channel(CAST_CHANNEL_CAPACITY);
    let (cast_tx, cast_rx) = mpsc::channel(CAST_CHANNEL_CAPACITY);
    let destroyed = Destroyed::new();
    let handle = PlayerHandle::new(call_tx, cast_tx, destroyed.clone());

    let ctx = PlayerCtx {
        session,
        session_tokens,
        outbound,
        handle: handle.clone(),
        destroyed,
    };
    tokio::spawn(supervise(ctx, call_rx, cast_rx));
    handle
}

async fn supervise(
    ctx: PlayerCtx,
    mut call_rx: mpsc::Receiver<PlayerCall>,
    mut cast_rx: mpsc::Receiver<PlayerCast>,
) {
    let mut state = PlayerState::default();
    let mut restarts = 0u32;
    loop {
        let outcome = AssertUnwindSafe(run_once(&ctx, &mut state, &mut call_rx, &mut cast_rx))
            .catch_unwind()
            .await;
        match outcome {
            Ok(()) => return,
            Err(panic) => {
                restarts += 1;
                tracing::error!(?panic, restarts, "player actor panicked");
                if restarts > MAX_RESTARTS {
                    tracing::error!(user_id = state.user_id, "player actor exceeded restart budget");
                    ctx.destroyed.mark();
                    return;
                }
                tokio::time::sleep(RESTART_BACKOFF).await;
            }
        }
    }
}

async fn run_once(
    ctx: &PlayerCtx,
    state: &mut PlayerState,
    call_rx: &mut mpsc::Receiver<PlayerCall>,
    cast_rx: &mut mpsc::Receiver<PlayerCast>,
) {
    loop {
        tokio::select! {
            biased;
            maybe_call = call_rx.recv() => {
                match maybe_call {
                    Some(call) => {
                        handle_call(ctx, state, call).await;
                        if ctx.destroyed.get() {
                            return;
                        }
                    }
                    None => return,
                }
            }
            maybe_cast = cast_rx.recv() => {
                match maybe_cast {
                    Some(PlayerCast::Inbound(message)) => handle_inbound(ctx, state, message).await,
                    Some(PlayerCast::Push(message)) => ctx.emit(message),
                    None => return,
                }
            }
        }
    }
}

async fn handle_call(ctx: &PlayerCtx, state: &mut PlayerState, call: PlayerCall) {
    match call {
        PlayerCall::Kickout(reply) => {
            let _ = ctx.outbound.send(PlayerOutboundEvent::Kickout);
            state.kicked_out = true;
            let _ = reply.send(());
        }
        PlayerCall::Logout(reply) => {
            if let Some(device) = state.current_room.take() {
                device.leave(state.user_id).await;
            }
            ctx.session.clear_game_subs(state.user_id).await;
            if !state.kicked_out {
                ctx.session.remove_player(state.user_id).await;
            }
            ctx.destroyed.mark();
            let _ = reply.send(());
        }
        PlayerCall::GetToken(reply) => {
            let _ = reply.send(state.token.clone());
        }
    }
}

async fn handle_inbound(ctx: &PlayerCtx, state: &mut PlayerState, message: PlayerInbound) {
    match message {
        PlayerInbound::HeartBeat(payload) => ctx.emit(PlayerPush::HeartBeat(payload)),
        PlayerInbound::Login(token) => handle_login(ctx, state, token).await,
        PlayerInbound::JoinGameRoom(device_name) => {
            if state.user_id == 0 {
                return;
            }
            match ctx.session.get_game(device_name.clone()).await {
                Some(device) => {
                    if let Some(old) = state.current_room.take() {
                        old.leave(state.user_id).await;
                    }
                    device.join(state.user_id, ctx.handle.clone()).await;
                    state.current_room = Some(device);
                }
                None => ctx.emit(PlayerPush::GameStatus {
                    device_name,
                    device_status: "error".to_string(),
                    cur_player: 0,
                }),
            }
        }
        PlayerInbound::LeaveGameRoom(device_name) => {
            if let Some(device) = &state.current_room {
                if *device.device_name == *device_name {
                    let device = state.current_room.take().expect("checked above");
                    device.leave(state.user_id).await;
                }
            }
        }
        PlayerInbound::ControlGame { control_type, result } => {
            if let Some(device) = state.current_room.clone() {
                device.control(control_type, state.user_id, result).await;
            }
        }
        PlayerInbound::WatchGameRooms(names) => {
            let mut fresh = Vec::new();
            for name in names {
                if !state.watch_list.contains(&name) && !fresh.contains(&name) {
                    fresh.push(name);
                }
            }
            if fresh.is_empty() {
                return;
            }
            ctx.session.add_game_subs(state.user_id, fresh.clone()).await;
            state.watch_list.extend(fresh);
        }
        PlayerInbound::UnwatchGameRooms(names) => {
            let present: Vec<String> = names
                .into_iter()
                .filter(|name| state.watch_list.contains(name))
                .collect();
            if present.is_empty() {
                return;
            }
            ctx.session.remove_game_subs(state.user_id, present.clone()).await;
            state.watch_list.retain(|watched| !present.contains(watched));
        }
        PlayerInbound::BroadcastMessage(text) => {
            if let Some(device) = state.current_room.clone() {
                device.broadcast_message(text).await;
            }
        }
    }
}

async fn handle_login(ctx: &PlayerCtx, state: &mut PlayerState, token: String) {
    let Some(id) = parse_prefix_id(&token) else {
        ctx.emit(PlayerPush::LoginResult {
            code: 1,
            message: "invalid token".to_string(),
        });
        return;
    };

    let stored = ctx.session_tokens.get_token(id).await;
    if stored != token {
        ctx.emit(PlayerPush::LoginResult {
            code: 1,
            message: "token mismatch".to_string(),
        });
        return;
    }

    if let Some(existing) = ctx.session.get_player(id).await {
        existing.kickout().await;
    }

    ctx.session.add_player(id, ctx.handle.clone()).await;
    state.user_id = id;
    state.token = token;
    ctx.emit(PlayerPush::LoginResult {
        code: 0,
        message: "ok".to_string(),
    });
}

/// Parses the `"<id>:<rest>"` token shape shared by player and device login,
/// rejecting an empty, non-numeric, or zero id.
fn parse_prefix_id(token: &str) -> Option<PlayerId> {
    let (prefix, _rest) = token.split_once(':')?;
    if prefix.is_empty() {
        return None;
    }
    let id: PlayerId = prefix.parse().ok()?;
    if id == 0 { None } else { Some(id) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    #[test]
    fn parse_prefix_id_rejects_malformed_tokens() {
        assert_eq!(parse_prefix_id("17:abc"), Some(17));
        assert_eq!(parse_prefix_id(":abc"), None);
        assert_eq!(parse_prefix_id("0:abc"), None);
        assert_eq!(parse_prefix_id("notanumber:abc"), None);
        assert_eq!(parse_prefix_id("noseparator"), None);
    }

    struct FixedTokenStore(HashMap<PlayerId, String>);

    #[async_trait]
    impl SessionTokenStore for FixedTokenStore {
        async fn get_token(&self, user_id: PlayerId) -> String {
            self.0.get(&user_id).cloned().unwrap_or_default()
        }
    }

    fn token_store(pairs: &[(PlayerId, &str)]) -> Arc<dyn SessionTokenStore> {
        Arc::new(FixedTokenStore(
            pairs.iter().map(|(id, token)| (*id, token.to_string())).collect(),
        ))
    }

    struct Harness {
        player: PlayerHandle,
        outbound: mpsc::UnboundedReceiver<PlayerOutboundEvent>,
    }

    fn spawn_harness(session: SessionHandle, tokens: Arc<dyn SessionTokenStore>) -> Harness {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let player = spawn_player(session, tokens, outbound_tx);
        Harness {
            player,
            outbound: outbound_rx,
        }
    }

    async fn next_push(harness: &mut Harness) -> PlayerPush {
        match harness.outbound.recv().await.expect("channel open") {
            PlayerOutboundEvent::Push(push) => push,
            PlayerOutboundEvent::Kickout => panic!("expected a push, got kickout"),
        }
    }

    #[tokio::test]
    async fn login_with_matching_token_succeeds() {
        let session = crate::use_cases::spawn_session_registry();
        let mut harness = spawn_harness(session.clone(), token_store(&[(17, "17:abc")]));

        harness.player.recv_message(PlayerInbound::Login("17:abc".to_string())).await;

        match next_push(&mut harness).await {
            PlayerPush::LoginResult { code, .. } => assert_eq!(code, 0),
            other => panic!("unexpected push: {other:?}"),
        }
        assert!(session.get_player(17).await.is_some());
    }

    #[tokio::test]
    async fn login_with_mismatched_token_is_rejected() {
        let session = crate::use_cases::spawn_session_registry();
        let mut harness = spawn_harness(session.clone(), token_store(&[(17, "17:abc")]));

        harness.player.recv_message(PlayerInbound::Login("17:wrong".to_string())).await;

        match next_push(&mut harness).await {
            PlayerPush::LoginResult { code, .. } => assert_eq!(code, 1),
            other => panic!("unexpected push: {other:?}"),
        }
        assert!(session.get_player(17).await.is_none());
    }

    #[tokio::test]
    async fn second_login_kicks_out_the_first_connection() {
        let session = crate::use_cases::spawn_session_registry();
        let tokens = token_store(&[(17, "17:abc")]);
        let mut first = spawn_harness(session.clone(), tokens.clone());
        first.player.recv_message(PlayerInbound::Login("17:abc".to_string())).await;
        let _ = next_push(&mut first).await;

        let mut second = spawn_harness(session.clone(), tokens);
        second.player.recv_message(PlayerInbound::Login("17:abc".to_string())).await;
        let _ = next_push(&mut second).await;

        match first.outbound.recv().await.expect("channel open") {
            PlayerOutboundEvent::Kickout => {}
            other => panic!("expected kickout, got {other:?}"),
        }

        let winner = session.get_player(17).await.expect("player registered");
        // The winner is whichever handle Session now holds; confirm it answers
        // with the token the second connection logged in with.
        assert_eq!(winner.get_token().await.as_deref(), Some("17:abc"));
    }

    #[tokio::test]
    async fn watch_game_rooms_diffs_against_the_local_list() {
        let session = crate::use_cases::spawn_session_registry();
        let mut harness = spawn_harness(session.clone(), token_store(&[(18, "18:abc")]));
        harness.player.recv_message(PlayerInbound::Login("18:abc".to_string())).await;
        let _ = next_push(&mut harness).await;

        harness
            .player
            .recv_message(PlayerInbound::WatchGameRooms(vec![
                "D1".to_string(),
                "D2".to_string(),
                "D1".to_string(),
            ]))
            .await;
        // give the actor a beat to apply the cast before reading session state
        tokio::task::yield_now().await;

        let watchers = session.get_game_subs("D1".to_string()).await;
        assert_eq!(watchers, vec![18]);
        let watchers = session.get_game_subs("D2".to_string()).await;
        assert_eq!(watchers, vec![18]);
    }
}
