// The device actor: one task per connected claw-machine socket, owning the
// room roster, play slot, and status for that device.

use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures::FutureExt;
use tokio::sync::mpsc;

use crate::domain::device::{
    ControlOutcome, DeviceCall, DeviceCast, DeviceHandle, DeviceInbound, DeviceInfo, DeviceOutboundEvent,
    DeviceStatus,
};
use crate::domain::mailbox::{CAST_CHANNEL_CAPACITY, Destroyed};
use crate::domain::player::{PlayerHandle, PlayerPush, RoomEventKind};
use crate::domain::ports::DeviceTokenVerifier;
use crate::domain::session::{PlayerId, SessionHandle};
use crate::interface_adapters::clients::backoffice::BackOfficeClient;

const MAX_RESTARTS: u32 = 5;
const RESTART_BACKOFF: Duration = Duration::from_secs(3);

struct DeviceState {
    device_name: String,
    token: String,
    players: HashMap<PlayerId, PlayerHandle>,
    join_order: Vec<PlayerId>,
    status: DeviceStatus,
    current_player_id: PlayerId,
    start_time: i64,
    is_leave: bool,
    kicked_out: bool,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            device_name: String::new(),
            token: String::new(),
            players: HashMap::new(),
            join_order: Vec::new(),
            status: DeviceStatus::Error,
            current_player_id: 0,
            start_time: 0,
            is_leave: false,
            kicked_out: false,
        }
    }
}

struct DeviceCtx {
    session: SessionHandle,
    device_tokens: Arc<dyn DeviceTokenVerifier>,
    back_office: Arc<BackOfficeClient>,
    outbound: mpsc::UnboundedSender<DeviceOutboundEvent>,
    handle: DeviceHandle,
    destroyed: Destroyed,
}

/// Spawns a device actor and returns a handle addressable by the session
/// registry, the front door, and any player that joins its room.
pub fn spawn_device(
    session: SessionHandle,
    device_tokens: Arc<dyn DeviceTokenVerifier>,
    back_office: Arc<BackOfficeClient>,
    outbound: mpsc::UnboundedSender<DeviceOutboundEvent>,
) -> DeviceHandle {
    let (call_tx, call_rx) = mpsc::channel(CAST_CHANNEL_CAPACITY);
    let (cast_tx, cast_rx) = mpsc::channel(CAST_CHANNEL_CAPACITY);
    let destroyed = Destroyed::new();
    // Real name is filled in at login; until then the handle is addressable
    // only by the task that spawned it.
    let handle = DeviceHandle::new("", call_tx, cast_tx, destroyed.clone());

    let ctx = DeviceCtx {
        session,
        device_tokens,
        back_office,
        outbound,
        handle: handle.clone(),
        destroyed,
    };
    tokio::spawn(supervise(ctx, call_rx, cast_rx));
    handle
}

async fn supervise(
    ctx: DeviceCtx,
    mut call_rx: mpsc::Receiver<DeviceCall>,
    mut cast_rx: mpsc::Receiver<DeviceCast>,
) {
    let mut state = DeviceState::default();
    let mut restarts = 0u32;
    loop {
        let outcome = AssertUnwindSafe(run_once(&ctx, &mut state, &mut call_rx, &mut cast_rx))
            .catch_unwind()
            .await;
        match outcome {
            Ok(()) => return,
            Err(panic) => {
                restarts += 1;
                tracing::error!(?panic, restarts, device_name = %state.device_name, "device actor panicked");
                if restarts > MAX_RESTARTS {
                    tracing::error!(device_name = %state.device_name, "device actor exceeded restart budget");
                    ctx.destroyed.mark();
                    return;
                }
                tokio::time::sleep(RESTART_BACKOFF).await;
            }
        }
    }
}

async fn run_once(
    ctx: &DeviceCtx,
    state: &mut DeviceState,
    call_rx: &mut mpsc::Receiver<DeviceCall>,
    cast_rx: &mut mpsc::Receiver<DeviceCast>,
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
                    Some(DeviceCast::Inbound(message)) => handle_inbound(ctx, state, message).await,
                    None => return,
                }
            }
        }
    }
}

async fn handle_call(ctx: &DeviceCtx, state: &mut DeviceState, call: DeviceCall) {
    match call {
        DeviceCall::Kickout(reply) => {
            let _ = ctx.outbound.send(DeviceOutboundEvent::Kickout);
            state.kicked_out = true;
            let _ = reply.send(());
        }
        DeviceCall::Logout(reply) => {
            state.status = DeviceStatus::Error;
            state.current_player_id = 0;
            broadcast_status(ctx, state).await;
            if !state.kicked_out {
                ctx.session.remove_game(state.device_name.clone()).await;
            }
            ctx.destroyed.mark();
            let _ = reply.send(());
        }
        DeviceCall::Join(player_id, player, reply) => {
            if player_id == state.current_player_id {
                state.is_leave = false;
                let elapsed = now_unix() - state.start_time;
                player.push(PlayerPush::GamePassTime(elapsed)).await;
            }
            state.players.insert(player_id, player);
            state.join_order.push(player_id);
            broadcast_room_event(state, RoomEventKind::Join, player_id).await;
            let _ = reply.send(());
        }
        DeviceCall::Leave(player_id, reply) => {
            if player_id == state.current_player_id {
                state.is_leave = true;
            }
            state.players.remove(&player_id);
            state.join_order.retain(|&id| id != player_id);
            broadcast_room_event(state, RoomEventKind::Leave, player_id).await;
            let _ = reply.send(());
        }
        DeviceCall::Control {
            control_type,
            player_id,
            result,
            reply,
        } => {
            let outcome = handle_control(ctx, state, &control_type, player_id, result).await;
            let _ = reply.send(outcome);
        }
        DeviceCall::BroadcastMessage(text, reply) => {
            let _ = ctx.outbound.send(DeviceOutboundEvent::BroadcastMessage(text));
            let _ = reply.send(());
        }
        DeviceCall::GetDeviceInfo(reply) => {
            let _ = reply.send(DeviceInfo {
                device_name: state.device_name.clone(),
                device_status: state.status.as_wire(),
                cur_player: state.current_player_id,
            });
        }
    }
}

async fn handle_control(
    ctx: &DeviceCtx,
    state: &mut DeviceState,
    control_type: &str,
    player_id: PlayerId,
    result: i64,
) -> ControlOutcome {
    match control_type {
        "start" => {
            if state.current_player_id != 0 && state.current_player_id != player_id {
                return ControlOutcome::Busy;
            }
            let is_retry = state.current_player_id == player_id;
            state.current_player_id = player_id;
            state.start_time = now_unix();
            let emitted = if is_retry { "retry" } else { "start" };
            let _ = ctx.outbound.send(DeviceOutboundEvent::Control {
                control_type: emitted.to_string(),
                player_id,
                result,
            });
            ControlOutcome::Ok
        }
        "catch" | "stopmove" | "up" | "down" | "left" | "right" | "retry" | "noretry" => {
            let _ = ctx.outbound.send(DeviceOutboundEvent::Control {
                control_type: control_type.to_string(),
                player_id,
                result,
            });
            ControlOutcome::Ok
        }
        other => ControlOutcome::Unknown(other.to_string()),
    }
}

async fn handle_inbound(ctx: &DeviceCtx, state: &mut DeviceState, message: DeviceInbound) {
    match message {
        DeviceInbound::HeartBeat(payload) => {
            let _ = ctx.outbound.send(DeviceOutboundEvent::HeartBeat(payload));
        }
        DeviceInbound::Login(token) => handle_login(ctx, state, token).await,
        DeviceInbound::Status {
            device_status,
            cur_player,
        } => {
            state.status = DeviceStatus::from_wire(&device_status);
            state.current_player_id = cur_player;
            if cur_player == 0 {
                state.start_time = 0;
                state.is_leave = false;
            }
            broadcast_status(ctx, state).await;
        }
        DeviceInbound::Result { play_result, cur_player } => {
            handle_result(ctx, state, play_result, cur_player).await;
        }
    }
}

async fn handle_login(ctx: &DeviceCtx, state: &mut DeviceState, token: String) {
    let Some((name, rest)) = parse_device_token(&token) else {
        let _ = ctx.outbound.send(DeviceOutboundEvent::LoginResult {
            code: 1,
            message: "invalid token".to_string(),
        });
        return;
    };

    if !ctx.device_tokens.verify(&name, &rest).await {
        let _ = ctx.outbound.send(DeviceOutboundEvent::LoginResult {
            code: 1,
            message: "device token rejected".to_string(),
        });
        return;
    }

    if let Some(existing) = ctx.session.get_game(name.clone()).await {
        existing.kickout().await;
    }

    ctx.session.add_game(name.clone(), ctx.handle.clone()).await;
    state.device_name = name;
    state.token = token;
    let _ = ctx.outbound.send(DeviceOutboundEvent::LoginResult {
        code: 0,
        message: "ok".to_string(),
    });
}

async fn handle_result(ctx: &DeviceCtx, state: &DeviceState, play_result: String, cur_player: PlayerId) {
    if cur_player != state.current_player_id {
        tracing::debug!(cur_player, active = state.current_player_id, "stale result, dropping");
        return;
    }

    let outcome = ctx
        .back_office
        .get_result(&state.device_name, cur_player, &play_result)
        .await;
    let Ok(_) = outcome else {
        tracing::warn!(device_name = %state.device_name, error = ?outcome.err(), "back-office result call failed");
        return;
    };

    let player = ctx.session.get_player(cur_player).await;
    match player {
        Some(player) if !state.is_leave => {
            player.push(PlayerPush::GameResult(play_result)).await;
        }
        _ => {
            let _ = ctx.outbound.send(DeviceOutboundEvent::Control {
                control_type: "noretry".to_string(),
                player_id: cur_player,
                result: 0,
            });
        }
    }
}

async fn broadcast_room_event(state: &DeviceState, kind: RoomEventKind, player_id: PlayerId) {
    let players = last_joiners(&state.join_order, 3);
    let count = state.players.len();
    let push = PlayerPush::RoomEvent {
        kind,
        player: player_id,
        count,
        players,
    };
    for player in state.players.values() {
        player.push(push.clone()).await;
    }
}

async fn broadcast_status(ctx: &DeviceCtx, state: &DeviceState) {
    let push = PlayerPush::GameStatus {
        device_name: state.device_name.clone(),
        device_status: state.status.as_wire(),
        cur_player: state.current_player_id,
    };
    for player in state.players.values() {
        player.push(push.clone()).await;
    }

    let watchers = ctx.session.get_game_subs(state.device_name.clone()).await;
    if watchers.is_empty() {
        return;
    }
    let in_room: HashSet<PlayerId> = state.players.keys().copied().collect();
    for watcher_id in watchers {
        if in_room.contains(&watcher_id) {
            continue;
        }
        let allowed = state.status.visible_to_watchers() || watcher_id == state.current_player_id;
        if !allowed {
            continue;
        }
        if let Some(player) = ctx.session.get_player(watcher_id).await {
            player.push(push.clone()).await;
        }
    }
}

fn last_joiners(join_order: &[PlayerId], count: usize) -> Vec<PlayerId> {
    join_order.iter().rev().take(count).copied().collect()
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Parses the `"<deviceName>:<rest>"` login token shape.
fn parse_device_token(token: &str) -> Option<(String, String)> {
    let (name, rest) = token.split_once(':')?;
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), rest.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    #[test]
    fn parse_device_token_rejects_empty_name() {
        assert_eq!(
            parse_device_token("D1:abc"),
            Some(("D1".to_string(), "abc".to_string()))
        );
        assert_eq!(parse_device_token(":abc"), None);
        assert_eq!(parse_device_token("noseparator"), None);
    }

    #[test]
    fn last_joiners_returns_newest_first() {
        let order = vec![1, 2, 3, 4, 5];
        assert_eq!(last_joiners(&order, 3), vec![5, 4, 3]);
        assert_eq!(last_joiners(&order, 10), vec![5, 4, 3, 2, 1]);
    }

    struct AcceptAllVerifier;

    #[async_trait]
    impl DeviceTokenVerifier for AcceptAllVerifier {
        async fn verify(&self, device_name: &str, _rest: &str) -> bool {
            !device_name.is_empty()
        }
    }

    fn test_back_office() -> Arc<BackOfficeClient> {
        Arc::new(
            BackOfficeClient::new("http://127.0.0.1:0", "secret", Duration::from_millis(50))
                .expect("client builds without making a request"),
        )
    }

    struct Harness {
        device: DeviceHandle,
        outbound: mpsc::UnboundedReceiver<DeviceOutboundEvent>,
    }

    fn spawn_harness(session: SessionHandle) -> Harness {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let device = spawn_device(session, Arc::new(AcceptAllVerifier), test_back_office(), outbound_tx);
        Harness {
            device,
            outbound: outbound_rx,
        }
    }

    async fn next_event(harness: &mut Harness) -> DeviceOutboundEvent {
        harness.outbound.recv().await.expect("channel open")
    }

    #[tokio::test]
    async fn login_registers_the_device_with_session() {
        let session = crate::use_cases::spawn_session_registry();
        let mut harness = spawn_harness(session.clone());
        harness.device.recv_message(DeviceInbound::Login("D1:abc".to_string())).await;

        match next_event(&mut harness).await {
            DeviceOutboundEvent::LoginResult { code, .. } => assert_eq!(code, 0),
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(session.get_game("D1".to_string()).await.is_some());
    }

    #[tokio::test]
    async fn control_start_then_busy_for_a_second_player() {
        let session = crate::use_cases::spawn_session_registry();
        let mut harness = spawn_harness(session);
        harness.device.recv_message(DeviceInbound::Login("D1:abc".to_string())).await;
        let _ = next_event(&mut harness).await;

        let first = harness.device.control("start", 17, 0).await;
        assert_eq!(first, Some(ControlOutcome::Ok));
        match next_event(&mut harness).await {
            DeviceOutboundEvent::Control { control_type, player_id, .. } => {
                assert_eq!(control_type, "start");
                assert_eq!(player_id, 17);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        let second = harness.device.control("start", 18, 0).await;
        assert_eq!(second, Some(ControlOutcome::Busy));
    }

    #[tokio::test]
    async fn control_start_for_the_same_player_again_is_a_retry() {
        let session = crate::use_cases::spawn_session_registry();
        let mut harness = spawn_harness(session);
        harness.device.recv_message(DeviceInbound::Login("D1:abc".to_string())).await;
        let _ = next_event(&mut harness).await;

        let _ = harness.device.control("start", 17, 0).await;
        let _ = next_event(&mut harness).await;

        let again = harness.device.control("start", 17, 0).await;
        assert_eq!(again, Some(ControlOutcome::Ok));
        match next_event(&mut harness).await {
            DeviceOutboundEvent::Control { control_type, .. } => assert_eq!(control_type, "retry"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_control_type_is_rejected() {
        let session = crate::use_cases::spawn_session_registry();
        let mut harness = spawn_harness(session);
        harness.device.recv_message(DeviceInbound::Login("D1:abc".to_string())).await;
        let _ = next_event(&mut harness).await;

        let outcome = harness.device.control("teleport", 17, 0).await;
        assert_eq!(outcome, Some(ControlOutcome::Unknown("teleport".to_string())));
    }
}
