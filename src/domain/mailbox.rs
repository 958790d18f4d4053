// The call/cast primitive shared by every actor in the relay: the session
// registry, and one instance each of the player and device actors per
// connection.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

/// Bound applied to every actor's cast queue. Producers block rather than
/// drop once it fills, so a slow consumer applies backpressure upstream.
pub const CAST_CHANNEL_CAPACITY: usize = 512;

/// Timeout applied independently to the enqueue leg and the reply leg of a
/// call.
pub const CALL_TIMEOUT: Duration = Duration::from_millis(500);

/// Tombstone flag shared by every clone of an actor's handle. Once set, all
/// further call/cast sends on that handle are no-ops.
#[derive(Clone)]
pub struct Destroyed(Arc<AtomicBool>);

impl Destroyed {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn mark(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Default for Destroyed {
    fn default() -> Self {
        Self::new()
    }
}

/// Sends a call-style message built around a reply slot allocated fresh for
/// this one call, then awaits the reply under `CALL_TIMEOUT`. A `None`
/// result means the target timed out or was already destroyed; callers must
/// treat that as a soft failure, never a panic.
pub async fn call<C, R>(
    tx: &mpsc::Sender<C>,
    destroyed: &Destroyed,
    build: impl FnOnce(oneshot::Sender<R>) -> C,
) -> Option<R> {
    if destroyed.get() {
        return None;
    }
    let (reply_tx, reply_rx) = oneshot::channel();
    let message = build(reply_tx);
    if timeout(CALL_TIMEOUT, tx.send(message)).await.is_err() {
        return None;
    }
    match timeout(CALL_TIMEOUT, reply_rx).await {
        Ok(Ok(reply)) => Some(reply),
        // Timed out, or the actor dropped the reply sender without answering
        // (e.g. it panicked mid-handler). Either way: no reply.
        _ => None,
    }
}

/// Enqueues a cast-style message. Blocks the caller under backpressure while
/// the bounded queue is full; drops silently once the target is destroyed.
pub async fn cast<C>(tx: &mpsc::Sender<C>, destroyed: &Destroyed, message: C) {
    if destroyed.get() {
        return;
    }
    let _ = tx.send(message).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn call_returns_reply() {
        let (tx, mut rx) = mpsc::channel::<oneshot::Sender<u32>>(1);
        let destroyed = Destroyed::new();
        tokio::spawn(async move {
            let reply = rx.recv().await.unwrap();
            let _ = reply.send(42);
        });
        let result = call(&tx, &destroyed, |reply| reply).await;
        assert_eq!(result, Some(42));
    }

    #[tokio::test]
    async fn call_to_destroyed_handle_returns_none_immediately() {
        let (tx, _rx) = mpsc::channel::<oneshot::Sender<u32>>(1);
        let destroyed = Destroyed::new();
        destroyed.mark();
        let start = Instant::now();
        let result = call(&tx, &destroyed, |reply| reply).await;
        assert_eq!(result, None);
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn call_with_no_receiver_times_out_to_none() {
        let (tx, rx) = mpsc::channel::<oneshot::Sender<u32>>(1);
        // Nobody ever drains `rx` or answers the oneshot; the reply leg times out.
        let _rx = rx;
        let destroyed = Destroyed::new();
        let result = call(&tx, &destroyed, |reply| reply).await;
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn cast_to_destroyed_handle_is_a_silent_drop() {
        let (tx, mut rx) = mpsc::channel::<u32>(1);
        let destroyed = Destroyed::new();
        destroyed.mark();
        cast(&tx, &destroyed, 7).await;
        assert!(rx.try_recv().is_err());
    }
}
