// Domain layer: the actor primitives and per-actor message contracts that
// make up the relay's concurrency core. No networking or JSON lives here --
// that belongs to interface_adapters.

pub mod device;
pub mod errors;
pub mod mailbox;
pub mod player;
pub mod ports;
pub mod session;

pub use errors::RelayError;
pub use mailbox::{CALL_TIMEOUT, CAST_CHANNEL_CAPACITY, Destroyed};
pub use ports::{DeviceTokenVerifier, SessionTokenStore};
