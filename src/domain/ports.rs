// Collaborator ports consumed by the player and device actors. Concrete
// implementations live in interface_adapters::clients.

use async_trait::async_trait;

/// External session-token store consulted once per player login. Storage is
/// out of scope for the relay; this is the seam a real session service binds
/// behind.
#[async_trait]
pub trait SessionTokenStore: Send + Sync {
    async fn get_token(&self, user_id: u64) -> String;
}

/// Device credential check performed at device login. The production
/// implementation is a stub (see `PermissiveDeviceTokenVerifier`) pending a
/// real device-auth scheme.
#[async_trait]
pub trait DeviceTokenVerifier: Send + Sync {
    async fn verify(&self, device_name: &str, token_rest: &str) -> bool;
}
