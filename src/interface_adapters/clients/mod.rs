// Outbound clients: concrete adapters for the collaborator ports declared in
// `domain::ports`, plus the back-office RPC client.

pub mod backoffice;
pub mod device_token;
pub mod session_model;

pub use backoffice::{BackOfficeClient, BackOfficeError};
pub use device_token::PermissiveDeviceTokenVerifier;
pub use session_model::InMemorySessionTokenStore;
