// Use cases layer: the actor loops that implement the relay's workflows.

pub mod device_actor;
pub mod player_actor;
pub mod session_registry;

pub use device_actor::spawn_device;
pub use player_actor::spawn_player;
pub use session_registry::spawn_session_registry;
