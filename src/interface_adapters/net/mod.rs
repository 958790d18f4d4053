// Network adapter modules: one per Front Door entry point.

pub mod api;
pub mod device_ws;
pub mod player_ws;

pub use api::api_handler;
pub use device_ws::device_ws_handler;
pub use player_ws::player_ws_handler;
