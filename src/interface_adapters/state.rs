use std::sync::Arc;

use crate::domain::ports::{DeviceTokenVerifier, SessionTokenStore};
use crate::domain::session::SessionHandle;
use crate::interface_adapters::clients::BackOfficeClient;

#[derive(Clone)]
pub struct AppState {
    // The single Session Registry actor, shared by every connection handler.
    pub session: SessionHandle,
    // Outbound client used to relay play outcomes to the back-office.
    pub back_office: Arc<BackOfficeClient>,
    // Consulted once per player login.
    pub session_tokens: Arc<dyn SessionTokenStore>,
    // Consulted once per device login.
    pub device_tokens: Arc<dyn DeviceTokenVerifier>,
}
