// Framework bootstrap for the relay runtime.

use crate::domain::ports::{DeviceTokenVerifier, SessionTokenStore};
use crate::frameworks::config::{self, Config};
use crate::interface_adapters::clients::{BackOfficeClient, InMemorySessionTokenStore, PermissiveDeviceTokenVerifier};
use crate::interface_adapters::net::{api_handler, device_ws_handler, player_ws_handler};
use crate::interface_adapters::state::AppState;
use crate::use_cases::spawn_session_registry;

use axum::{
    Router,
    routing::{get, post},
};
use std::{io::Result, sync::Arc};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state(Config::defaults()).await?;

    let app = Router::new()
        .route("/player", get(player_ws_handler))
        .route("/Game", get(device_ws_handler))
        .route("/api", post(api_handler))
        .with_state(state);

    tracing::info!(%address, "listening");

    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let config = Config::load(&config::config_path());
    let socket_addr = config.socket_addr;
    let state = build_state(config).await?;

    let listener = tokio::net::TcpListener::bind(socket_addr).await.inspect_err(|e| {
        tracing::error!(%socket_addr, error = %e, "failed to bind");
    })?;
    let address = listener.local_addr()?;

    let app = Router::new()
        .route("/player", get(player_ws_handler))
        .route("/Game", get(device_ws_handler))
        .route("/api", post(api_handler))
        .with_state(state);

    tracing::info!(%address, "listening");

    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

async fn build_state(config: Config) -> Result<Arc<AppState>> {
    let back_office = BackOfficeClient::new(config.api_root.clone(), config.api_secret.clone(), config::back_office_timeout())
        .map_err(|e| std::io::Error::other(format!("failed to initialize back-office client: {e}")))?;
    tracing::debug!(api_root = %config.api_root, "back-office client configured");

    let session = spawn_session_registry();
    let session_tokens: Arc<dyn SessionTokenStore> = Arc::new(InMemorySessionTokenStore::empty());
    let device_tokens: Arc<dyn DeviceTokenVerifier> = Arc::new(PermissiveDeviceTokenVerifier);

    Ok(Arc::new(AppState {
        session,
        back_office: Arc::new(back_office),
        session_tokens,
        device_tokens,
    }))
}
