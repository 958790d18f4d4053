// Thin reqwest wrapper over the back-office's `<service>/<method>` JSON-RPC
// convention, used here only for `play/GetResult` after a device reports a
// play outcome.

use std::fmt;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug)]
pub enum BackOfficeError {
    Transport(reqwest::Error),
    Upstream(String),
    Decode(reqwest::Error),
}

impl fmt::Display for BackOfficeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackOfficeError::Transport(err) => write!(f, "back-office transport error: {err}"),
            BackOfficeError::Upstream(message) => write!(f, "back-office upstream error: {message}"),
            BackOfficeError::Decode(err) => write!(f, "back-office response decode error: {err}"),
        }
    }
}

impl std::error::Error for BackOfficeError {}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Clone)]
pub struct BackOfficeClient {
    http: Client,
    api_root: String,
    api_secret: String,
}

impl BackOfficeClient {
    pub fn new(
        api_root: impl Into<String>,
        api_secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_root: api_root.into(),
            api_secret: api_secret.into(),
        })
    }

    pub async fn get_result(
        &self,
        device_name: &str,
        cur_player: u64,
        play_result: &str,
    ) -> Result<Value, BackOfficeError> {
        self.call_api(
            "play",
            "GetResult",
            serde_json::json!([self.api_secret, device_name, cur_player, play_result]),
        )
        .await
    }

    async fn call_api(&self, service: &str, method: &str, params: Value) -> Result<Value, BackOfficeError> {
        let url = format!("{}/{service}/{method}", self.api_root);
        tracing::debug!(%url, %params, "calling back-office");
        let response = self
            .http
            .post(url)
            .json(&params)
            .send()
            .await
            .map_err(BackOfficeError::Transport)?;
        let envelope: ApiEnvelope = response.json().await.map_err(BackOfficeError::Decode)?;
        tracing::debug!(error = ?envelope.error, data = ?envelope.data, "back-office response");
        if let Some(error) = envelope.error {
            return Err(BackOfficeError::Upstream(error));
        }
        envelope
            .data
            .ok_or_else(|| BackOfficeError::Upstream("response missing `data`".to_string()))
    }
}
