mod support;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

#[tokio::test]
async fn device_login_then_reported_via_get_device_infos() {
    let base_url = support::ensure_server();
    let ws_url = format!("{}/Game", base_url.replacen("http://", "ws://", 1));

    let (mut socket, _response) = tokio_tungstenite::connect_async(ws_url)
        .await
        .expect("device socket should connect");

    let login = serde_json::json!({"type": "login", "data": "test-claw-1:secret"});
    socket
        .send(Message::Text(login.to_string().into()))
        .await
        .expect("login frame should send");

    let reply = socket.next().await.expect("socket open").expect("valid frame");
    let Message::Text(text) = reply else {
        panic!("expected a text frame");
    };
    let reply: serde_json::Value = serde_json::from_str(&text).expect("valid json");
    assert_eq!(reply["type"], "login");
    assert_eq!(reply["data"]["code"], 0);

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{base_url}/api"))
        .json(&serde_json::json!({"type": "getDeviceInfos", "data": ["test-claw-1"]}))
        .send()
        .await
        .expect("request should succeed");

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = response.json().await.expect("json body");
    assert_eq!(body["data"]["test-claw-1"]["deviceStatus"], "error");
    assert_eq!(body["data"]["test-claw-1"]["curPlayer"], 0);
}

#[tokio::test]
async fn get_device_infos_substitutes_offline_entry_for_unknown_device() {
    let base_url = support::ensure_server();
    let client = reqwest::Client::new();
    let response = client
        .post(format!("{base_url}/api"))
        .json(&serde_json::json!({"type": "getDeviceInfos", "data": ["never-logged-in"]}))
        .send()
        .await
        .expect("request should succeed");

    let body: serde_json::Value = response.json().await.expect("json body");
    assert_eq!(body["data"]["never-logged-in"]["deviceStatus"], "error");
    assert_eq!(body["data"]["never-logged-in"]["curPlayer"], 0);
}

#[tokio::test]
async fn start_play_rejects_an_offline_player() {
    let base_url = support::ensure_server();
    let client = reqwest::Client::new();
    let response = client
        .post(format!("{base_url}/api"))
        .json(&serde_json::json!({
            "type": "startPlay",
            "data": {"userToken": "999:abc", "deviceName": "D1", "result": 0}
        }))
        .send()
        .await
        .expect("request should succeed");

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await.expect("json body");
    assert_eq!(body["error"], "player not online");
}
