#[tokio::main]
async fn main() {
    if let Err(err) = claw_relay::run_with_config().await {
        tracing::error!(error = %err, "server exited with error");
        std::process::exit(1);
    }
}
