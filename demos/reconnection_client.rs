//! Example demonstrating automatic reconnection
//!
//! Connects with linear backoff, then keeps publishing. Stop and restart the
//! server to watch frames queue up while disconnected and flush on reconnect.
//!
//! Run with: cargo run --example reconnection_client

use serde_json::json;
use socketbase::client::LinearBackoff;
use socketbase::{ClientBuilder, Event, EventKind};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    socketbase::core::init_logging("debug")?;

    let strategy = LinearBackoff::new(Duration::from_secs(1)).with_max_attempts(10);
    let client = ClientBuilder::new("demo-project", "demo-token")
        .url("ws://127.0.0.1:8080")
        .with_reconnect(Box::new(strategy))
        .connect()
        .await?;

    client
        .on(EventKind::Close, |event| async move {
            if let Event::Close(info) = event {
                println!("Connection closed ({:?}): {}", info.code, info.reason);
            }
        })
        .await;
    client
        .on(EventKind::Open, |_| async move {
            println!("Connection open");
        })
        .await;

    let mut counter = 0u64;
    loop {
        counter += 1;
        if let Err(e) = client.broadcast(json!({"tick": counter})).await {
            println!("Publish failed: {}", e);
        }
        println!(
            "[{}] state={:?} queued={}",
            counter,
            client.connection_state().await,
            client.queued_frames().await
        );
        tokio::time::sleep(Duration::from_secs(2)).await;
    }
}
