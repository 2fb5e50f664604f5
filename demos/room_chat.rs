//! Room chat example
//!
//! Joins a room, prints everything published to it and posts a few messages.
//!
//! Run with: cargo run --example room_chat -- <project-hash> <jwt>

use serde_json::json;
use socketbase::{ClientBuilder, Event, EventKind};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    socketbase::core::init_logging("info")?;

    let mut args = std::env::args().skip(1);
    let hash = args.next().unwrap_or_else(|| "demo-project".to_string());
    let jwt = args.next().unwrap_or_else(|| "demo-token".to_string());

    let client = ClientBuilder::new(hash, jwt)
        .url("ws://127.0.0.1:8080")
        .request_timeout(Duration::from_secs(5))
        .connect()
        .await?;

    client
        .on(EventKind::Message, |event| async move {
            if let Event::Message(message) = event {
                println!("[{}] {:?}: {}", message.room, message.from, message.payload);
            }
        })
        .await;
    client
        .on(EventKind::Broadcast, |event| async move {
            if let Event::Broadcast(message) = event {
                println!("[*] {}", message.payload);
            }
        })
        .await;

    let ack = client.join("lobby").await?;
    println!("Joined {}", ack.room);

    for i in 1..=3 {
        client.send("lobby", json!({"text": format!("hello #{}", i)})).await?;
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    client.broadcast(json!({"text": "goodbye"})).await?;

    client.leave("lobby").await?;
    client.close().await;
    Ok(())
}
