//! Verifies the bridge connection once, without a TUI, and prints the resulting notifications.
//!
//! ## Usage
//!
//! ```bash
//! SENSORIA_API_URL=http://localhost:8000 cargo run --example verify_bridge
//! ```

use std::env;

use dotenvy::dotenv;

use sensoria::{
    error::Result,
    models::BridgeConfig,
    session::{SessionConfig, SessionCoordinator, SessionUpdate},
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sensoria=warn".into()),
        )
        .init();

    let mut bridge = BridgeConfig::default();
    if let Ok(api_url) = env::var("SENSORIA_API_URL") {
        bridge = bridge.with_api_url(api_url);
    }

    let coordinator = SessionCoordinator::new(SessionConfig::default(), &bridge)?;
    let mut update_rx = coordinator.update_receiver();

    for (channel, state) in coordinator.verify().await? {
        println!("{channel}: {state}");
    }

    while let Ok(update) = update_rx.try_recv() {
        if let SessionUpdate::Notification(notification) = update {
            println!("{notification}");
        }
    }

    coordinator.shutdown().await?;

    Ok(())
}
