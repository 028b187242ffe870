//! Queries the bridge's REST API and prints its status and most recent signals.
//!
//! ## Usage
//!
//! ```bash
//! SENSORIA_API_URL=http://localhost:8000 cargo run -p sensoria-bridge --example bridge_status
//! ```

use std::env;

use sensoria_bridge::{BridgeConfig, RestClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = BridgeConfig::default();
    if let Ok(api_url) = env::var("SENSORIA_API_URL") {
        config = config.with_api_url(api_url);
    }

    let client = RestClient::new(&config)?;

    let info = client.service_info().await?;
    println!("{} ({})", info.message(), info.status());

    let verification = client.verify_connection().await?;
    match verification.client_address() {
        Some(address) if verification.connected() => println!("Client connected from {address}"),
        _ if verification.connected() => println!("Client connected"),
        _ => println!("No client connected"),
    }

    println!("Status: {}", client.status().await?);

    match client.last_signal().await? {
        Some(signal) => println!("Last signal: {} at {}", signal.signal(), signal.timestamp()),
        None => println!("No signals received yet"),
    }

    for signal in client.history(5).await?.signals() {
        println!("  {} {}", signal.timestamp(), signal.signal());
    }

    Ok(())
}
