//! Runs a session against a Sensoria bridge using the `SessionTui` front-end.
//!
//! ## Configuration
//!
//! Every variable is optional, and may be set in a `.env` file:
//! - `SENSORIA_API_URL` - Bridge REST API base URL (default `http://localhost:8000`)
//! - `SENSORIA_STREAM_URL` - Bridge signal stream URL (default `ws://localhost:8000/ws/signals`)
//! - `SENSORIA_TUI_LOG` - File receiving the TUI log
//! - `SENSORIA_TRACE_LOG` - File receiving `tracing` output (default `sensoria.log`)
//! - `RUST_LOG` - `tracing` filter (default `sensoria=info,sensoria_bridge=info`)
//!
//! ## Usage
//!
//! ```bash
//! cargo run --example session_tui
//! ```

use std::{env, fs::File, sync::Mutex};

use dotenvy::dotenv;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use sensoria::{
    error::Result,
    models::BridgeConfig,
    session::{SessionConfig, SessionCoordinator},
    tui::{SessionTui, TuiConfig},
};

fn init_tracing(path: &str) -> Result<()> {
    let file = File::create(path)?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sensoria=info,sensoria_bridge=info".into()),
        )
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    // Direct `stdout`/`stderr` outputs would corrupt the TUI, so `tracing` writes to a file
    let trace_log = env::var("SENSORIA_TRACE_LOG").unwrap_or_else(|_| "sensoria.log".to_string());
    init_tracing(&trace_log)?;

    let mut bridge = BridgeConfig::default();
    if let Ok(api_url) = env::var("SENSORIA_API_URL") {
        bridge = bridge.with_api_url(api_url);
    }
    if let Ok(stream_url) = env::var("SENSORIA_STREAM_URL") {
        bridge = bridge.with_stream_url(stream_url);
    }

    let tui_log = env::var("SENSORIA_TUI_LOG").ok();

    println!("Launching `SessionTui`...");

    let coordinator = SessionCoordinator::new(SessionConfig::default(), &bridge)?.into();

    let session_tui = SessionTui::launch(TuiConfig::default(), coordinator, tui_log.as_deref()).await?;

    session_tui
        .log(format!(
            "Bridge API at {}, signal stream at {}. Press `v` to verify, `s` to start.",
            bridge.api_url(),
            bridge.stream_url()
        ))
        .await?;

    let final_status = session_tui.until_stopped().await;
    println!("`SessionTui` status: {final_status}");

    Ok(())
}
