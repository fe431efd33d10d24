//! A two-player lockstep duel server.
//!
//! Runs the stock [`LockstepLogic`]: the server never simulates anything,
//! it seals one input set per seated player into a frame every 100 ms
//! and relays it to both. Ctrl-C shuts it down cleanly.
//!
//! ```text
//! RUST_LOG=lockrelay=debug cargo run -p lockstep-duel
//! ```

use std::time::Duration;

use lockrelay::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), LockrelayError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let app = AppBuilder::new()
        .bind("0.0.0.0:9000")
        .fixed_delta(Duration::from_millis(100))
        .room_config(RoomConfig {
            max_users: 2,
            max_ticks: None,
        })
        .startup::<LockstepLogic>()
        .await?;

    let shutdown = app.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("ctrl-c received");
            shutdown.shutdown();
        }
    });

    app.run().await
}
