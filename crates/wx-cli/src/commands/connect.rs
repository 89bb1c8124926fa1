//! `wsexec connect`: attach the local terminal to a server

use anyhow::{Context, Result};

use wx_client::{ClientSession, StdTerminal};
use wx_core::transport::ws;

/// Dial `url` and run an interactive session until it ends
pub async fn connect_command(url: &str) -> Result<()> {
    tracing::info!("Connecting to {}", url);
    let (websocket, response) = tokio_tungstenite::connect_async(url)
        .await
        .with_context(|| format!("Failed to connect to {}", url))?;
    tracing::debug!("Websocket handshake completed: {}", response.status());

    let (sink, source) = ws::split(websocket);
    ClientSession::new(sink, source, StdTerminal::new())
        .run()
        .await
        .context("Session ended with an error")?;

    tracing::info!("Session closed");
    Ok(())
}
