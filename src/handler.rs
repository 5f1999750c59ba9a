//! WebSocket connection handler
//!
//! The transport side of the hub: performs the WebSocket handshake, forwards
//! inbound frames in order, writes the connection's outbound queue to the
//! socket, and reports exactly one close or error when the connection ends.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info};

use crate::error::AppError;
use crate::message::{ChatMessage, InboundFrame};
use crate::server::HubHandle;
use crate::types::ConnectionId;

/// Handle a new TCP connection
///
/// Performs WebSocket handshake, sets up bidirectional communication,
/// and manages the connection lifecycle.
pub async fn handle_connection(
    stream: TcpStream,
    hub: HubHandle,
    outbound_buffer: usize,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {}", peer_addr);

    // WebSocket handshake
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let conn_id = ConnectionId::new();
    info!("Connection {} established from {}", conn_id, peer_addr);

    // Bounded hub -> client queue; the hub drops its sender to close us
    let (msg_tx, mut msg_rx) = mpsc::channel::<ChatMessage>(outbound_buffer);

    // Register with the hub, which queues the welcome frame
    hub.on_open(conn_id, msg_tx).await?;

    // Read task (WebSocket -> hub). Returns the transport error, if any.
    let hub_read = hub.clone();
    let mut read_task = tokio::spawn(async move {
        while let Some(msg_result) = ws_receiver.next().await {
            let frame = match msg_result {
                Ok(Message::Text(text)) => InboundFrame::Text(text.to_string()),
                Ok(Message::Binary(data)) => InboundFrame::Binary(data.to_vec()),
                Ok(Message::Close(_)) => {
                    debug!("Connection {} sent close frame", conn_id);
                    return None;
                }
                Ok(_) => {
                    // Ping/Pong are answered by tungstenite
                    continue;
                }
                Err(e) => {
                    error!("WebSocket error for {}: {}", conn_id, e);
                    return Some(e.to_string());
                }
            };
            if hub_read.on_message(conn_id, frame).await.is_err() {
                debug!("Hub closed, ending read task for {}", conn_id);
                return None;
            }
        }
        None
    });

    // Write task (outbound queue -> WebSocket). Returns the send error, if any.
    let mut write_task = tokio::spawn(async move {
        let mut failure = None;
        while let Some(msg) = msg_rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if let Err(e) = ws_sender.send(Message::Text(json.into())).await {
                        debug!("WebSocket send failed for {}: {}", conn_id, e);
                        failure = Some(e.to_string());
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to serialize message: {}", e);
                }
            }
        }
        debug!("Write task ended for {}", conn_id);

        // Send close frame when done
        let _ = ws_sender.close().await;
        failure
    });

    // Whichever side finishes first ends the connection
    let failure = tokio::select! {
        res = &mut read_task => res.unwrap_or_else(|e| Some(e.to_string())),
        res = &mut write_task => res.unwrap_or_else(|e| Some(e.to_string())),
    };

    // Forced leave; the hub then drops its sender, which lets the writer finish
    let _ = match failure {
        Some(e) => hub.on_error(conn_id, e).await,
        None => hub.on_close(conn_id).await,
    };
    read_task.abort();

    info!("Connection {} disconnected", conn_id);

    Ok(())
}
