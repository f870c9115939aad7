use std::sync::Arc;
use axum::{
    extract::{State, ws::{Message, WebSocket, WebSocketUpgrade}},
    response::Response,
};
use tokio::sync::mpsc;
use tracing::{info, debug, error, warn};
use futures_util::{StreamExt, SinkExt};

use crate::AppState;
use crate::models::{ConnectedMessage, ErrorMessage, ReceivedMessage, SendMessage};
use crate::ws::{ConnCtx, RoomHub};
use crate::websocket::msg_chat_handler::handle_chat_message;
use crate::websocket::msg_document_handler::{handle_create_document_message, handle_update_document_message};
use crate::websocket::msg_pdf_handler::{handle_pdf_file_message, handle_pdf_page_message};
use crate::websocket::msg_ping_handler::handle_ping_message;
use crate::websocket::msg_room_handler::{handle_create_room_message, handle_join_room_message, handle_leave_room_message};

/// WebSocket handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    info!("New WebSocket connection attempt");
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    let hub = app_state.hub.clone();

    // Outbound frames for this client, from direct replies and room broadcasts
    let (tx, mut rx) = mpsc::channel::<Arc<String>>(app_state.config.outbound_buffer);
    let conn = hub.connect(tx);
    conn.send(&SendMessage::Connected(ConnectedMessage { connection_id: conn.id.clone() }));

    let (mut sender, mut receiver) = socket.split();

    // Drain the outbound queue into the socket until the connection is closed
    let writer_conn = conn.clone();
    let mut send_task = tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                _ = writer_conn.closed() => break,
                frame = rx.recv() => frame,
            };
            let Some(frame) = frame else { break };
            let sent = tokio::select! {
                _ = writer_conn.closed() => break,
                sent = sender.send(Message::Text(frame.to_string())) => sent,
            };
            if sent.is_err() {
                debug!(conn_id = %writer_conn.id, "socket write failed");
                break;
            }
        }
    });

    // Read client frames and dispatch them one at a time. Closing stops the
    // reader between frames, never in the middle of a room operation.
    let reader_conn = conn.clone();
    let reader_hub = hub.clone();
    let mut recv_task = tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                _ = reader_conn.closed() => break,
                frame = receiver.next() => frame,
            };
            match frame {
                Some(Ok(Message::Text(text))) => dispatch_message(&text, &reader_conn, &reader_hub).await,
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    debug!(conn_id = %reader_conn.id, "socket read failed: {}", e);
                    break;
                }
            }
        }
    });

    // Whichever side ends first closes the connection, then the other side winds down
    tokio::select! {
        _ = &mut send_task => {
            conn.close();
            let _ = recv_task.await;
        }
        _ = &mut recv_task => {
            conn.close();
            let _ = send_task.await;
        }
    };

    if conn.dropped_frames() > 0 {
        warn!(conn_id = %conn.id, dropped = conn.dropped_frames(), "closed lagging connection");
    }
    hub.disconnect(&conn).await;
    info!(conn_id = %conn.id, "WebSocket connection terminated");
}

/// Parse one text frame and route it. A bad frame only affects itself.
pub async fn dispatch_message(text: &str, conn: &Arc<ConnCtx>, hub: &RoomHub) {
    let msg: ReceivedMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            error!(conn_id = %conn.id, "Failed to parse message: {}", e);
            conn.send(&SendMessage::Error(ErrorMessage {
                error: format!("Malformed event: {}", e),
            }));
            return;
        }
    };
    debug!(conn_id = %conn.id, event = msg.kind(), "received event");

    match msg {
        ReceivedMessage::CreateRoom => handle_create_room_message(conn, hub).await,
        ReceivedMessage::JoinRoom(m) => handle_join_room_message(m, conn, hub).await,
        ReceivedMessage::LeaveRoom => handle_leave_room_message(conn, hub).await,
        ReceivedMessage::CreateDocument(m) => handle_create_document_message(m, conn, hub).await,
        ReceivedMessage::UpdateDocument(m) => handle_update_document_message(m, conn, hub).await,
        ReceivedMessage::Chat(m) => handle_chat_message(m, conn, hub).await,
        ReceivedMessage::PdfPageChange(m) => handle_pdf_page_message(m, conn, hub).await,
        ReceivedMessage::PdfFileChange(m) => handle_pdf_file_message(m, conn, hub).await,
        ReceivedMessage::Ping => handle_ping_message(conn),
    }
}
