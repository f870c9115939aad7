use std::sync::Arc;
use tracing::debug;

use crate::models::ChatMessage;
use crate::ws::{ConnCtx, RoomHub};

/// Handle send-message
pub async fn handle_chat_message(chat_msg: ChatMessage, conn: &Arc<ConnCtx>, hub: &RoomHub) {
    if let Err(e) = hub.send_chat(conn, &chat_msg.room_code, chat_msg.message).await {
        debug!("Ignored send-message from {}: {}", conn.id, e);
    }
}
