use std::sync::Arc;
use tracing::{debug, error};
use chrono::Utc;

use crate::models::{PongMessage, SendMessage};
use crate::ws::ConnCtx;

/// Handle ping - reply with a pong to this connection only
pub fn handle_ping_message(conn: &Arc<ConnCtx>) {
    debug!("Ping received from {}", conn.id);
    let pong = SendMessage::Pong(PongMessage { date: Utc::now().to_rfc3339() });
    if !conn.send(&pong) {
        error!("Failed to send Pong message to {}", conn.id);
    }
}
