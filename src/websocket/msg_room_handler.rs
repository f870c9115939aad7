use std::sync::Arc;
use tracing::info;

use crate::models::JoinRoomMessage;
use crate::ws::{ConnCtx, RoomHub};

/// Handle create-room
pub async fn handle_create_room_message(conn: &Arc<ConnCtx>, hub: &RoomHub) {
    let code = hub.create_room(conn).await;
    info!("Room {} created by {}", code, conn.id);
}

/// Handle join-room. The hub replies with room-joined either way.
pub async fn handle_join_room_message(join_msg: JoinRoomMessage, conn: &Arc<ConnCtx>, hub: &RoomHub) {
    if let Err(e) = hub.join_room(conn, &join_msg.room_code).await {
        info!("Connection {} could not join {}: {}", conn.id, join_msg.room_code, e);
    }
}

/// Handle leave-room
pub async fn handle_leave_room_message(conn: &Arc<ConnCtx>, hub: &RoomHub) {
    hub.leave(conn).await;
}
