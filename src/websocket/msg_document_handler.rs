use std::sync::Arc;
use tracing::debug;

use crate::models::{CreateDocumentMessage, UpdateDocumentMessage};
use crate::ws::{ConnCtx, RoomHub};

/// Handle create-document
pub async fn handle_create_document_message(doc_msg: CreateDocumentMessage, conn: &Arc<ConnCtx>, hub: &RoomHub) {
    debug!("Create document {} in room {} by {}", doc_msg.doc_name, doc_msg.room_code, conn.id);
    if let Err(e) = hub.create_document(conn, &doc_msg.room_code, doc_msg.doc_name, doc_msg.content).await {
        debug!("Ignored create-document from {}: {}", conn.id, e);
    }
}

/// Handle update-document. Last write wins.
pub async fn handle_update_document_message(doc_msg: UpdateDocumentMessage, conn: &Arc<ConnCtx>, hub: &RoomHub) {
    debug!("Update document {} in room {} by {}", doc_msg.doc_name, doc_msg.room_code, conn.id);
    if let Err(e) = hub.update_document(conn, &doc_msg.room_code, doc_msg.doc_name, doc_msg.content).await {
        debug!("Ignored update-document from {}: {}", conn.id, e);
    }
}
