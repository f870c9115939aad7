use std::sync::Arc;
use tracing::debug;

use crate::models::{PdfFileChangeMessage, PdfPageChangeMessage};
use crate::ws::{ConnCtx, RoomHub};

/// Handle pdf-page-change
pub async fn handle_pdf_page_message(page_msg: PdfPageChangeMessage, conn: &Arc<ConnCtx>, hub: &RoomHub) {
    debug!("Page {} of {} in room {} by {}", page_msg.page, page_msg.filename, page_msg.room_code, conn.id);
    if let Err(e) = hub.set_pdf_page(conn, &page_msg.room_code, page_msg.filename, page_msg.page).await {
        debug!("Ignored pdf-page-change from {}: {}", conn.id, e);
    }
}

/// Handle pdf-file-change
pub async fn handle_pdf_file_message(file_msg: PdfFileChangeMessage, conn: &Arc<ConnCtx>, hub: &RoomHub) {
    if let Err(e) = hub.set_active_pdf(conn, &file_msg.room_code, file_msg.filename).await {
        debug!("Ignored pdf-file-change from {}: {}", conn.id, e);
    }
}
