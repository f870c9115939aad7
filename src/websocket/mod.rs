pub mod handler;
pub mod msg_room_handler;
pub mod msg_document_handler;
pub mod msg_chat_handler;
pub mod msg_pdf_handler;
pub mod msg_ping_handler;

pub use handler::websocket_handler;
