use thiserror::Error;

/// Failures of room operations. Only `RoomNotFound` is ever reported to a client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoomError {
    #[error("Room not found")]
    RoomNotFound,

    #[error("connection {connection_id} is not a member of room {room_code}")]
    NotAMember {
        connection_id: String,
        room_code: String,
    },

    #[error("invalid page {0}, pages start at 1")]
    InvalidPage(u32),

    #[error("no file named '{0}' is registered in this room")]
    UnknownPdf(String),
}
