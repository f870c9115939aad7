use serde::{Deserialize, Serialize};
use crate::models::{ChatEntry, FileInfo, RoomSnapshot, ActivePdf};

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomMessage {
    pub room_code: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentMessage {
    pub room_code: String,
    pub doc_name: String,
    pub content: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDocumentMessage {
    pub room_code: String,
    pub doc_name: String,
    pub content: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub room_code: String,
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PdfPageChangeMessage {
    pub room_code: String,
    pub page: u32,
    pub filename: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PdfFileChangeMessage {
    pub room_code: String,
    pub filename: String,
}

/// Events a client may send over the socket
#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum ReceivedMessage {
    #[serde(rename = "create-room")]
    CreateRoom,
    #[serde(rename = "join-room")]
    JoinRoom(JoinRoomMessage),
    #[serde(rename = "leave-room")]
    LeaveRoom,
    #[serde(rename = "create-document")]
    CreateDocument(CreateDocumentMessage),
    #[serde(rename = "update-document")]
    UpdateDocument(UpdateDocumentMessage),
    #[serde(rename = "send-message")]
    Chat(ChatMessage),
    #[serde(rename = "pdf-page-change")]
    PdfPageChange(PdfPageChangeMessage),
    #[serde(rename = "pdf-file-change")]
    PdfFileChange(PdfFileChangeMessage),
    #[serde(rename = "ping")]
    Ping,
}

impl ReceivedMessage {
    /// Wire name of the event, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ReceivedMessage::CreateRoom => "create-room",
            ReceivedMessage::JoinRoom(_) => "join-room",
            ReceivedMessage::LeaveRoom => "leave-room",
            ReceivedMessage::CreateDocument(_) => "create-document",
            ReceivedMessage::UpdateDocument(_) => "update-document",
            ReceivedMessage::Chat(_) => "send-message",
            ReceivedMessage::PdfPageChange(_) => "pdf-page-change",
            ReceivedMessage::PdfFileChange(_) => "pdf-file-change",
            ReceivedMessage::Ping => "ping",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedMessage {
    pub connection_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomCreatedMessage {
    pub room_code: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomJoinedMessage {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<(String, String)>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat: Option<Vec<ChatEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<FileInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_pdf: Option<ActivePdf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RoomJoinedMessage {
    pub fn joined(room_code: String, snapshot: RoomSnapshot) -> Self {
        Self {
            success: true,
            room_code: Some(room_code),
            documents: Some(snapshot.documents),
            chat: Some(snapshot.chat),
            files: Some(snapshot.files),
            active_pdf: Some(snapshot.active_pdf),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            room_code: None,
            documents: None,
            chat: None,
            files: None,
            active_pdf: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMessage {
    pub doc_name: String,
    pub content: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PdfPageMessage {
    pub page: u32,
    pub filename: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PdfFileMessage {
    pub filename: String,
}

/// Carries the file record under its own key, since `FileInfo` has a `type` field of its own
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FileUploadedMessage {
    pub file: FileInfo,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserLeftMessage {
    pub user_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PongMessage {
    pub date: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorMessage {
    pub error: String,
}

/// Events the server sends to clients, either as direct replies or room broadcasts
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum SendMessage {
    #[serde(rename = "connected")]
    Connected(ConnectedMessage),
    #[serde(rename = "room-created")]
    RoomCreated(RoomCreatedMessage),
    #[serde(rename = "room-joined")]
    RoomJoined(RoomJoinedMessage),
    #[serde(rename = "document-created")]
    DocumentCreated(DocumentMessage),
    #[serde(rename = "document-updated")]
    DocumentUpdated(DocumentMessage),
    #[serde(rename = "new-message")]
    NewMessage(ChatEntry),
    #[serde(rename = "pdf-page-updated")]
    PdfPageUpdated(PdfPageMessage),
    #[serde(rename = "pdf-file-updated")]
    PdfFileUpdated(PdfFileMessage),
    #[serde(rename = "file-uploaded")]
    FileUploaded(FileUploadedMessage),
    #[serde(rename = "user-left")]
    UserLeft(UserLeftMessage),
    #[serde(rename = "pong")]
    Pong(PongMessage),
    #[serde(rename = "error")]
    Error(ErrorMessage),
}

impl SendMessage {
    /// Wire name of the event, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            SendMessage::Connected(_) => "connected",
            SendMessage::RoomCreated(_) => "room-created",
            SendMessage::RoomJoined(_) => "room-joined",
            SendMessage::DocumentCreated(_) => "document-created",
            SendMessage::DocumentUpdated(_) => "document-updated",
            SendMessage::NewMessage(_) => "new-message",
            SendMessage::PdfPageUpdated(_) => "pdf-page-updated",
            SendMessage::PdfFileUpdated(_) => "pdf-file-updated",
            SendMessage::FileUploaded(_) => "file-uploaded",
            SendMessage::UserLeft(_) => "user-left",
            SendMessage::Pong(_) => "pong",
            SendMessage::Error(_) => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_create_room() {
        let msg: ReceivedMessage = serde_json::from_str(r#"{"type":"create-room"}"#).unwrap();
        assert!(matches!(msg, ReceivedMessage::CreateRoom));
    }

    #[test]
    fn parses_update_document() {
        let raw = r#"{"type":"update-document","roomCode":"ABC123","docName":"notes.txt","content":"hi"}"#;
        match serde_json::from_str::<ReceivedMessage>(raw).unwrap() {
            ReceivedMessage::UpdateDocument(m) => {
                assert_eq!(m.room_code, "ABC123");
                assert_eq!(m.doc_name, "notes.txt");
                assert_eq!(m.content, "hi");
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn missing_field_is_rejected() {
        let raw = r#"{"type":"send-message","roomCode":"ABC123"}"#;
        assert!(serde_json::from_str::<ReceivedMessage>(raw).is_err());
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(serde_json::from_str::<ReceivedMessage>(r#"{"type":"nope"}"#).is_err());
    }

    #[test]
    fn new_message_wire_shape() {
        let msg = SendMessage::NewMessage(ChatEntry {
            sender_id: "u1".to_string(),
            text: "hello".to_string(),
            timestamp: 42,
        });
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type": "new-message", "userId": "u1", "message": "hello", "timestamp": 42})
        );
    }

    #[test]
    fn failed_join_omits_snapshot() {
        let msg = SendMessage::RoomJoined(RoomJoinedMessage::failed("Room not found"));
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type": "room-joined", "success": false, "error": "Room not found"})
        );
    }

    #[test]
    fn joined_snapshot_wire_shape() {
        let snapshot = RoomSnapshot {
            documents: vec![("a.txt".to_string(), "x".to_string())],
            chat: vec![],
            files: vec![FileInfo {
                stored_name: "1.pdf".to_string(),
                original_name: "doc.pdf".to_string(),
                relative_path: "/uploads/1.pdf".to_string(),
                type_tag: ".pdf".to_string(),
            }],
            active_pdf: ActivePdf::default(),
        };
        let msg = SendMessage::RoomJoined(RoomJoinedMessage::joined("ABC123".to_string(), snapshot));
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "type": "room-joined",
                "success": true,
                "roomCode": "ABC123",
                "documents": [["a.txt", "x"]],
                "chat": [],
                "files": [{"filename": "1.pdf", "originalName": "doc.pdf", "path": "/uploads/1.pdf", "type": ".pdf"}],
                "activePdf": {"filename": null, "page": 1}
            })
        );
    }

    #[test]
    fn file_uploaded_keeps_event_tag() {
        let msg = SendMessage::FileUploaded(FileUploadedMessage {
            file: FileInfo {
                stored_name: "1.txt".to_string(),
                original_name: "notes.txt".to_string(),
                relative_path: "/uploads/1.txt".to_string(),
                type_tag: ".txt".to_string(),
            },
        });
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "file-uploaded");
        assert_eq!(value["file"]["type"], ".txt");
        assert_eq!(value["file"]["originalName"], "notes.txt");
    }
}
