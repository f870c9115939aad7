use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A chat line as stored in the room log and sent in `new-message`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    #[serde(rename = "userId")]
    pub sender_id: String,
    #[serde(rename = "message")]
    pub text: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

/// An uploaded file registered with a room
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    /// Name the file was stored under
    #[serde(rename = "filename")]
    pub stored_name: String,
    pub original_name: String,
    /// Path the file is served from, e.g. `/uploads/1700000000000.pdf`
    #[serde(rename = "path")]
    pub relative_path: String,
    /// Lower-cased extension including the dot, e.g. `.pdf`
    #[serde(rename = "type")]
    pub type_tag: String,
}

impl FileInfo {
    /// Whether `name` refers to this file, by stored or original name.
    pub fn matches(&self, name: &str) -> bool {
        self.stored_name == name || self.original_name == name
    }
}

/// The shared PDF cursor of a room
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ActivePdf {
    pub filename: Option<String>,
    pub page: u32,
}

impl Default for ActivePdf {
    fn default() -> Self {
        Self {
            filename: None,
            page: 1,
        }
    }
}

/// Full room state replayed to a joining client
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    /// `[name, content]` pairs in creation order
    pub documents: Vec<(String, String)>,
    pub chat: Vec<ChatEntry>,
    pub files: Vec<FileInfo>,
    pub active_pdf: ActivePdf,
}
