use std::collections::HashSet;
use std::path::Path;

use chrono::Utc;
use indexmap::IndexMap;

use crate::models::{
    ActivePdf, ChatEntry, DocumentMessage, FileInfo, FileUploadedMessage, PdfFileMessage, PdfPageMessage,
    RoomSnapshot, SendMessage, UserLeftMessage,
};
use super::error::RoomError;

/// An event a room mutation produced, and who must not receive it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Broadcast {
    pub event: SendMessage,
    pub exclude: Option<String>,
}

impl Broadcast {
    pub fn to_all(event: SendMessage) -> Self {
        Self { event, exclude: None }
    }

    pub fn to_others(event: SendMessage, originator: &str) -> Self {
        Self {
            event,
            exclude: Some(originator.to_string()),
        }
    }
}

/// State of one collaborative room.
///
/// All mutation goes through the methods below; the caller holds the room's
/// lock for the duration of a call and delivers the returned [`Broadcast`].
#[derive(Debug)]
pub struct Room {
    code: String,
    members: HashSet<String>,
    documents: IndexMap<String, String>,
    chat: Vec<ChatEntry>,
    files: Vec<FileInfo>,
    active_pdf: ActivePdf,
    closed: bool,
}

impl Room {
    pub fn new(code: String) -> Self {
        Self {
            code,
            members: HashSet::new(),
            documents: IndexMap::new(),
            chat: Vec::new(),
            files: Vec::new(),
            active_pdf: ActivePdf::default(),
            closed: false,
        }
    }

    /// A fresh room whose first member is its creator.
    pub fn with_creator(code: String, creator_id: &str) -> Self {
        let mut room = Self::new(code);
        room.members.insert(creator_id.to_string());
        room
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn is_member(&self, connection_id: &str) -> bool {
        self.members.contains(connection_id)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Set once the last member has left. A closed room accepts no further operations.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn document(&self, name: &str) -> Option<&str> {
        self.documents.get(name).map(String::as_str)
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn chat(&self) -> &[ChatEntry] {
        &self.chat
    }

    pub fn files(&self) -> &[FileInfo] {
        &self.files
    }

    pub fn active_pdf(&self) -> &ActivePdf {
        &self.active_pdf
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            documents: self
                .documents
                .iter()
                .map(|(name, content)| (name.clone(), content.clone()))
                .collect(),
            chat: self.chat.clone(),
            files: self.files.clone(),
            active_pdf: self.active_pdf.clone(),
        }
    }

    /// Add a member and return the state it needs for its first render.
    pub fn join(&mut self, connection_id: &str) -> Result<RoomSnapshot, RoomError> {
        if self.closed {
            return Err(RoomError::RoomNotFound);
        }
        self.members.insert(connection_id.to_string());
        Ok(self.snapshot())
    }

    /// Remove a member. Closes the room when it was the last one.
    ///
    /// Returns the `user-left` broadcast for the remaining members, if any remain.
    pub fn leave(&mut self, connection_id: &str) -> Option<Broadcast> {
        if !self.members.remove(connection_id) {
            return None;
        }
        if self.members.is_empty() {
            self.closed = true;
            return None;
        }
        Some(Broadcast::to_all(SendMessage::UserLeft(UserLeftMessage {
            user_id: connection_id.to_string(),
        })))
    }

    /// Insert a new document, renaming it when the name is already taken.
    pub fn create_document(&mut self, name: String, content: String) -> Broadcast {
        let name = if self.documents.contains_key(&name) {
            let mut stamp = Utc::now().timestamp_millis();
            let mut candidate = renamed_document_name(&name, stamp);
            while self.documents.contains_key(&candidate) {
                stamp += 1;
                candidate = renamed_document_name(&name, stamp);
            }
            candidate
        } else {
            name
        };
        self.documents.insert(name.clone(), content.clone());
        Broadcast::to_all(SendMessage::DocumentCreated(DocumentMessage {
            doc_name: name,
            content,
        }))
    }

    /// Replace a document's content. Last write wins; unknown names are created.
    pub fn update_document(&mut self, originator: &str, name: String, content: String) -> Broadcast {
        self.documents.insert(name.clone(), content.clone());
        Broadcast::to_others(
            SendMessage::DocumentUpdated(DocumentMessage {
                doc_name: name,
                content,
            }),
            originator,
        )
    }

    pub fn register_file(&mut self, file: FileInfo) -> Broadcast {
        self.files.push(file.clone());
        Broadcast::to_all(SendMessage::FileUploaded(FileUploadedMessage { file }))
    }

    /// Move the shared cursor to `page` of `filename`.
    pub fn set_pdf_page(&mut self, filename: String, page: u32) -> Result<Broadcast, RoomError> {
        if page < 1 {
            return Err(RoomError::InvalidPage(page));
        }
        self.ensure_registered(&filename)?;
        self.active_pdf = ActivePdf {
            filename: Some(filename.clone()),
            page,
        };
        Ok(Broadcast::to_all(SendMessage::PdfPageUpdated(PdfPageMessage {
            page,
            filename,
        })))
    }

    /// Open `filename` for everyone, resetting the cursor to page 1.
    pub fn set_active_pdf(&mut self, filename: String) -> Result<Broadcast, RoomError> {
        self.ensure_registered(&filename)?;
        self.active_pdf = ActivePdf {
            filename: Some(filename.clone()),
            page: 1,
        };
        Ok(Broadcast::to_all(SendMessage::PdfFileUpdated(PdfFileMessage {
            filename,
        })))
    }

    pub fn send_chat(&mut self, sender_id: &str, text: String) -> Broadcast {
        let entry = ChatEntry {
            sender_id: sender_id.to_string(),
            text,
            timestamp: Utc::now().timestamp_millis(),
        };
        self.chat.push(entry.clone());
        Broadcast::to_all(SendMessage::NewMessage(entry))
    }

    fn ensure_registered(&self, filename: &str) -> Result<(), RoomError> {
        if self.files.iter().any(|f| f.matches(filename)) {
            Ok(())
        } else {
            Err(RoomError::UnknownPdf(filename.to_string()))
        }
    }
}

/// `notes.txt` at `stamp` becomes `notes_{stamp}.txt`. Any directory part is dropped.
pub fn renamed_document_name(name: &str, stamp: i64) -> String {
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, stamp, ext.to_string_lossy()),
        None => format!("{}_{}", stem, stamp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf(name: &str) -> FileInfo {
        FileInfo {
            stored_name: format!("1700000000000_{}", name),
            original_name: name.to_string(),
            relative_path: format!("/uploads/1700000000000_{}", name),
            type_tag: ".pdf".to_string(),
        }
    }

    #[test]
    fn new_room_is_empty() {
        let room = Room::new("ABC123".to_string());
        assert_eq!(room.code(), "ABC123");
        assert_eq!(room.member_count(), 0);
        assert_eq!(room.document_count(), 0);
        assert!(room.chat().is_empty());
        assert!(room.files().is_empty());
        assert_eq!(room.active_pdf(), &ActivePdf { filename: None, page: 1 });
        assert!(!room.is_closed());
    }

    #[test]
    fn creator_is_first_member() {
        let mut room = Room::with_creator("ABC123".to_string(), "c1");
        assert!(room.is_member("c1"));
        assert_eq!(room.member_count(), 1);
        assert!(room.leave("c1").is_none());
        assert!(room.is_closed());
    }

    #[test]
    fn rename_keeps_extension() {
        assert_eq!(renamed_document_name("a.txt", 123), "a_123.txt");
        assert_eq!(renamed_document_name("archive.tar.gz", 5), "archive.tar_5.gz");
        assert_eq!(renamed_document_name("README", 7), "README_7");
        assert_eq!(renamed_document_name(".env", 9), ".env_9");
    }

    #[test]
    fn duplicate_document_is_renamed_not_overwritten() {
        let mut room = Room::new("ABC123".to_string());
        room.create_document("a.txt".to_string(), "x".to_string());
        let second = room.create_document("a.txt".to_string(), "y".to_string());

        assert_eq!(room.document_count(), 2);
        assert_eq!(room.document("a.txt"), Some("x"));
        let renamed = match second.event {
            SendMessage::DocumentCreated(m) => m.doc_name,
            other => panic!("unexpected event {other:?}"),
        };
        assert_ne!(renamed, "a.txt");
        assert!(renamed.starts_with("a_") && renamed.ends_with(".txt"));
        assert_eq!(room.document(&renamed), Some("y"));
        assert!(second.exclude.is_none());
    }

    #[test]
    fn snapshot_keeps_creation_order() {
        let mut room = Room::new("ABC123".to_string());
        for name in ["c", "a", "b"] {
            room.create_document(name.to_string(), String::new());
        }
        room.update_document("u1", "a".to_string(), "changed".to_string());
        let names: Vec<_> = room.snapshot().documents.into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn update_replaces_content_and_excludes_originator() {
        let mut room = Room::new("ABC123".to_string());
        room.create_document("a.txt".to_string(), "x".to_string());
        let b = room.update_document("u1", "a.txt".to_string(), "new".to_string());
        assert_eq!(room.document("a.txt"), Some("new"));
        assert_eq!(b.exclude.as_deref(), Some("u1"));
    }

    #[test]
    fn update_of_unknown_document_creates_it() {
        let mut room = Room::new("ABC123".to_string());
        room.update_document("u1", "ghost.txt".to_string(), "boo".to_string());
        assert_eq!(room.document("ghost.txt"), Some("boo"));
    }

    #[test]
    fn chat_appends_with_timestamp() {
        let mut room = Room::new("ABC123".to_string());
        let before = Utc::now().timestamp_millis();
        let b = room.send_chat("u1", "hello".to_string());
        assert_eq!(room.chat().len(), 1);
        let entry = &room.chat()[0];
        assert_eq!(entry.sender_id, "u1");
        assert_eq!(entry.text, "hello");
        assert!(entry.timestamp >= before);
        assert!(b.exclude.is_none());
    }

    #[test]
    fn opening_pdf_resets_page() {
        let mut room = Room::new("ABC123".to_string());
        room.register_file(pdf("doc.pdf"));
        room.set_active_pdf("doc.pdf".to_string()).unwrap();
        room.set_pdf_page("doc.pdf".to_string(), 3).unwrap();
        assert_eq!(room.active_pdf(), &ActivePdf { filename: Some("doc.pdf".to_string()), page: 3 });

        room.set_active_pdf("doc.pdf".to_string()).unwrap();
        assert_eq!(room.active_pdf().page, 1);
    }

    #[test]
    fn pdf_events_for_unregistered_files_are_rejected() {
        let mut room = Room::new("ABC123".to_string());
        assert_eq!(
            room.set_active_pdf("missing.pdf".to_string()),
            Err(RoomError::UnknownPdf("missing.pdf".to_string()))
        );
        assert_eq!(room.active_pdf(), &ActivePdf::default());
    }

    #[test]
    fn page_zero_is_rejected() {
        let mut room = Room::new("ABC123".to_string());
        room.register_file(pdf("doc.pdf"));
        assert_eq!(
            room.set_pdf_page("doc.pdf".to_string(), 0),
            Err(RoomError::InvalidPage(0))
        );
    }

    #[test]
    fn last_leave_closes_room() {
        let mut room = Room::new("ABC123".to_string());
        room.join("u1").unwrap();
        room.join("u2").unwrap();

        let b = room.leave("u1").expect("remaining member should be told");
        assert_eq!(
            b.event,
            SendMessage::UserLeft(UserLeftMessage { user_id: "u1".to_string() })
        );
        assert!(!room.is_closed());

        assert!(room.leave("u2").is_none());
        assert!(room.is_closed());
        assert_eq!(room.join("u3"), Err(RoomError::RoomNotFound));
    }

    #[test]
    fn leave_of_non_member_is_a_no_op() {
        let mut room = Room::new("ABC123".to_string());
        room.join("u1").unwrap();
        assert!(room.leave("stranger").is_none());
        assert!(!room.is_closed());
        assert_eq!(room.member_count(), 1);
    }
}
