//! Room operations addressed by room code.
//!
//! Lock order is always room mutex, then router lock. Broadcasts for a room are
//! issued while its mutex is held, so every member sees that room's events in
//! the order they were applied, and a joiner's `room-joined` reply is queued
//! before any event that follows its snapshot.
//!
//! A member whose queue overflows during a broadcast is removed from the room
//! on the spot, before the mutex is released.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, MutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{FileInfo, RoomCreatedMessage, RoomJoinedMessage, RoomSnapshot, SendMessage};
use super::broadcast::BroadcastRouter;
use super::connctx::ConnCtx;
use super::error::RoomError;
use super::room::{Broadcast, Room};
use super::store::{normalize_room_code, SessionStore};

pub struct RoomHub {
    store: SessionStore,
    router: BroadcastRouter,
    connections: AtomicUsize,
}

impl Default for RoomHub {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomHub {
    pub fn new() -> Self {
        Self {
            store: SessionStore::new(),
            router: BroadcastRouter::new(),
            connections: AtomicUsize::new(0),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn router(&self) -> &BroadcastRouter {
        &self.router
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::Relaxed)
    }

    /// Register a new connection with a generated id.
    pub fn connect(&self, tx: mpsc::Sender<Arc<String>>) -> Arc<ConnCtx> {
        let conn = Arc::new(ConnCtx::new(Uuid::new_v4().to_string(), tx));
        self.connections.fetch_add(1, Ordering::Relaxed);
        info!(conn_id = %conn.id, "connection opened");
        conn
    }

    /// Tear down a connection, leaving its room.
    pub async fn disconnect(&self, conn: &Arc<ConnCtx>) {
        conn.close();
        self.leave(conn).await;
        self.router.remove_connection(&conn.id).await;
        self.connections.fetch_sub(1, Ordering::Relaxed);
        info!(conn_id = %conn.id, "connection closed");
    }

    /// Create a room with `conn` as its first member and reply `room-created`.
    pub async fn create_room(&self, conn: &Arc<ConnCtx>) -> String {
        self.leave(conn).await;

        let (code, room) = self.store.create_room(&conn.id).await;
        conn.set_room(code.clone());
        let _room = room.lock().await;
        self.router.subscribe(&code, conn.clone()).await;
        conn.send(&SendMessage::RoomCreated(RoomCreatedMessage {
            room_code: code.clone(),
        }));
        info!(conn_id = %conn.id, room = %code, "created room");
        code
    }

    /// Join `code` and reply `room-joined` with either a snapshot or the failure.
    pub async fn join_room(&self, conn: &Arc<ConnCtx>, code: &str) -> Result<RoomSnapshot, RoomError> {
        let code = normalize_room_code(code);
        let result = self.try_join(conn, &code).await;
        if let Err(e) = &result {
            conn.send(&SendMessage::RoomJoined(RoomJoinedMessage::failed(e.to_string())));
            debug!(conn_id = %conn.id, room = %code, "join failed: {}", e);
        }
        result
    }

    async fn try_join(&self, conn: &Arc<ConnCtx>, code: &str) -> Result<RoomSnapshot, RoomError> {
        if conn.room().as_deref() != Some(code) {
            self.leave(conn).await;
        }

        let room = self.store.get_room(code).await.ok_or(RoomError::RoomNotFound)?;
        let mut room = room.lock().await;
        // Membership and binding change together, with no await in between.
        let snapshot = room.join(&conn.id)?;
        conn.set_room(code.to_string());
        self.router.subscribe(code, conn.clone()).await;
        conn.send(&SendMessage::RoomJoined(RoomJoinedMessage::joined(
            code.to_string(),
            snapshot.clone(),
        )));
        info!(conn_id = %conn.id, room = %code, members = room.member_count(), "joined room");
        Ok(snapshot)
    }

    /// Leave the current room, telling the remaining members and removing the room when it empties.
    pub async fn leave(&self, conn: &Arc<ConnCtx>) {
        let Some(code) = conn.room() else {
            return;
        };
        let Some(room) = self.store.get_room(&code).await else {
            conn.release_room(&code);
            self.router.unsubscribe(&code, &conn.id).await;
            return;
        };

        let mut room = room.lock().await;
        if !conn.release_room(&code) {
            // Already removed while waiting for the lock
            return;
        }
        let outcome = room.leave(&conn.id);
        self.router.unsubscribe(&code, &conn.id).await;
        if let Some(b) = outcome {
            self.deliver(&code, &mut room, &b).await;
        }
        info!(conn_id = %conn.id, room = %code, members = room.member_count(), "left room");
        self.release(&code, room).await;
    }

    pub async fn create_document(&self, conn: &Arc<ConnCtx>, code: &str, name: String, content: String) -> Result<(), RoomError> {
        self.apply_as_member(conn, code, |room| Ok(room.create_document(name, content))).await
    }

    pub async fn update_document(&self, conn: &Arc<ConnCtx>, code: &str, name: String, content: String) -> Result<(), RoomError> {
        let originator = conn.id.clone();
        self.apply_as_member(conn, code, |room| Ok(room.update_document(&originator, name, content))).await
    }

    pub async fn send_chat(&self, conn: &Arc<ConnCtx>, code: &str, text: String) -> Result<(), RoomError> {
        let sender = conn.id.clone();
        self.apply_as_member(conn, code, |room| Ok(room.send_chat(&sender, text))).await
    }

    pub async fn set_pdf_page(&self, conn: &Arc<ConnCtx>, code: &str, filename: String, page: u32) -> Result<(), RoomError> {
        self.apply_as_member(conn, code, |room| room.set_pdf_page(filename, page)).await
    }

    pub async fn set_active_pdf(&self, conn: &Arc<ConnCtx>, code: &str, filename: String) -> Result<(), RoomError> {
        self.apply_as_member(conn, code, |room| room.set_active_pdf(filename)).await
    }

    /// Append an uploaded file to a room. Called by the upload endpoint, not by a member.
    pub async fn register_file(&self, code: &str, file: FileInfo) -> Result<(), RoomError> {
        let code = normalize_room_code(code);
        let room = self.store.get_room(&code).await.ok_or(RoomError::RoomNotFound)?;
        let mut room = room.lock().await;
        if room.is_closed() {
            return Err(RoomError::RoomNotFound);
        }
        let b = room.register_file(file);
        self.deliver(&code, &mut room, &b).await;
        self.release(&code, room).await;
        Ok(())
    }

    pub async fn room_exists(&self, code: &str) -> bool {
        self.store.get_room(&normalize_room_code(code)).await.is_some()
    }

    /// Total members across all rooms.
    pub async fn member_count(&self) -> usize {
        let mut total = 0;
        for room in self.store.rooms().await {
            total += room.lock().await.member_count();
        }
        total
    }

    async fn apply_as_member<F>(&self, conn: &Arc<ConnCtx>, code: &str, op: F) -> Result<(), RoomError>
    where
        F: FnOnce(&mut Room) -> Result<Broadcast, RoomError>,
    {
        let code = normalize_room_code(code);
        if conn.room().as_deref() != Some(code.as_str()) {
            return Err(RoomError::NotAMember {
                connection_id: conn.id.clone(),
                room_code: code,
            });
        }
        let room = self.store.get_room(&code).await.ok_or(RoomError::RoomNotFound)?;
        let mut room = room.lock().await;
        if room.is_closed() {
            return Err(RoomError::RoomNotFound);
        }
        let b = op(&mut *room)?;
        self.deliver(&code, &mut room, &b).await;
        self.release(&code, room).await;
        Ok(())
    }

    /// Broadcast `b`, then remove every member that could not take it.
    ///
    /// Each removal tells the remaining members with `user-left`, which can in
    /// turn overflow another member.
    async fn deliver(&self, code: &str, room: &mut Room, b: &Broadcast) -> usize {
        let delivery = self.router.broadcast(code, &b.event, b.exclude.as_deref()).await;
        let mut lagging = delivery.evicted;
        while let Some(conn) = lagging.pop() {
            conn.release_room(code);
            warn!(conn_id = %conn.id, room = %code, "removed lagging member");
            if let Some(left) = room.leave(&conn.id) {
                let more = self.router.broadcast(code, &left.event, left.exclude.as_deref()).await;
                lagging.extend(more.evicted);
            }
        }
        delivery.delivered
    }

    /// Unlock `room`, dropping it from the store if its last member is gone.
    async fn release(&self, code: &str, room: MutexGuard<'_, Room>) {
        let closed = room.is_closed();
        drop(room);
        if closed {
            self.store.remove_room(code).await;
        }
    }
}
