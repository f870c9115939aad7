use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

use super::room::Room;

pub const ROOM_CODE_LEN: usize = 6;
const ROOM_CODE_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// In-memory registry of live rooms keyed by room code.
#[derive(Default)]
pub struct SessionStore {
    rooms: RwLock<HashMap<String, Arc<Mutex<Room>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a room under a fresh code with `creator_id` as its only member.
    pub async fn create_room(&self, creator_id: &str) -> (String, Arc<Mutex<Room>>) {
        let mut rooms = self.rooms.write().await;
        let code = loop {
            let candidate = generate_room_code();
            if !rooms.contains_key(&candidate) {
                break candidate;
            }
        };
        let room = Arc::new(Mutex::new(Room::with_creator(code.clone(), creator_id)));
        rooms.insert(code.clone(), room.clone());
        info!(room = %code, "room created");
        (code, room)
    }

    pub async fn get_room(&self, code: &str) -> Option<Arc<Mutex<Room>>> {
        self.rooms.read().await.get(code).cloned()
    }

    pub async fn remove_room(&self, code: &str) -> bool {
        let removed = self.rooms.write().await.remove(code).is_some();
        if removed {
            info!(room = %code, "room removed");
        }
        removed
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn rooms(&self) -> Vec<Arc<Mutex<Room>>> {
        self.rooms.read().await.values().cloned().collect()
    }
}

/// Six random characters from `0-9A-Z`.
pub fn generate_room_code() -> String {
    let mut rng = rand::thread_rng();
    (0..ROOM_CODE_LEN)
        .map(|_| ROOM_CODE_ALPHABET[rng.gen_range(0..ROOM_CODE_ALPHABET.len())] as char)
        .collect()
}

/// Trim and upper-case a client-supplied code.
pub fn normalize_room_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}
