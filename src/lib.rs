//! Real-time collaborative rooms: shared documents, chat, uploaded files and a
//! cooperatively navigated PDF viewer, synchronized over WebSockets.

pub mod config;
pub mod docs;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod websocket;
pub mod ws;

use std::sync::Arc;

use config::Config;
use ws::RoomHub;

pub use routes::create_app;

/// Shared state handed to every handler
pub struct AppState {
    pub config: Config,
    pub hub: Arc<RoomHub>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            hub: Arc::new(RoomHub::new()),
        }
    }
}
