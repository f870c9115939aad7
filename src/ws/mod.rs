pub mod broadcast;
pub mod connctx;
pub mod error;
pub mod hub;
pub mod room;
pub mod store;

pub use broadcast::{BroadcastRouter, Delivery};
pub use connctx::ConnCtx;
pub use error::RoomError;
pub use hub::RoomHub;
pub use room::{Broadcast, Room};
pub use store::SessionStore;
