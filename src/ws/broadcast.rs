//! Room-scoped fan-out to subscribed connections.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use crate::models::SendMessage;
use super::connctx::ConnCtx;

/// Outcome of one broadcast.
#[derive(Debug, Default)]
pub struct Delivery {
    /// Connections the frame was queued for.
    pub delivered: usize,
    /// Connections that could not take the frame and were unsubscribed.
    pub evicted: Vec<Arc<ConnCtx>>,
}

/// Subscriber sets keyed by room code.
///
/// Delivery never waits on a peer: frames go into each connection's bounded
/// queue with `try_send`. A peer that cannot take a frame has missed room
/// state, so it is closed and dropped from the room's subscribers.
#[derive(Default)]
pub struct BroadcastRouter {
    rooms: RwLock<HashMap<String, HashMap<String, Arc<ConnCtx>>>>,
    dropped: AtomicU64,
    evicted: AtomicU64,
}

impl BroadcastRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self, room_code: &str, conn: Arc<ConnCtx>) {
        let mut rooms = self.rooms.write().await;
        rooms
            .entry(room_code.to_string())
            .or_default()
            .insert(conn.id.clone(), conn);
    }

    pub async fn unsubscribe(&self, room_code: &str, connection_id: &str) {
        let mut rooms = self.rooms.write().await;
        if let Some(subs) = rooms.get_mut(room_code) {
            subs.remove(connection_id);
            if subs.is_empty() {
                rooms.remove(room_code);
            }
        }
    }

    /// Drop `connection_id` from every room it is still subscribed to.
    pub async fn remove_connection(&self, connection_id: &str) {
        let mut rooms = self.rooms.write().await;
        rooms.retain(|_, subs| {
            subs.remove(connection_id);
            !subs.is_empty()
        });
    }

    pub async fn is_subscribed(&self, room_code: &str, connection_id: &str) -> bool {
        self.rooms
            .read()
            .await
            .get(room_code)
            .is_some_and(|subs| subs.contains_key(connection_id))
    }

    /// Frames that could not be delivered since startup.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Connections closed for missing a frame since startup.
    pub fn evicted_connections(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    pub async fn subscriber_count(&self, room_code: &str) -> usize {
        self.rooms.read().await.get(room_code).map_or(0, HashMap::len)
    }

    /// Deliver `msg` to every subscriber of `room_code` except `exclude`.
    pub async fn broadcast(&self, room_code: &str, msg: &SendMessage, exclude: Option<&str>) -> Delivery {
        let json = match serde_json::to_string(msg) {
            Ok(j) => Arc::new(j),
            Err(e) => {
                error!(room = room_code, event = msg.kind(), "failed to serialize event: {}", e);
                return Delivery::default();
            }
        };

        let mut delivery = Delivery::default();
        {
            let rooms = self.rooms.read().await;
            let Some(subs) = rooms.get(room_code) else {
                debug!(room = room_code, event = msg.kind(), "no subscribers");
                return delivery;
            };

            for (id, conn) in subs {
                if exclude == Some(id.as_str()) {
                    continue;
                }
                if conn.send_raw(json.clone()) {
                    delivery.delivered += 1;
                } else {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    warn!(conn_id = %id, room = room_code, event = msg.kind(), "dropping lagging subscriber");
                    delivery.evicted.push(conn.clone());
                }
            }
            debug!(room = room_code, event = msg.kind(), recipients = delivery.delivered, "broadcast event");
        }

        if !delivery.evicted.is_empty() {
            let mut rooms = self.rooms.write().await;
            if let Some(subs) = rooms.get_mut(room_code) {
                for conn in &delivery.evicted {
                    if subs.remove(&conn.id).is_some() {
                        self.evicted.fetch_add(1, Ordering::Relaxed);
                    }
                }
                if subs.is_empty() {
                    rooms.remove(room_code);
                }
            }
        }
        delivery
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PdfFileMessage, UserLeftMessage};
    use tokio::sync::mpsc;

    fn conn_with_rx(id: &str, capacity: usize) -> (Arc<ConnCtx>, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Arc::new(ConnCtx::new(id.to_string(), tx)), rx)
    }

    fn event() -> SendMessage {
        SendMessage::PdfFileUpdated(PdfFileMessage { filename: "doc.pdf".to_string() })
    }

    #[tokio::test]
    async fn fan_out_reaches_only_the_room() {
        let router = BroadcastRouter::new();
        let (c1, mut rx1) = conn_with_rx("c1", 8);
        let (c2, mut rx2) = conn_with_rx("c2", 8);
        let (c3, mut rx3) = conn_with_rx("c3", 8);
        router.subscribe("AAAAAA", c1).await;
        router.subscribe("AAAAAA", c2).await;
        router.subscribe("BBBBBB", c3).await;

        assert_eq!(router.broadcast("AAAAAA", &event(), None).await.delivered, 2);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
        assert!(rx3.try_recv().is_err());
    }

    #[tokio::test]
    async fn exclude_skips_originator() {
        let router = BroadcastRouter::new();
        let (c1, mut rx1) = conn_with_rx("c1", 8);
        let (c2, mut rx2) = conn_with_rx("c2", 8);
        router.subscribe("AAAAAA", c1).await;
        router.subscribe("AAAAAA", c2).await;

        assert_eq!(router.broadcast("AAAAAA", &event(), Some("c1")).await.delivered, 1);
        assert!(rx1.try_recv().is_err());
        assert!(rx2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn lagging_peers_are_evicted_without_stopping_delivery() {
        let router = BroadcastRouter::new();
        let (gone, gone_rx) = conn_with_rx("gone", 8);
        let (slow, _slow_rx) = conn_with_rx("slow", 1);
        let (alive, mut alive_rx) = conn_with_rx("alive", 8);
        drop(gone_rx);
        router.subscribe("AAAAAA", gone.clone()).await;
        router.subscribe("AAAAAA", slow.clone()).await;
        router.subscribe("AAAAAA", alive).await;

        let first = router.broadcast("AAAAAA", &event(), None).await;
        assert_eq!(first.delivered, 2);
        assert_eq!(first.evicted.len(), 1);
        assert_eq!(first.evicted[0].id, "gone");
        assert!(gone.is_closed());

        let msg = SendMessage::UserLeft(UserLeftMessage { user_id: "x".to_string() });
        let second = router.broadcast("AAAAAA", &msg, None).await;
        assert_eq!(second.delivered, 1);
        assert_eq!(second.evicted.len(), 1);
        assert_eq!(second.evicted[0].id, "slow");
        assert!(slow.is_closed());

        assert!(alive_rx.try_recv().is_ok());
        assert!(alive_rx.try_recv().is_ok());
        assert!(!router.is_subscribed("AAAAAA", "gone").await);
        assert!(!router.is_subscribed("AAAAAA", "slow").await);
        assert_eq!(router.subscriber_count("AAAAAA").await, 1);
        assert_eq!(router.dropped_frames(), 2);
        assert_eq!(router.evicted_connections(), 2);
    }

    #[tokio::test]
    async fn unsubscribe_drops_empty_rooms() {
        let router = BroadcastRouter::new();
        let (c1, _rx1) = conn_with_rx("c1", 8);
        router.subscribe("AAAAAA", c1).await;
        assert!(router.is_subscribed("AAAAAA", "c1").await);

        router.unsubscribe("AAAAAA", "c1").await;
        assert!(!router.is_subscribed("AAAAAA", "c1").await);
        assert_eq!(router.subscriber_count("AAAAAA").await, 0);
        assert_eq!(router.broadcast("AAAAAA", &event(), None).await.delivered, 0);
    }
}
