//! Per-route live event registry for SSE subscribers
//!
//! Process-local: one broadcast channel per route id, created on first
//! subscribe and garbage-collected when the last subscriber disconnects.
//! Broadcast serializes the payload once and is strictly post-commit: the
//! engine publishes only after the mutation is durable.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use log::{debug, error, info, warn};
use tokio::sync::broadcast;

use crate::domain::events::RouteEvent;

/// Per-route buffer. A subscriber that falls this far behind is lagged out
/// and disconnected rather than allowed to stall other sinks.
const CHANNEL_CAPACITY: usize = 256;

/// One pre-serialized SSE frame.
#[derive(Debug, Clone)]
pub struct SseFrame {
    pub event: &'static str,
    pub data: String,
}

impl SseFrame {
    pub fn from_event(event: &RouteEvent) -> Result<Self, serde_json::Error> {
        Ok(Self {
            event: event.event_type(),
            data: serde_json::to_string(event)?,
        })
    }
}

#[derive(Clone)]
struct RouteChannel {
    sender: broadcast::Sender<SseFrame>,
    subscribers: Arc<AtomicUsize>,
}

/// Registry mapping route id -> live subscribers.
pub struct LiveChannel {
    channels: DashMap<String, RouteChannel>,
}

/// Shared live channel type
pub type SharedLiveChannel = Arc<LiveChannel>;

/// Create a shared live channel registry
pub fn create_live_channel() -> SharedLiveChannel {
    Arc::new(LiveChannel::new())
}

impl LiveChannel {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Register a subscriber for one route. The returned handle receives
    /// every frame broadcast for the route until it is dropped.
    pub fn subscribe(self: &Arc<Self>, route_id: &str) -> RouteSubscription {
        let entry = self
            .channels
            .entry(route_id.to_string())
            .or_insert_with(|| RouteChannel {
                sender: broadcast::channel(CHANNEL_CAPACITY).0,
                subscribers: Arc::new(AtomicUsize::new(0)),
            });

        entry.subscribers.fetch_add(1, Ordering::SeqCst);
        let receiver = entry.sender.subscribe();
        let subscribers = Arc::clone(&entry.subscribers);
        drop(entry);

        info!("New live subscriber for route {}", route_id);

        RouteSubscription {
            route_id: route_id.to_string(),
            receiver,
            subscribers,
            registry: Arc::clone(self),
        }
    }

    /// Broadcast a route event to every subscriber of its route.
    ///
    /// Serializes once; delivery is best-effort and never blocks the caller.
    pub fn broadcast(&self, event: &RouteEvent) {
        let frame = match SseFrame::from_event(event) {
            Ok(frame) => frame,
            Err(err) => {
                error!(
                    "Failed to serialize live event {}: {}",
                    event.event_type(),
                    err
                );
                return;
            }
        };

        match self.channels.get(event.route_id()) {
            Some(channel) => match channel.sender.send(frame) {
                Ok(count) => debug!(
                    "Live event broadcast: route={}, event={}, subscribers={}",
                    event.route_id(),
                    event.event_type(),
                    count
                ),
                Err(_) => debug!(
                    "Live event dropped (no subscribers): route={}, event={}",
                    event.route_id(),
                    event.event_type()
                ),
            },
            None => debug!(
                "No live channel for route {}: event={}",
                event.route_id(),
                event.event_type()
            ),
        }
    }

    pub fn subscriber_count(&self, route_id: &str) -> usize {
        self.channels
            .get(route_id)
            .map(|c| c.subscribers.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    fn release(&self, route_id: &str) {
        self.channels
            .remove_if(route_id, |_, channel| {
                channel.subscribers.load(Ordering::SeqCst) == 0
            });
    }
}

impl Default for LiveChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for one live subscriber; unsubscribes on drop.
pub struct RouteSubscription {
    route_id: String,
    receiver: broadcast::Receiver<SseFrame>,
    subscribers: Arc<AtomicUsize>,
    registry: SharedLiveChannel,
}

impl RouteSubscription {
    /// Receive the next frame, skipping over lag gaps. Returns None once
    /// the channel is gone.
    pub async fn recv(&mut self) -> Option<SseFrame> {
        loop {
            match self.receiver.recv().await {
                Ok(frame) => return Some(frame),
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(
                        "Live subscriber lagged on route {}, {} frames missed",
                        self.route_id, count
                    );
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for RouteSubscription {
    fn drop(&mut self) {
        self.subscribers.fetch_sub(1, Ordering::SeqCst);
        self.registry.release(&self.route_id);
        info!("Live subscriber disconnected from route {}", self.route_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn started(route_id: &str) -> RouteEvent {
        RouteEvent::RouteStarted {
            route_id: route_id.to_string(),
            started_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn broadcast_reaches_all_route_subscribers() {
        let channel = create_live_channel();
        let mut a = channel.subscribe("r1");
        let mut b = channel.subscribe("r1");
        let _other = channel.subscribe("r2");

        channel.broadcast(&started("r1"));

        let frame_a = tokio::time::timeout(std::time::Duration::from_millis(100), a.recv())
            .await
            .expect("timeout")
            .expect("no frame");
        assert_eq!(frame_a.event, "route.started");

        let frame_b = tokio::time::timeout(std::time::Duration::from_millis(100), b.recv())
            .await
            .expect("timeout")
            .expect("no frame");
        assert_eq!(frame_b.data, frame_a.data);
    }

    #[tokio::test]
    async fn broadcast_without_subscribers_is_a_noop() {
        let channel = create_live_channel();
        channel.broadcast(&started("ghost"));
        assert_eq!(channel.subscriber_count("ghost"), 0);
    }

    #[tokio::test]
    async fn registry_entry_is_collected_after_last_unsubscribe() {
        let channel = create_live_channel();
        let a = channel.subscribe("r1");
        let b = channel.subscribe("r1");
        assert_eq!(channel.subscriber_count("r1"), 2);

        drop(a);
        assert_eq!(channel.subscriber_count("r1"), 1);

        drop(b);
        assert_eq!(channel.subscriber_count("r1"), 0);
        assert!(channel.channels.get("r1").is_none());
    }

    #[tokio::test]
    async fn resubscribing_after_collection_works() {
        let channel = create_live_channel();
        drop(channel.subscribe("r1"));
        let mut again = channel.subscribe("r1");
        channel.broadcast(&started("r1"));
        assert!(again.recv().await.is_some());
    }
}
