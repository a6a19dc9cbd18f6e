//! Best-effort message channel between contexts.
//!
//! The panel reaches the active tab's overlay runtime directly here, as a
//! latency shortcut; the daemon broadcasts refresh notifications to every
//! registered tab. Delivery is never guaranteed — the store carries the
//! durable truth, and senders tolerate a missing receiving end.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

use crate::error::BusError;
use crate::location::LocationRecord;
use crate::settings::Settings;

/// Identifies one registered page context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TabId(u32);

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Message payloads, mirroring the wire actions.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Full settings object pushed from the panel.
    UpdateSettings(Settings),
    /// The active location changed via a panel search.
    LocationUpdated(LocationRecord),
    /// Cache-warmed weather is ready in the store; re-render.
    RefreshWeather,
}

/// A payload plus an optional ack channel. Point-to-point sends carry an
/// ack (`{success}` on the wire); broadcasts carry none.
#[derive(Debug)]
pub struct Envelope {
    pub payload: Payload,
    pub ack: Option<oneshot::Sender<bool>>,
}

impl Envelope {
    /// Consume the envelope, acknowledging success or failure.
    pub fn ack(self, success: bool) -> Payload {
        if let Some(ack) = self.ack {
            let _ = ack.send(success);
        }
        self.payload
    }
}

/// Pending acknowledgement of a point-to-point send. Dropping it without
/// awaiting is fine — the send stays fire-and-forget.
#[derive(Debug)]
pub struct AckHandle(oneshot::Receiver<bool>);

impl AckHandle {
    /// Wait for the receiver to process the message. A dropped envelope
    /// counts as failure.
    pub async fn wait(self) -> bool {
        self.0.await.unwrap_or(false)
    }
}

/// Registry of per-tab mailboxes.
#[derive(Debug, Default)]
pub struct ContextBus {
    tabs: Mutex<HashMap<TabId, mpsc::UnboundedSender<Envelope>>>,
    next_id: AtomicU32,
}

impl ContextBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tab context; returns its id and mailbox.
    pub fn register(&self) -> (TabId, mpsc::UnboundedReceiver<Envelope>) {
        let id = TabId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        self.tabs.lock().insert(id, tx);
        (id, rx)
    }

    /// Drop a tab's mailbox (page unloaded).
    pub fn unregister(&self, tab: TabId) {
        self.tabs.lock().remove(&tab);
    }

    /// Point-to-point send. Returns an ack handle on delivery; a missing
    /// or closed mailbox is `BusError::NoReceiver`, which callers on the
    /// best-effort paths discard silently.
    pub fn send(&self, tab: TabId, payload: Payload) -> Result<AckHandle, BusError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        let envelope = Envelope {
            payload,
            ack: Some(ack_tx),
        };
        let mut tabs = self.tabs.lock();
        let Some(sender) = tabs.get(&tab) else {
            return Err(BusError::NoReceiver(tab));
        };
        if sender.send(envelope).is_err() {
            tabs.remove(&tab);
            return Err(BusError::NoReceiver(tab));
        }
        Ok(AckHandle(ack_rx))
    }

    /// Fire-and-forget broadcast to every registered tab. Dead mailboxes
    /// are pruned, not reported. Returns the number of tabs reached.
    pub fn broadcast(&self, payload: Payload) -> usize {
        let mut tabs = self.tabs.lock();
        let mut dead = Vec::new();
        let mut delivered = 0;
        for (tab, sender) in tabs.iter() {
            let envelope = Envelope {
                payload: payload.clone(),
                ack: None,
            };
            if sender.send(envelope).is_ok() {
                delivered += 1;
            } else {
                dead.push(*tab);
            }
        }
        for tab in dead {
            tabs.remove(&tab);
        }
        delivered
    }

    /// Tabs currently registered.
    pub fn tab_count(&self) -> usize {
        self.tabs.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_reaches_registered_tab() {
        let bus = ContextBus::new();
        let (tab, mut rx) = bus.register();

        let ack = bus.send(tab, Payload::RefreshWeather).unwrap();
        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.payload, Payload::RefreshWeather);
        envelope.ack(true);
        assert!(ack.wait().await);
    }

    #[tokio::test]
    async fn send_to_unknown_tab_is_no_receiver() {
        let bus = ContextBus::new();
        let (tab, rx) = bus.register();
        drop(rx);
        bus.unregister(tab);

        let err = bus.send(tab, Payload::RefreshWeather).unwrap_err();
        assert!(matches!(err, BusError::NoReceiver(t) if t == tab));
    }

    #[tokio::test]
    async fn send_to_dropped_mailbox_is_no_receiver_and_prunes() {
        let bus = ContextBus::new();
        let (tab, rx) = bus.register();
        drop(rx);

        assert!(bus.send(tab, Payload::RefreshWeather).is_err());
        assert_eq!(bus.tab_count(), 0);
    }

    #[tokio::test]
    async fn dropped_envelope_acks_failure() {
        let bus = ContextBus::new();
        let (tab, mut rx) = bus.register();

        let ack = bus.send(tab, Payload::RefreshWeather).unwrap();
        let envelope = rx.recv().await.unwrap();
        drop(envelope);
        assert!(!ack.wait().await);
    }

    #[tokio::test]
    async fn broadcast_reaches_all_live_tabs() {
        let bus = ContextBus::new();
        let (_tab_a, mut rx_a) = bus.register();
        let (_tab_b, mut rx_b) = bus.register();
        let (_tab_c, rx_c) = bus.register();
        drop(rx_c);

        let delivered = bus.broadcast(Payload::RefreshWeather);
        assert_eq!(delivered, 2);
        assert_eq!(rx_a.recv().await.unwrap().payload, Payload::RefreshWeather);
        assert_eq!(rx_b.recv().await.unwrap().payload, Payload::RefreshWeather);
        assert_eq!(bus.tab_count(), 2);
    }

    #[tokio::test]
    async fn broadcast_envelopes_carry_no_ack() {
        let bus = ContextBus::new();
        let (_tab, mut rx) = bus.register();
        bus.broadcast(Payload::RefreshWeather);
        assert!(rx.recv().await.unwrap().ack.is_none());
    }
}
