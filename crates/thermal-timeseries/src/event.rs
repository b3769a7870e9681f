//! Thermal Time Series Events
//!
//! Change notifications published by attributes. Derived views such as the
//! DOI cache subscribe once and drain pending events before each read.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use serde::{Deserialize, Serialize};
use thermal_common::config::EventConfig;
use thermal_common::Timestamp;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

// =============================================================================
// Attribute Event
// =============================================================================

/// A change to an attribute's samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttributeEvent {
    /// A sample was inserted or replaced at `ts`.
    Added { ts: Timestamp },
    /// Samples in `[from, to]` were cleared or the value changed wholesale.
    Reset { from: Timestamp, to: Timestamp },
}

impl AttributeEvent {
    /// Earliest timestamp whose derived values may be stale.
    pub fn affected_from(&self) -> Timestamp {
        match self {
            Self::Added { ts } => *ts,
            Self::Reset { from, .. } => *from,
        }
    }
}

// =============================================================================
// Event Bus
// =============================================================================

/// Broadcast channel owned by one attribute.
#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<AttributeEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn with_config(config: &EventConfig) -> Self {
        Self::new(config.channel_capacity)
    }

    /// Publish an event. Returns the number of subscribers reached.
    pub fn publish(&self, event: AttributeEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_config(&EventConfig::default())
    }
}

// =============================================================================
// Subscription
// =============================================================================

/// What a subscriber has to invalidate after draining its events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    None,
    /// Everything at or after the timestamp.
    From(Timestamp),
    /// Events were dropped; nothing derived can be trusted.
    All,
}

impl Invalidation {
    /// Combine two invalidations, keeping the wider one.
    pub fn merge(self, other: Invalidation) -> Invalidation {
        match (self, other) {
            (Self::All, _) | (_, Self::All) => Self::All,
            (Self::None, x) | (x, Self::None) => x,
            (Self::From(a), Self::From(b)) => Self::From(a.min(b)),
        }
    }
}

/// Receiving end of an [`EventBus`]. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<AttributeEvent>,
}

impl Subscription {
    /// Consume every pending event without blocking.
    pub fn drain(&mut self) -> Invalidation {
        let mut pending = Invalidation::None;
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    pending = pending.merge(Invalidation::From(event.affected_from()));
                }
                Err(TryRecvError::Lagged(_)) => pending = Invalidation::All,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        pending
    }
}
