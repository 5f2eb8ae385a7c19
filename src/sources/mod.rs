//! Fix sources API

use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

use crate::Fix;

/// What a position source delivers
#[derive(Clone, Debug, PartialEq)]
pub enum FixEvent {
    Position(Fix),
    /// Acquisition failure, forwarded verbatim
    Failure(String),
}

/// Sending end handed to a source on subscribe. Clones may be used from
/// other threads; events are still applied one at a time by the consumer.
pub type FixFeed = Sender<FixEvent>;

/// Live registration with a source
pub trait Subscription {
    /// Stop delivering. Calling it again has no effect.
    fn cancel(&mut self);
}

/// Position source
pub trait FixSource {
    /// Start delivering events into `feed`
    fn subscribe(&mut self, feed: FixFeed) -> Result<Box<dyn Subscription>, String>;
}

/// Feed currently registered with a `PushSource`
#[derive(Default)]
struct FeedSlot {
    /// Bumped on every subscribe
    generation: u64,
    feed: Option<FixFeed>,
}

/// Source fed by hand, from a device callback or another thread
#[derive(Clone, Default)]
pub struct PushSource {
    slot: Arc<Mutex<FeedSlot>>,
}

impl PushSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a fix. Returns false when nobody is subscribed.
    pub fn push(&self, fix: Fix) -> bool {
        self.send(FixEvent::Position(fix))
    }

    /// Deliver an acquisition error
    pub fn fail(&self, message: &str) -> bool {
        self.send(FixEvent::Failure(message.to_string()))
    }

    pub fn is_subscribed(&self) -> bool {
        match self.slot.lock() {
            Ok(slot) => slot.feed.is_some(),
            Err(_) => false,
        }
    }

    fn send(&self, event: FixEvent) -> bool {
        let slot = match self.slot.lock() {
            Ok(slot) => slot,
            Err(_) => return false,
        };

        match slot.feed.as_ref() {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }
}

impl FixSource for PushSource {
    /// Replaces any previous feed
    fn subscribe(&mut self, feed: FixFeed) -> Result<Box<dyn Subscription>, String> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|e| format!("Failed on register the feed: {}", e))?;
        slot.generation += 1;
        slot.feed = Some(feed);

        Ok(Box::new(PushSubscription {
            slot: self.slot.clone(),
            generation: slot.generation,
        }))
    }
}

struct PushSubscription {
    slot: Arc<Mutex<FeedSlot>>,
    generation: u64,
}

impl Subscription for PushSubscription {
    fn cancel(&mut self) {
        if let Ok(mut slot) = self.slot.lock() {
            // a newer subscription owns the slot now
            if slot.generation == self.generation {
                slot.feed = None;
            }
        }
    }
}

/// Subscription of a source that has already delivered everything
pub struct Finished;

impl Subscription for Finished {
    fn cancel(&mut self) {}
}

#[cfg(feature = "csv")]
mod csv_file;

#[cfg(feature = "csv")]
pub use csv_file::{CsvFixSource, FixFields};

#[cfg(test)]
mod tests {
    use std::sync::mpsc::channel;

    use time::macros::datetime;

    use super::*;

    #[test]
    fn push_source_delivers_until_cancelled() -> Result<(), String> {
        let mut source = PushSource::new();
        let handle = source.clone();
        let fix = Fix::new(45.0, -63.0, 5.0, datetime!(2024-06-01 12:00 UTC));

        assert!(!handle.push(fix.clone()));

        let (tx, rx) = channel();
        let mut sub = source.subscribe(tx)?;
        assert!(handle.is_subscribed());
        assert!(handle.push(fix.clone()));
        assert!(handle.fail("timeout"));

        sub.cancel();
        sub.cancel();
        assert!(!handle.is_subscribed());
        assert!(!handle.push(fix.clone()));

        let events: Vec<FixEvent> = rx.try_iter().collect();
        assert_eq!(
            vec![
                FixEvent::Position(fix),
                FixEvent::Failure("timeout".to_string())
            ],
            events
        );

        Ok(())
    }

    #[test]
    fn stale_cancel_keeps_newer_feed() -> Result<(), String> {
        let mut source = PushSource::new();
        let fix = Fix::new(45.0, -63.0, 5.0, datetime!(2024-06-01 12:00 UTC));

        let (tx1, rx1) = channel();
        let mut first = source.subscribe(tx1)?;
        let (tx2, rx2) = channel();
        let mut second = source.subscribe(tx2)?;

        first.cancel();
        assert!(source.is_subscribed());
        assert!(source.push(fix.clone()));
        assert_eq!(0, rx1.try_iter().count());
        assert_eq!(vec![FixEvent::Position(fix.clone())], rx2.try_iter().collect::<Vec<_>>());

        second.cancel();
        assert!(!source.is_subscribed());
        assert!(!source.push(fix));

        Ok(())
    }
}
