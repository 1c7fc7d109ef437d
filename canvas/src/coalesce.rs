//! Outbound move coalescing.
//!
//! DESIGN
//! ======
//! Dragging produces one `modifyPath`/`modifyShape` per pointer tick plus one
//! `updateArrow` per bound arrow. The coalescer bounds that to at most one
//! message per (event type, target) per interval:
//!
//! - the first move for a target in a quiet period is sent immediately;
//! - later moves inside the interval replace each other, the latest wins;
//! - `tick` releases targets whose interval has elapsed;
//! - any discrete event flushes every pending move first, so a peer never
//!   sees a `clear` or `addArrow` overtake a move that preceded it.
//!
//! A zero interval passes every event straight through.

#[cfg(test)]
#[path = "coalesce_test.rs"]
mod coalesce_test;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use frames::{Event, EventType, ObjectId};

type Key = (EventType, ObjectId);

#[derive(Debug)]
pub struct MoveCoalescer {
    interval: Duration,
    last_sent: HashMap<Key, Instant>,
    /// Held events in first-held order.
    pending: Vec<(Key, Event)>,
}

impl MoveCoalescer {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self { interval, last_sent: HashMap::new(), pending: Vec::new() }
    }

    /// Number of held moves.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Offer an outbound event. Returns what should be sent now, in order.
    pub fn offer(&mut self, event: Event, now: Instant) -> Vec<Event> {
        if self.interval.is_zero() {
            return vec![event];
        }
        let event_type = event.event_type();
        let key = event
            .target_id()
            .filter(|_| event_type.is_continuous())
            .map(|id| (event_type, id.to_owned()));
        let Some(key) = key else {
            let mut out = self.flush(now);
            out.push(event);
            return out;
        };

        if let Some(slot) = self.pending.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = event;
            return Vec::new();
        }
        let quiet = self
            .last_sent
            .get(&key)
            .is_none_or(|sent| now.saturating_duration_since(*sent) >= self.interval);
        if quiet {
            self.last_sent.insert(key, now);
            vec![event]
        } else {
            self.pending.push((key, event));
            Vec::new()
        }
    }

    /// Release held moves whose interval has elapsed.
    pub fn tick(&mut self, now: Instant) -> Vec<Event> {
        let interval = self.interval;
        let last_sent = &self.last_sent;
        let (due, held): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|(key, _)| last_sent.get(key).is_none_or(|sent| now.saturating_duration_since(*sent) >= interval));
        self.pending = held;
        self.release(due, now)
    }

    /// Release every held move regardless of timing.
    pub fn flush(&mut self, now: Instant) -> Vec<Event> {
        let due = std::mem::take(&mut self.pending);
        self.release(due, now)
    }

    /// When the oldest held move becomes due, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending
            .iter()
            .filter_map(|(key, _)| self.last_sent.get(key).map(|sent| *sent + self.interval))
            .min()
    }

    /// Forget timing state, e.g. after the canvas was cleared.
    pub fn reset(&mut self) {
        self.last_sent.clear();
        self.pending.clear();
    }

    fn release(&mut self, due: Vec<(Key, Event)>, now: Instant) -> Vec<Event> {
        due.into_iter()
            .map(|(key, event)| {
                self.last_sent.insert(key, now);
                event
            })
            .collect()
    }
}
