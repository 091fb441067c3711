//! Per-resource request sequencing.
//!
//! Every fetch takes a [`Ticket`] before it is sent. When the response
//! arrives, [`RequestSequencer::try_apply`] accepts it only if no newer
//! response for the same [`ResourceKey`] has been applied and the ticket
//! has not been invalidated since it was issued. The most recently
//! *issued* request wins, not the most recently *resolved* one.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKey {
    Dashboard,
    Profile,
    WorkSession,
    /// Explicit fetches that show the blocking loader. Only the newest of
    /// them may hide it again.
    Loader,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    key: ResourceKey,
    seq: u64,
}

impl Ticket {
    pub fn key(&self) -> ResourceKey {
        self.key
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

#[derive(Debug, Default)]
struct Slot {
    issued: u64,
    /// Tickets at or below this number are stale.
    floor: u64,
}

#[derive(Debug, Default)]
pub struct RequestSequencer {
    slots: Mutex<HashMap<ResourceKey, Slot>>,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self, key: ResourceKey) -> Ticket {
        self.with_slot(key, |slot| {
            slot.issued += 1;
            Ticket {
                key,
                seq: slot.issued,
            }
        })
    }

    /// Accept the response for `ticket` if it is still the newest one.
    /// Accepting raises the floor so older tickets are rejected afterwards.
    pub fn try_apply(&self, ticket: Ticket) -> bool {
        self.with_slot(ticket.key, |slot| {
            if ticket.seq <= slot.floor {
                return false;
            }
            slot.floor = ticket.seq;
            true
        })
    }

    /// Whether `ticket` is the most recently issued one for its key.
    pub fn is_latest(&self, ticket: Ticket) -> bool {
        self.with_slot(ticket.key, |slot| slot.issued == ticket.seq)
    }

    /// Mark every ticket issued so far for `key` as stale.
    pub fn invalidate(&self, key: ResourceKey) {
        self.with_slot(key, |slot| slot.floor = slot.issued);
    }

    fn with_slot<R>(&self, key: ResourceKey, f: impl FnOnce(&mut Slot) -> R) -> R {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        f(slots.entry(key).or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_response_wins_regardless_of_arrival_order() {
        let seq = RequestSequencer::new();
        let first = seq.issue(ResourceKey::Dashboard);
        let second = seq.issue(ResourceKey::Dashboard);

        assert!(seq.try_apply(second));
        assert!(!seq.try_apply(first));
    }

    #[test]
    fn in_order_responses_both_apply() {
        let seq = RequestSequencer::new();
        let first = seq.issue(ResourceKey::Dashboard);
        let second = seq.issue(ResourceKey::Dashboard);

        assert!(seq.try_apply(first));
        assert!(seq.try_apply(second));
    }

    #[test]
    fn invalidate_rejects_outstanding_tickets() {
        let seq = RequestSequencer::new();
        let in_flight = seq.issue(ResourceKey::Dashboard);
        seq.invalidate(ResourceKey::Dashboard);
        let fresh = seq.issue(ResourceKey::Dashboard);

        assert!(!seq.try_apply(in_flight));
        assert!(seq.try_apply(fresh));
    }

    #[test]
    fn keys_are_independent() {
        let seq = RequestSequencer::new();
        let dashboard = seq.issue(ResourceKey::Dashboard);
        let profile = seq.issue(ResourceKey::Profile);
        seq.invalidate(ResourceKey::Dashboard);

        assert!(!seq.try_apply(dashboard));
        assert!(seq.try_apply(profile));
    }

    #[test]
    fn latest_tracks_issue_order() {
        let seq = RequestSequencer::new();
        let first = seq.issue(ResourceKey::WorkSession);
        assert!(seq.is_latest(first));
        let second = seq.issue(ResourceKey::WorkSession);
        assert!(!seq.is_latest(first));
        assert!(seq.is_latest(second));
        assert_eq!(second.seq(), 2);
        assert_eq!(second.key(), ResourceKey::WorkSession);
    }
}
