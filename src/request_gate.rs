//! RequestGate - sequence and session bookkeeping for overlapping requests
//!
//! Every outbound request takes a ticket carrying a monotonically increasing
//! sequence number and the session token current at issue time. A result may
//! be committed only if its session is still the current running session and
//! its sequence is higher than anything committed before. `close()` bumps the
//! session, so once it returns no ticket issued earlier can commit.
//!
//! The check and the caller's commit closure run under one lock, which is
//! what serializes all writes coming back from concurrent requests.

use crate::error::{Error, Result};
use std::sync::{Mutex, MutexGuard};

/// Ticket handed out when a request is issued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    pub session: u64,
    pub sequence: u64,
}

#[derive(Debug, Default)]
struct GateState {
    session: u64,
    running: bool,
    last_issued: u64,
    last_committed: u64,
}

/// Highest-sequence-wins gate with a session token
pub struct RequestGate {
    name: &'static str,
    state: Mutex<GateState>,
}

impl RequestGate {
    /// Create a closed gate
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Mutex::new(GateState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        // A panicking observer must not wedge the gate for good
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start a new session. Returns false if one was already running.
    pub fn open(&self) -> bool {
        let mut state = self.lock();
        if state.running {
            return false;
        }
        state.session += 1;
        state.running = true;
        tracing::debug!(gate = self.name, session = state.session, "Gate opened");
        true
    }

    /// End the current session. Idempotent.
    pub fn close(&self) {
        let mut state = self.lock();
        if state.running {
            state.session += 1;
            state.running = false;
            tracing::debug!(gate = self.name, session = state.session, "Gate closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.lock().running
    }

    /// Issue a ticket for the running session; None when closed
    pub fn issue(&self) -> Option<RequestTicket> {
        let mut state = self.lock();
        if !state.running {
            return None;
        }
        Some(Self::next_ticket(&mut state))
    }

    /// Issue a ticket whether or not a session is running. Used for one-off
    /// requests (e.g. a manual health probe); it still loses to any newer
    /// ticket and is discarded by a later `close()`.
    pub fn issue_detached(&self) -> RequestTicket {
        let mut state = self.lock();
        Self::next_ticket(&mut state)
    }

    fn next_ticket(state: &mut GateState) -> RequestTicket {
        state.last_issued += 1;
        RequestTicket {
            session: state.session,
            sequence: state.last_issued,
        }
    }

    /// Run `apply` if the ticket is still current and newer than every
    /// committed ticket; otherwise return `Error::StaleResponse`.
    pub fn commit<T>(&self, ticket: RequestTicket, apply: impl FnOnce() -> T) -> Result<T> {
        let mut state = self.lock();
        let stale = ticket.session != state.session || ticket.sequence <= state.last_committed;
        if stale {
            tracing::trace!(
                gate = self.name,
                sequence = ticket.sequence,
                ticket_session = ticket.session,
                session = state.session,
                last_committed = state.last_committed,
                "Discarding stale response"
            );
            return Err(Error::StaleResponse {
                sequence: ticket.sequence,
            });
        }

        state.last_committed = ticket.sequence;
        Ok(apply())
    }

    /// Highest sequence committed so far
    pub fn last_committed(&self) -> u64 {
        self.lock().last_committed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_gate_issues_nothing() {
        let gate = RequestGate::new("test");
        assert!(gate.issue().is_none());
        assert!(gate.open());
        assert!(!gate.open());
        assert!(gate.issue().is_some());
    }

    #[test]
    fn test_sequences_increase() {
        let gate = RequestGate::new("test");
        gate.open();
        let a = gate.issue().unwrap();
        let b = gate.issue().unwrap();
        assert!(b.sequence > a.sequence);
        assert_eq!(a.session, b.session);
    }

    #[test]
    fn test_older_ticket_loses_after_newer_commit() {
        let gate = RequestGate::new("test");
        gate.open();
        let older = gate.issue().unwrap();
        let newer = gate.issue().unwrap();

        assert_eq!(gate.commit(newer, || "newer").unwrap(), "newer");
        let err = gate.commit(older, || "older").unwrap_err();
        assert!(matches!(err, Error::StaleResponse { sequence } if sequence == older.sequence));
        assert_eq!(gate.last_committed(), newer.sequence);
    }

    #[test]
    fn test_in_order_commits_apply() {
        let gate = RequestGate::new("test");
        gate.open();
        let a = gate.issue().unwrap();
        let b = gate.issue().unwrap();
        assert!(gate.commit(a, || ()).is_ok());
        assert!(gate.commit(b, || ()).is_ok());
    }

    #[test]
    fn test_close_discards_in_flight() {
        let gate = RequestGate::new("test");
        gate.open();
        let ticket = gate.issue().unwrap();
        gate.close();
        gate.close();

        let mut applied = false;
        let result = gate.commit(ticket, || applied = true);
        assert!(result.is_err());
        assert!(!applied);
    }

    #[test]
    fn test_reopen_does_not_revive_old_tickets() {
        let gate = RequestGate::new("test");
        gate.open();
        let old = gate.issue().unwrap();
        gate.close();
        gate.open();
        let fresh = gate.issue().unwrap();

        assert!(gate.commit(old, || ()).is_err());
        assert!(gate.commit(fresh, || ()).is_ok());
    }

    #[test]
    fn test_detached_ticket_competes_on_sequence() {
        let gate = RequestGate::new("test");
        let manual = gate.issue_detached();
        assert!(gate.commit(manual, || ()).is_ok());

        let slow = gate.issue_detached();
        let fast = gate.issue_detached();
        assert!(gate.commit(fast, || ()).is_ok());
        assert!(gate.commit(slow, || ()).is_err());
    }
}
