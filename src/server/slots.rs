//! Pairing slots for session admission.
//!
//! The first accepted connection waits in slot one, the second fills slot
//! two and the pair is handed out for a session. While a pair is out, every
//! further connection is rejected. Whether the slots open again once that
//! session ends depends on the [`SlotPolicy`].
//!
//! The slots do not watch their connections. The relay checks a waiting
//! connection before pairing and evicts it with
//! [`PairingSlots::evict_waiting`] if the peer already left, so a dead
//! peer-1 never consumes a session.

/// What happens to the slots once a session finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotPolicy {
    /// Serve exactly one pair for the lifetime of the relay.
    #[default]
    SingleSession,
    /// Release the slots when the session ends and admit a new pair.
    Recycle,
}

/// Outcome of offering a connection to the slots.
#[derive(Debug)]
pub enum Admission<T> {
    /// Took slot one; waiting for an opponent.
    Waiting,
    /// Took slot two; the pair is ready for a session.
    Paired(T, T),
    /// Both slots are taken; the connection is handed back to be closed.
    Rejected(T),
}

/// Two pairing slots with a release policy.
#[derive(Debug)]
pub struct PairingSlots<T> {
    policy: SlotPolicy,
    waiting: Option<T>,
    in_session: bool,
    sessions_started: usize,
}

impl<T> PairingSlots<T> {
    /// Empty slots.
    pub fn new(policy: SlotPolicy) -> Self {
        Self {
            policy,
            waiting: None,
            in_session: false,
            sessions_started: 0,
        }
    }

    /// Offer a freshly accepted connection.
    pub fn admit(&mut self, conn: T) -> Admission<T> {
        if self.in_session {
            return Admission::Rejected(conn);
        }
        match self.waiting.take() {
            None => {
                self.waiting = Some(conn);
                Admission::Waiting
            }
            Some(first) => {
                self.in_session = true;
                self.sessions_started += 1;
                Admission::Paired(first, conn)
            }
        }
    }

    /// The connection waiting in slot one, if any.
    pub fn waiting(&self) -> Option<&T> {
        self.waiting.as_ref()
    }

    /// Empty slot one, handing back whatever waited there.
    pub fn evict_waiting(&mut self) -> Option<T> {
        self.waiting.take()
    }

    /// Report that the running session ended. Returns whether the slots
    /// are open again.
    pub fn release(&mut self) -> bool {
        match self.policy {
            SlotPolicy::Recycle => {
                self.in_session = false;
                true
            }
            SlotPolicy::SingleSession => false,
        }
    }

    /// Check whether both slots are taken.
    pub fn is_full(&self) -> bool {
        self.in_session
    }

    /// Check whether a connection is waiting for an opponent.
    pub fn has_waiting(&self) -> bool {
        self.waiting.is_some()
    }

    /// Number of pairs handed out so far.
    pub fn sessions_started(&self) -> usize {
        self.sessions_started
    }

    /// Release policy.
    pub fn policy(&self) -> SlotPolicy {
        self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairs_first_two_and_rejects_third() {
        let mut slots = PairingSlots::new(SlotPolicy::SingleSession);
        assert!(matches!(slots.admit("a"), Admission::Waiting));
        assert!(slots.has_waiting());

        match slots.admit("b") {
            Admission::Paired(first, second) => assert_eq!((first, second), ("a", "b")),
            other => panic!("expected pair, got {other:?}"),
        }
        assert!(slots.is_full());
        assert!(!slots.has_waiting());
        assert!(matches!(slots.admit("c"), Admission::Rejected("c")));
        assert_eq!(slots.sessions_started(), 1);
    }

    #[test]
    fn test_evicted_waiter_is_not_paired() {
        let mut slots = PairingSlots::new(SlotPolicy::SingleSession);
        slots.admit("gone");
        assert_eq!(slots.waiting(), Some(&"gone"));
        assert_eq!(slots.evict_waiting(), Some("gone"));
        assert!(!slots.has_waiting());

        assert!(matches!(slots.admit("a"), Admission::Waiting));
        match slots.admit("b") {
            Admission::Paired(first, second) => assert_eq!((first, second), ("a", "b")),
            other => panic!("expected pair, got {other:?}"),
        }
        assert_eq!(slots.sessions_started(), 1);
    }

    #[test]
    fn test_single_session_never_reopens() {
        let mut slots = PairingSlots::new(SlotPolicy::default());
        slots.admit(1);
        slots.admit(2);
        assert!(!slots.release());
        assert!(slots.is_full());
        assert!(matches!(slots.admit(3), Admission::Rejected(3)));
    }

    #[test]
    fn test_recycle_admits_new_pair() {
        let mut slots = PairingSlots::new(SlotPolicy::Recycle);
        slots.admit(1);
        slots.admit(2);
        assert!(matches!(slots.admit(3), Admission::Rejected(3)));

        assert!(slots.release());
        assert!(!slots.is_full());
        assert!(matches!(slots.admit(4), Admission::Waiting));
        assert!(matches!(slots.admit(5), Admission::Paired(4, 5)));
        assert_eq!(slots.sessions_started(), 2);
        assert_eq!(slots.policy(), SlotPolicy::Recycle);
    }
}
