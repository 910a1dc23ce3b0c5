//! Per-node ring view: predecessor, finger table, successor list.
//!
//! This is the single authority on a node's picture of the ring. All fields
//! that can change sit behind one mutex; every read-then-write goes through a
//! method here so callers never see a half-updated table. Remote calls are
//! made by the `routing` crate strictly outside the lock.
//!
//! # Invariants
//!
//! - `fingers[0] == successors[0]` after every mutation (`fingers[0]` is the
//!   authoritative successor).
//! - Finger and successor slots are never empty: "no better peer known" is
//!   represented by the node's own address, so interval arithmetic never has
//!   to special-case emptiness.
//! - The predecessor is the only field allowed to be unknown.

use parking_lot::Mutex;
use std::fmt::Write as _;
use tracing::debug;

use crate::addr::NodeAddress;
use crate::id::{RingId, RingSpace};

/// Number of backup successors kept for fault tolerance.
pub const SUCCESSOR_LIST_LEN: usize = 3;

/// Result of handling a notify message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifyOutcome {
    /// The candidate was accepted as the new predecessor.
    pub accepted: bool,
    /// This was the first predecessor this node has ever seen. The caller
    /// must fire the one-time ownership transfer when this is set.
    pub first: bool,
}

struct ViewState {
    predecessor: Option<NodeAddress>,
    /// `fingers[i]` caches the successor of `step_targets[i]`.
    fingers: Vec<NodeAddress>,
    successors: Vec<NodeAddress>,
    next_fix: usize,
    initialized: bool,
}

/// A node's view of the ring. One instance per process, shared by the
/// inbound request handlers and the maintenance tasks.
pub struct RingView {
    self_addr: NodeAddress,
    space: RingSpace,
    step_targets: Vec<RingId>,
    inner: Mutex<ViewState>,
}

impl RingView {
    /// Create the view of a node that currently knows no other peer: all
    /// finger and successor slots point at the node itself.
    pub fn new(self_addr: NodeAddress, space: RingSpace) -> Self {
        let step_targets = space.step_targets(self_addr.id);
        let m = space.bits() as usize;
        let inner = ViewState {
            predecessor: None,
            fingers: vec![self_addr.clone(); m],
            successors: vec![self_addr.clone(); SUCCESSOR_LIST_LEN],
            next_fix: 0,
            initialized: false,
        };
        Self {
            self_addr,
            space,
            step_targets,
            inner: Mutex::new(inner),
        }
    }

    pub fn self_addr(&self) -> &NodeAddress {
        &self.self_addr
    }

    pub fn space(&self) -> RingSpace {
        self.space
    }

    /// The precomputed lookup target for finger slot `i`.
    pub fn step_target(&self, i: usize) -> RingId {
        self.step_targets[i]
    }

    /// The authoritative successor (`fingers[0]`).
    pub fn successor(&self) -> NodeAddress {
        self.inner.lock().fingers[0].clone()
    }

    /// Replace the successor, keeping `fingers[0]` and `successors[0]` in
    /// step.
    pub fn set_successor(&self, addr: NodeAddress) {
        let mut inner = self.inner.lock();
        debug!(node = %self.self_addr, successor = %addr, "successor updated");
        inner.fingers[0] = addr.clone();
        inner.successors[0] = addr;
    }

    pub fn predecessor(&self) -> Option<NodeAddress> {
        self.inner.lock().predecessor.clone()
    }

    /// Forget the predecessor (it failed a liveness probe). A later notify
    /// from any live node will re-seat it.
    pub fn clear_predecessor(&self) {
        let mut inner = self.inner.lock();
        if inner.predecessor.take().is_some() {
            debug!(node = %self.self_addr, "predecessor cleared");
        }
    }

    /// Handle an inbound "I might be your predecessor" message.
    ///
    /// Accepts the candidate iff no predecessor is known, or the candidate
    /// lies strictly between the current predecessor and this node.
    pub fn note_predecessor(&self, candidate: NodeAddress) -> NotifyOutcome {
        let mut inner = self.inner.lock();
        let accept = match &inner.predecessor {
            None => true,
            Some(current) => self.space.between(
                current.id,
                self.self_addr.id,
                candidate.id,
                false,
                false,
            ),
        };
        if !accept {
            return NotifyOutcome {
                accepted: false,
                first: false,
            };
        }
        debug!(node = %self.self_addr, predecessor = %candidate, "predecessor updated");
        inner.predecessor = Some(candidate);
        let first = !inner.initialized;
        inner.initialized = true;
        NotifyOutcome {
            accepted: true,
            first,
        }
    }

    /// The finger-table entry (or successor-list entry) closest to `key`
    /// while still strictly preceding it, or this node's own address when
    /// nothing closer is known.
    ///
    /// Both tables are scanned because the successor list carries fresher
    /// neighbors than a stale finger entry after churn. When both scans find
    /// a candidate, the numerically closer one wins; ties go to the finger
    /// table.
    pub fn closest_preceding_node(&self, key: RingId) -> NodeAddress {
        let inner = self.inner.lock();
        let finger = self.best_match(&inner.fingers, key);
        let backup = self.best_match(&inner.successors, key);
        match (finger, backup) {
            (Some(f), Some(b)) => {
                if f.id.distance(key) <= b.id.distance(key) {
                    f.clone()
                } else {
                    b.clone()
                }
            }
            // A candidate from only one table means the other table holds
            // nothing between self and the key: treated as "no one closer
            // known", so this node acts as the resolver.
            _ => self.self_addr.clone(),
        }
    }

    fn best_match<'a>(&self, table: &'a [NodeAddress], key: RingId) -> Option<&'a NodeAddress> {
        table.iter().rev().find(|entry| {
            self.space
                .between(self.self_addr.id, key, entry.id, false, false)
        })
    }

    /// Remove a failed peer from the finger table, replacing each slot that
    /// held it with this node's own address. Called by the lookup retry
    /// path; guarantees the next iteration picks a different candidate.
    pub fn scrub(&self, failed: &NodeAddress) {
        let mut inner = self.inner.lock();
        let mut hits = 0usize;
        for slot in inner.fingers.iter_mut() {
            if slot == failed {
                *slot = self.self_addr.clone();
                hits += 1;
            }
        }
        if hits > 0 {
            debug!(node = %self.self_addr, peer = %failed, slots = hits, "scrubbed failed peer");
        }
    }

    /// Merge the successor's successor list into the local one: the local
    /// head stays (it is the successor we just talked to) and the remote
    /// entries shift in one position behind it.
    pub fn merge_successors(&self, remote: &[NodeAddress]) {
        let mut inner = self.inner.lock();
        for i in 1..SUCCESSOR_LIST_LEN {
            if let Some(entry) = remote.get(i - 1) {
                inner.successors[i] = entry.clone();
            }
        }
    }

    /// Snapshot of the successor list, head first. Used for stabilization
    /// failover and for answering reconcile requests.
    pub fn successors(&self) -> Vec<NodeAddress> {
        self.inner.lock().successors.clone()
    }

    /// The finger slot the next `fix_fingers` pass should refresh.
    pub fn fix_index(&self) -> usize {
        self.inner.lock().next_fix
    }

    /// Advance the round-robin slot pointer. Called after every fix pass,
    /// whether or not the slot was rewritten.
    pub fn advance_fix_index(&self) {
        let mut inner = self.inner.lock();
        inner.next_fix = (inner.next_fix + 1) % self.step_targets.len();
    }

    /// Write finger slot `i` if the resolved address differs from what is
    /// already there. Returns whether a write happened.
    pub fn maybe_set_finger(&self, i: usize, addr: NodeAddress) -> bool {
        let mut inner = self.inner.lock();
        if inner.fingers[i] == addr {
            return false;
        }
        debug!(node = %self.self_addr, slot = i, finger = %addr, "finger updated");
        inner.fingers[i] = addr.clone();
        if i == 0 {
            inner.successors[0] = addr;
        }
        true
    }

    /// Snapshot of the finger table. Primarily for tests and diagnostics.
    pub fn fingers(&self) -> Vec<NodeAddress> {
        self.inner.lock().fingers.clone()
    }

    /// Human-readable dump of the whole view.
    pub fn state(&self) -> String {
        let inner = self.inner.lock();
        let mut out = String::from("ring view:\n");
        let _ = writeln!(out, "  self        {}", self.self_addr);
        match &inner.predecessor {
            Some(p) => {
                let _ = writeln!(out, "  predecessor {}", p);
            }
            None => {
                let _ = writeln!(out, "  predecessor (none)");
            }
        }
        let _ = writeln!(out, "  successor   {}", inner.fingers[0]);
        for (i, f) in inner.fingers.iter().enumerate() {
            let _ = writeln!(out, "  finger[{}] {}", i, f);
        }
        for (i, s) in inner.successors.iter().enumerate() {
            let _ = writeln!(out, "  succ[{}]   {}", i, s);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(id: u64) -> NodeAddress {
        NodeAddress::with_id("node", 4000 + id as u16, RingId(id))
    }

    fn view(id: u64) -> RingView {
        RingView::new(addr(id), RingSpace::new(8).unwrap())
    }

    #[test]
    fn starts_pointing_at_self() {
        let v = view(10);
        assert_eq!(v.successor(), addr(10));
        assert_eq!(v.predecessor(), None);
        assert!(v.fingers().iter().all(|f| *f == addr(10)));
        assert!(v.successors().iter().all(|s| *s == addr(10)));
    }

    #[test]
    fn set_successor_keeps_tables_in_step() {
        let v = view(10);
        v.set_successor(addr(42));
        assert_eq!(v.successor(), addr(42));
        assert_eq!(v.successors()[0], addr(42));
        assert_eq!(v.fingers()[0], addr(42));
    }

    #[test]
    fn notify_accepts_only_closer_candidates() {
        let v = view(100);
        assert!(v.note_predecessor(addr(50)).accepted);
        // 70 is between 50 and 100: closer predecessor, accepted.
        assert!(v.note_predecessor(addr(70)).accepted);
        // 50 is now behind the predecessor: rejected.
        let out = v.note_predecessor(addr(50));
        assert!(!out.accepted);
        assert_eq!(v.predecessor(), Some(addr(70)));
    }

    #[test]
    fn notify_first_fires_exactly_once() {
        let v = view(100);
        assert!(v.note_predecessor(addr(50)).first);
        assert!(!v.note_predecessor(addr(50)).first);
        assert!(!v.note_predecessor(addr(70)).first);
        v.clear_predecessor();
        // Re-seating after a failure is not a first-time event.
        assert!(!v.note_predecessor(addr(60)).first);
    }

    #[test]
    fn closest_preceding_prefers_nearest_candidate() {
        let v = view(0);
        v.set_successor(addr(100));
        v.maybe_set_finger(5, addr(150));
        // Key 200: both 100 and 150 precede it, 150 is closer.
        assert_eq!(v.closest_preceding_node(RingId(200)), addr(150));
        // Key 120: only 100 precedes it; finger and successor scans agree.
        assert_eq!(v.closest_preceding_node(RingId(120)), addr(100));
    }

    #[test]
    fn closest_preceding_falls_back_to_self() {
        let v = view(0);
        assert_eq!(v.closest_preceding_node(RingId(77)), addr(0));
    }

    #[test]
    fn closest_preceding_consults_successor_list() {
        let v = view(0);
        // Successor list learned a live neighbor the fingers never saw.
        v.set_successor(addr(10));
        v.merge_successors(&[addr(30), addr(60)]);
        assert_eq!(v.closest_preceding_node(RingId(40)), addr(30));
    }

    #[test]
    fn scrub_replaces_every_slot() {
        let v = view(0);
        v.maybe_set_finger(2, addr(99));
        v.maybe_set_finger(6, addr(99));
        v.scrub(&addr(99));
        assert!(v.fingers().iter().all(|f| *f == addr(0)));
    }

    #[test]
    fn merge_shifts_remote_entries_behind_head() {
        let v = view(0);
        v.set_successor(addr(10));
        v.merge_successors(&[addr(20), addr(30), addr(40)]);
        assert_eq!(v.successors(), vec![addr(10), addr(20), addr(30)]);
    }

    #[test]
    fn fix_index_round_robins_over_every_slot() {
        let v = view(0);
        let m = v.space().bits() as usize;
        let mut seen = Vec::new();
        for _ in 0..m {
            seen.push(v.fix_index());
            v.advance_fix_index();
        }
        assert_eq!(seen, (0..m).collect::<Vec<_>>());
        assert_eq!(v.fix_index(), 0);
    }

    #[test]
    fn maybe_set_finger_skips_noop_writes() {
        let v = view(0);
        assert!(v.maybe_set_finger(4, addr(123)));
        assert!(!v.maybe_set_finger(4, addr(123)));
    }
}
