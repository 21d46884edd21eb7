//! The coordinator: creates local operations, integrates remote
//! operations via OT, and notifies observers of the results.

use std::collections::HashSet;

use parking_lot::RwLock;

use crate::buffer::{AcknowledgmentSet, BoundedHistory, OperationQueue};
use crate::clock::VectorClock;
use crate::document::DocumentState;
use crate::error::OtError;
use crate::operation::Operation;
use crate::priority::a_wins;
use crate::transform::transform;

pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Outcome of [`SyncManager::apply_remote`]. A duplicate delivery is a
/// soft, non-error outcome — the engine is idempotent by design.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteApplyOutcome {
    Applied,
    Duplicate,
}

/// A value snapshot of the document: content, version, and causal view.
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    pub content: String,
    pub version: u64,
    pub clock: VectorClock,
}

struct State {
    participant_id: String,
    document: DocumentState,
    pending: OperationQueue,
    remote_staging: OperationQueue,
    acks: AcknowledgmentSet,
    history: BoundedHistory,
    applied_ids: HashSet<String>,
}

impl State {
    fn new(history_capacity: usize) -> Self {
        Self {
            participant_id: String::new(),
            document: DocumentState::new(String::new()),
            pending: OperationQueue::new(),
            remote_staging: OperationQueue::new(),
            acks: AcknowledgmentSet::new(),
            history: BoundedHistory::new(history_capacity),
            applied_ids: HashSet::new(),
        }
    }
}

/// Fired after any successful apply (local or remote) with the
/// resulting content and version.
pub type DocumentChangedCallback = Box<dyn Fn(&str, u64) + Send + Sync>;
/// Fired once per operation that lands in the applied log, in its
/// final (transformed, for remote ops) form.
pub type OpAppliedCallback = Box<dyn Fn(&Operation) + Send + Sync>;
/// Fired once per pending operation that a remote delivery had to be
/// reconciled against.
pub type ConflictResolvedCallback = Box<dyn Fn(&Operation, &Operation, &Operation) + Send + Sync>;

#[derive(Default)]
struct Observers {
    document_changed: Vec<DocumentChangedCallback>,
    op_applied: Vec<OpAppliedCallback>,
    conflict_resolved: Vec<ConflictResolvedCallback>,
}

/// The single-document OT engine. Owns the document, all buffers, and
/// the vector clock; nothing escapes by reference.
pub struct SyncManager {
    state: RwLock<State>,
    observers: RwLock<Observers>,
}

impl SyncManager {
    pub fn new() -> Self {
        Self::with_history_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_history_capacity(history_capacity: usize) -> Self {
        Self {
            state: RwLock::new(State::new(history_capacity)),
            observers: RwLock::new(Observers::default()),
        }
    }

    pub fn on_document_changed<F>(&self, callback: F)
    where
        F: Fn(&str, u64) + Send + Sync + 'static,
    {
        self.observers.write().document_changed.push(Box::new(callback));
    }

    pub fn on_op_applied<F>(&self, callback: F)
    where
        F: Fn(&Operation) + Send + Sync + 'static,
    {
        self.observers.write().op_applied.push(Box::new(callback));
    }

    pub fn on_conflict_resolved<F>(&self, callback: F)
    where
        F: Fn(&Operation, &Operation, &Operation) + Send + Sync + 'static,
    {
        self.observers.write().conflict_resolved.push(Box::new(callback));
    }

    /// Sets the local participant and seeds its clock entry to zero.
    pub fn init(&self, participant_id: impl Into<String>) {
        let mut state = self.state.write();
        state.participant_id = participant_id.into();
        state.document.clock.ensure_participant(&state.participant_id);
    }

    /// Replaces the document, resetting version, clock, buffers, and
    /// history.
    pub fn set_document(&self, initial_content: impl Into<String>) {
        let mut state = self.state.write();
        let participant_id = state.participant_id.clone();
        let history_capacity = state.history.capacity();
        *state = State::new(history_capacity);
        state.participant_id = participant_id;
        state.document = DocumentState::new(initial_content);
        state.document.clock.ensure_participant(&state.participant_id);
    }

    /// Builds (but does not apply) an Insert stamped with an
    /// incremented local clock.
    pub fn make_insert(&self, position: usize, content: String) -> Operation {
        let mut state = self.state.write();
        let wall_time = now_nanos();
        let participant_id = state.participant_id.clone();
        state.document.clock.increment(&participant_id);
        let clock_snapshot = state.document.clock.clone();
        Operation::new_insert(&participant_id, position, content, wall_time, clock_snapshot)
    }

    /// Builds (but does not apply) a Delete, capturing the text
    /// currently present at `[position, position + length)` for
    /// diagnostics.
    pub fn make_delete(&self, position: usize, length: usize) -> Operation {
        let mut state = self.state.write();
        let wall_time = now_nanos();
        let participant_id = state.participant_id.clone();
        let deleted_content = char_slice(&state.document.content, position, length);
        state.document.clock.increment(&participant_id);
        let clock_snapshot = state.document.clock.clone();
        Operation::new_delete(
            &participant_id,
            position,
            length,
            deleted_content,
            wall_time,
            clock_snapshot,
        )
    }

    /// Applies an operation this participant generated: appends to the
    /// pending buffer, applies to the document, merges its clock, and
    /// records it in history. Fails with `InvalidPosition` if the
    /// operation no longer fits the current document.
    pub fn apply_local(&self, op: Operation) -> Result<(), OtError> {
        op.validate()?;
        let (content, version) = {
            let mut state = self.state.write();
            state.document.apply_checked(&op)?;
            state.pending.push(op.clone());
            state.applied_ids.insert(op.op_id.clone());
            state.history.push(op.clone());
            (state.document.content.clone(), state.document.version)
        };
        self.notify_op_applied(&op);
        self.notify_document_changed(&content, version);
        Ok(())
    }

    /// The central reconciliation algorithm: undoes every still-pending
    /// local operation back to their common ancestor, applies the
    /// remote operation `r` there unchanged, then replays each pending
    /// operation transformed against `r` on top.
    pub fn apply_remote(&self, r: Operation) -> Result<RemoteApplyOutcome, OtError> {
        r.validate()?;
        let mut state = self.state.write();

        if state.applied_ids.contains(&r.op_id) {
            return Ok(RemoteApplyOutcome::Duplicate);
        }

        state.remote_staging.push(r.clone());
        state.document.clock.merge(&r.clock);

        let pending_snapshot = state.pending.snapshot();
        let pending_ids: HashSet<String> =
            pending_snapshot.iter().map(|op| op.op_id.clone()).collect();

        // Undo: rebuild content/log/version from applied_log \ pending.
        let undone_content = state.document.fold_excluding(&pending_ids);
        let kept_log: Vec<Operation> = state
            .document
            .applied_log
            .iter()
            .filter(|op| !pending_ids.contains(&op.op_id))
            .cloned()
            .collect();
        state.document.content = undone_content;
        state.document.version = kept_log.len() as u64;
        state.document.applied_log = kept_log;

        // r applies directly to the common-ancestor document (it was
        // never transformed against any pending op, since none of them
        // have been applied yet in this replay). Each pending op is
        // transformed against r so it still lands correctly once
        // replayed on top of r.
        let r_prime = r.clone();
        let mut new_pending = Vec::with_capacity(pending_snapshot.len());
        let mut conflicting_locals: Vec<Operation> = Vec::new();
        for l_i in &pending_snapshot {
            let r_wins = a_wins(&r, l_i);
            let l_prime = transform(l_i, &r, !r_wins);
            new_pending.push(l_prime);
            if r.clock.concurrent(&l_i.clock) {
                conflicting_locals.push(l_i.clone());
            }
        }

        state.document.apply_clamped(&r_prime);
        state.history.push(r_prime.clone());
        for l_prime in &new_pending {
            state.document.apply_clamped(l_prime);
            state.history.push(l_prime.clone());
        }
        state.pending.replace(new_pending);
        state.applied_ids.insert(r.op_id.clone());

        let content = state.document.content.clone();
        let version = state.document.version;
        drop(state);

        for local in &conflicting_locals {
            self.notify_conflict_resolved(local, &r, &r_prime);
        }
        self.notify_op_applied(&r_prime);
        self.notify_document_changed(&content, version);

        Ok(RemoteApplyOutcome::Applied)
    }

    /// Marks a local operation as globally acknowledged.
    pub fn acknowledge(&self, op_id: &str) {
        self.state.write().acks.acknowledge(op_id);
    }

    /// A value snapshot of the document.
    pub fn get_document(&self) -> DocumentSnapshot {
        let state = self.state.read();
        DocumentSnapshot {
            content: state.document.content.clone(),
            version: state.document.version,
            clock: state.document.clock.clone(),
        }
    }

    /// Every applied operation not causally known to `peer_clock`.
    pub fn get_operations_since(&self, peer_clock: &VectorClock) -> Vec<Operation> {
        let state = self.state.read();
        state
            .document
            .applied_log
            .iter()
            .filter(|op| !op.clock.happens_before_or_equal(peer_clock))
            .cloned()
            .collect()
    }

    /// Drops acknowledged operations from the pending buffer and prunes
    /// the acknowledgment set of ids no longer pending.
    pub fn cleanup(&self) {
        let mut state = self.state.write();
        let acked = state.acks.as_set().clone();
        state.pending.filter_out(&acked);
        let still_pending: HashSet<String> =
            state.pending.iter().map(|op| op.op_id.clone()).collect();
        state.acks.prune_unknown(&still_pending);
    }

    fn notify_document_changed(&self, content: &str, version: u64) {
        for cb in self.observers.read().document_changed.iter() {
            cb(content, version);
        }
    }

    fn notify_op_applied(&self, op: &Operation) {
        for cb in self.observers.read().op_applied.iter() {
            cb(op);
        }
    }

    fn notify_conflict_resolved(&self, local: &Operation, remote: &Operation, resolved: &Operation) {
        for cb in self.observers.read().conflict_resolved.iter() {
            cb(local, remote, resolved);
        }
    }
}

impl Default for SyncManager {
    fn default() -> Self {
        Self::new()
    }
}

fn now_nanos() -> i64 {
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0)
}

fn char_slice(s: &str, start: usize, length: usize) -> String {
    s.chars().skip(start).take(length).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(participant: &str, content: &str) -> SyncManager {
        let mgr = SyncManager::new();
        mgr.init(participant);
        mgr.set_document(content);
        mgr
    }

    #[test]
    fn init_seeds_clock_entry_to_zero_not_one() {
        let mgr = setup("u1", "");
        assert_eq!(mgr.get_document().clock.get("u1"), 0);
    }

    #[test]
    fn make_insert_increments_clock_and_does_not_apply() {
        let mgr = setup("u1", "hello");
        let op = mgr.make_insert(5, " world".into());
        assert_eq!(op.clock.get("u1"), 1);
        assert_eq!(mgr.get_document().content, "hello");
    }

    #[test]
    fn apply_local_updates_document_and_pending() {
        let mgr = setup("u1", "hello");
        let op = mgr.make_insert(5, " world".into());
        mgr.apply_local(op).unwrap();
        let snap = mgr.get_document();
        assert_eq!(snap.content, "hello world");
        assert_eq!(snap.version, 1);
    }

    #[test]
    fn apply_local_rejects_invalid_position() {
        let mgr = setup("u1", "hi");
        let op = mgr.make_insert(50, "x".into());
        assert!(matches!(
            mgr.apply_local(op),
            Err(OtError::InvalidPosition { .. })
        ));
    }

    #[test]
    fn duplicate_remote_delivery_is_idempotent() {
        let mgr = setup("u1", "hello");
        let mut remote_clock = VectorClock::new();
        remote_clock.increment("u2");
        let remote_op =
            Operation::new_insert("u2", 0, "X".into(), 1, remote_clock);

        let first = mgr.apply_remote(remote_op.clone()).unwrap();
        assert_eq!(first, RemoteApplyOutcome::Applied);
        let snap1 = mgr.get_document();

        let second = mgr.apply_remote(remote_op).unwrap();
        assert_eq!(second, RemoteApplyOutcome::Duplicate);
        let snap2 = mgr.get_document();

        assert_eq!(snap1.content, snap2.content);
        assert_eq!(snap1.version, snap2.version);
    }

    #[test]
    fn concurrent_inserts_at_same_position_converge_with_priority() {
        // U1 wins: verify via transform directly since priority depends
        // on hash/wall_time which we don't control here; this test
        // exercises the reconciliation plumbing, not the specific
        // winner (covered by end-to-end tests).
        let mgr = setup("u1", "HELLO");
        let local_op = mgr.make_insert(0, "A".into());
        mgr.apply_local(local_op).unwrap();

        let mut remote_clock = VectorClock::new();
        remote_clock.increment("u2");
        let remote_op = Operation::new_insert("u2", 0, "B".into(), 999, remote_clock);

        mgr.apply_remote(remote_op).unwrap();
        let snap = mgr.get_document();
        assert!(snap.content.contains('A') && snap.content.contains('B'));
        assert!(snap.content.ends_with("HELLO"));
    }

    #[test]
    fn cleanup_drains_acknowledged_pending_ops() {
        let mgr = setup("u1", "hi");
        let op = mgr.make_insert(2, "!".into());
        let op_id = op.op_id.clone();
        mgr.apply_local(op).unwrap();
        mgr.acknowledge(&op_id);
        mgr.cleanup();
        // after cleanup the pending buffer no longer holds the acked op,
        // verified indirectly: a second cleanup is a no-op and doesn't panic.
        mgr.cleanup();
    }

    #[test]
    fn get_operations_since_returns_only_unknown_ops() {
        let mgr = setup("u1", "");
        let op = mgr.make_insert(0, "x".into());
        mgr.apply_local(op).unwrap();

        let empty_clock = VectorClock::new();
        let ops = mgr.get_operations_since(&empty_clock);
        assert_eq!(ops.len(), 1);

        let current_clock = mgr.get_document().clock;
        let ops2 = mgr.get_operations_since(&current_clock);
        assert!(ops2.is_empty());
    }
}
