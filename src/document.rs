//! The replicated document: content, causal view, and applied log.

use crate::clock::VectorClock;
use crate::error::OtError;
use crate::operation::{Operation, OperationKind};

/// The document's current content plus everything needed to reconstruct
/// or catch up another replica: version, merged clock, and the ordered
/// log of every operation applied so far.
#[derive(Debug, Clone)]
pub struct DocumentState {
    pub content: String,
    pub version: u64,
    pub clock: VectorClock,
    pub applied_log: Vec<Operation>,
    /// The content the document started from, before any op in
    /// `applied_log`. `fold_excluding` rebuilds from here, not from
    /// the empty string, so a non-empty starting document survives
    /// the undo step in `SyncManager::apply_remote`.
    base_content: String,
}

impl DocumentState {
    pub fn new(initial_content: impl Into<String>) -> Self {
        let initial_content = initial_content.into();
        Self {
            content: initial_content.clone(),
            version: 0,
            clock: VectorClock::new(),
            applied_log: Vec::new(),
            base_content: initial_content,
        }
    }

    /// Apply `op` to `content` in place, erroring if its position/length
    /// are out of bounds. Used for operations an originator generated
    /// against its own, necessarily valid, view of the document.
    pub fn apply_checked(&mut self, op: &Operation) -> Result<(), OtError> {
        op.validate()?;
        apply_to_string(&mut self.content, op, true)?;
        self.version += 1;
        self.clock.merge(&op.clock);
        self.applied_log.push(op.clone());
        Ok(())
    }

    /// Apply `op`, clamping an out-of-range position/length to a no-op
    /// instead of failing. Used for remote operations reconciled via
    /// OT, where an invalid post-transform position signals the edit
    /// has already been overtaken by other concurrent changes.
    pub fn apply_clamped(&mut self, op: &Operation) {
        let _ = apply_to_string(&mut self.content, op, false);
        self.version += 1;
        self.clock.merge(&op.clock);
        self.applied_log.push(op.clone());
    }

    /// Rebuild content by folding `applied_log` minus the given set of
    /// operation ids (by reference identity via `op_id`), in stored
    /// order, starting from the document's base content.
    pub fn fold_excluding(&self, excluded_ids: &std::collections::HashSet<String>) -> String {
        let mut content = self.base_content.clone();
        for op in &self.applied_log {
            if excluded_ids.contains(&op.op_id) {
                continue;
            }
            let _ = apply_to_string(&mut content, op, false);
        }
        content
    }
}

/// Apply a single Insert/Delete to `content`. When `strict` is true, an
/// out-of-bounds position/length is an error; otherwise it is silently
/// clamped to a no-op.
fn apply_to_string(content: &mut String, op: &Operation, strict: bool) -> Result<(), OtError> {
    match op.kind {
        OperationKind::Insert => {
            let doc_len = content.chars().count();
            if op.position > doc_len {
                if strict {
                    return Err(OtError::InvalidPosition {
                        position: op.position,
                        length: op.length,
                        document_len: doc_len,
                    });
                }
                return Ok(());
            }
            let byte_idx = char_to_byte_index(content, op.position);
            content.insert_str(byte_idx, &op.content);
            Ok(())
        }
        OperationKind::Delete => {
            let doc_len = content.chars().count();
            if op.length == 0 {
                return Ok(());
            }
            if op.position >= doc_len || op.position + op.length > doc_len {
                if strict {
                    return Err(OtError::InvalidPosition {
                        position: op.position,
                        length: op.length,
                        document_len: doc_len,
                    });
                }
                return Ok(());
            }
            let start = char_to_byte_index(content, op.position);
            let end = char_to_byte_index(content, op.position + op.length);
            content.replace_range(start..end, "");
            Ok(())
        }
        OperationKind::Retain => Err(OtError::UnknownKind),
    }
}

fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(byte_idx, _)| byte_idx)
        .unwrap_or(s.len())
}
