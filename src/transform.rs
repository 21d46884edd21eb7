//! The four pairwise inclusion-transform (IT) rules.
//!
//! Each rule adjusts `op` so that it has the same effect it would have
//! had if `against` had already been applied. None of these fail —
//! `Retain` operations never reach this module because
//! [`crate::operation::Operation::validate`] rejects them at ingestion.

use crate::operation::{Operation, OperationKind};

/// Transform `op` against `against`, breaking position ties in `op`'s
/// favor when `op_wins` is true.
pub fn transform(op: &Operation, against: &Operation, op_wins: bool) -> Operation {
    use OperationKind::*;
    match (op.kind, against.kind) {
        (Insert, Insert) => insert_insert(op, against, op_wins),
        (Insert, Delete) => insert_delete(op, against),
        (Delete, Insert) => delete_insert(op, against),
        (Delete, Delete) => delete_delete(op, against),
        _ => unreachable!("Retain operations are rejected before reaching the transform"),
    }
}

fn insert_insert(op: &Operation, against: &Operation, op_wins: bool) -> Operation {
    let mut out = op.clone();
    if against.position < op.position {
        out.position += against.length;
    } else if against.position == op.position && !op_wins {
        out.position += against.length;
    }
    out
}

fn insert_delete(op: &Operation, against: &Operation) -> Operation {
    let mut out = op.clone();
    let p = against.position;
    let l = against.length;
    if p + l <= op.position {
        // Entirely after the deleted range: shift left to close the gap.
        out.position -= l;
    } else if op.position == p {
        // Landed exactly at the deletion's start edge: it was not part
        // of the deleted text, so it survives right before whatever
        // follows the deletion.
        out.position = p;
    } else if p < op.position && op.position < p + l {
        // Strictly inside the deleted range: mirrors `delete_insert`
        // growing to absorb a concurrent insert at the same position —
        // the insert is swallowed by the deletion.
        out.content.clear();
        out.length = 0;
        out.position = p;
    }
    out
}

fn delete_insert(op: &Operation, against: &Operation) -> Operation {
    let mut out = op.clone();
    let p = against.position;
    let l = against.length;
    if p <= op.position {
        out.position += l;
    } else if op.position < p && p < op.position + op.length {
        out.length += l;
    }
    out
}

fn delete_delete(op: &Operation, against: &Operation) -> Operation {
    let mut out = op.clone();
    let p = against.position;
    let l = against.length;

    if p + l <= op.position {
        out.position -= l;
    } else if op.position + op.length <= p {
        // unchanged
    } else if p <= op.position && p + l >= op.position + op.length {
        // `against` fully covers `op`: op becomes a no-op.
        out.position = p;
        out.length = 0;
    } else if op.position <= p && op.position + op.length >= p + l {
        // `op` fully covers `against`.
        out.length -= l;
    } else if p < op.position {
        let overlap = p + l - op.position;
        out.position = p;
        out.length = out.length.saturating_sub(overlap);
    } else {
        let overlap = op.position + op.length - p;
        out.length = out.length.saturating_sub(overlap);
    }
    out
}
