//! Deterministic tie-breaking for concurrent operations.
//!
//! Every participant must compute the exact same winner for the same
//! pair of operations, so the hash and the comparison are pinned down
//! to the byte.

use crate::operation::Operation;

/// The classic djb2 string hash, truncated to 32 bits.
pub fn djb2_hash(s: &str) -> u32 {
    let mut hash: u32 = 5381;
    for byte in s.bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(byte as u32);
    }
    hash
}

/// `priority(op) = hash(op.origin || op.op_id) + op.wall_time`, with the
/// 32-bit hash reinterpreted as a signed value before widening to i64.
pub fn priority(op: &Operation) -> i64 {
    let mut key = String::with_capacity(op.origin.len() + op.op_id.len());
    key.push_str(&op.origin);
    key.push_str(&op.op_id);
    let hash = djb2_hash(&key) as i32 as i64;
    hash + op.wall_time
}

/// True if `a` should be treated as "already applied" relative to `b` —
/// i.e. `a` wins the conflict and `b` is the one transformed against it.
/// Lower priority wins; ties are broken by lexicographic `op_id`.
pub fn a_wins(a: &Operation, b: &Operation) -> bool {
    let (pa, pb) = (priority(a), priority(b));
    match pa.cmp(&pb) {
        std::cmp::Ordering::Less => true,
        std::cmp::Ordering::Greater => false,
        std::cmp::Ordering::Equal => a.op_id < b.op_id,
    }
}
