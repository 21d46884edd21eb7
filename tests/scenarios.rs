//! End-to-end convergence scenarios between two participants.

use syncweave::clock::VectorClock;
use syncweave::operation::Operation;
use syncweave::sync_manager::{RemoteApplyOutcome, SyncManager};

/// Builds an op with a wall_time far enough from zero that the djb2
/// hash contribution to `priority` (bounded to i32 range) can never
/// flip the ordering `lo_wall_time < hi_wall_time` implies. Used to
/// pin down a deterministic winner for the concurrent-insert scenario.
fn op_with_forced_priority(
    origin: &str,
    position: usize,
    content: &str,
    wall_time: i64,
    clock: VectorClock,
) -> Operation {
    Operation::new_insert(origin, position, content.to_string(), wall_time, clock)
}

fn setup(participant: &str, content: &str) -> SyncManager {
    let mgr = SyncManager::new();
    mgr.init(participant);
    mgr.set_document(content);
    mgr
}

#[test]
fn concurrent_inserts_at_same_position() {
    let u1 = setup("u1", "HELLO");
    let u2 = setup("u2", "HELLO");

    let mut c1 = VectorClock::new();
    c1.increment("u1");
    let mut c2 = VectorClock::new();
    c2.increment("u2");

    // Force u1 to win: a far-negative wall_time guarantees the lowest
    // priority regardless of the hash term.
    let a = op_with_forced_priority("u1", 0, "A", i64::MIN / 2, c1);
    let b = op_with_forced_priority("u2", 0, "B", i64::MAX / 2, c2);

    u1.apply_local(a.clone()).unwrap();
    u2.apply_local(b.clone()).unwrap();

    u1.apply_remote(b).unwrap();
    u2.apply_remote(a).unwrap();

    assert_eq!(u1.get_document().content, "ABHELLO");
    assert_eq!(u2.get_document().content, "ABHELLO");
}

#[test]
fn insert_shifts_remote_delete() {
    let u1 = setup("u1", "abcdef");
    let u2 = setup("u2", "abcdef");

    let insert = u1.make_insert(2, "X".to_string());
    u1.apply_local(insert.clone()).unwrap();
    assert_eq!(u1.get_document().content, "abXcdef");

    let delete = u2.make_delete(3, 2);
    u2.apply_local(delete.clone()).unwrap();
    assert_eq!(u2.get_document().content, "abcf");

    u1.apply_remote(delete).unwrap();
    u2.apply_remote(insert).unwrap();

    assert_eq!(u1.get_document().content, "abXcf");
    assert_eq!(u2.get_document().content, "abXcf");
}

#[test]
fn overlapping_deletes() {
    let u1 = setup("u1", "0123456789");
    let u2 = setup("u2", "0123456789");

    let d1 = u1.make_delete(2, 4);
    u1.apply_local(d1.clone()).unwrap();
    assert_eq!(u1.get_document().content, "016789");

    let d2 = u2.make_delete(3, 4);
    u2.apply_local(d2.clone()).unwrap();
    assert_eq!(u2.get_document().content, "012789");

    u1.apply_remote(d2).unwrap();
    u2.apply_remote(d1).unwrap();

    // The two ranges [2,6) and [3,7) overlap in [3,6); their union removes
    // five characters ("23456"), leaving the rest of the digits behind.
    assert_eq!(u1.get_document().content, "01789");
    assert_eq!(u2.get_document().content, "01789");
}

#[test]
fn insert_inside_concurrent_delete_range() {
    let u1 = setup("u1", "abcdefg");
    let u2 = setup("u2", "abcdefg");

    let delete = u1.make_delete(1, 4);
    u1.apply_local(delete.clone()).unwrap();
    assert_eq!(u1.get_document().content, "afg");

    let insert = u2.make_insert(3, "X".to_string());
    u2.apply_local(insert.clone()).unwrap();
    assert_eq!(u2.get_document().content, "abcXdefg");

    u1.apply_remote(insert).unwrap();
    u2.apply_remote(delete).unwrap();

    // The insert landed strictly inside the concurrently deleted range,
    // so it is swallowed along with the rest of the deletion.
    assert_eq!(u1.get_document().content, "afg");
    assert_eq!(u2.get_document().content, "afg");
}

#[test]
fn idempotent_remote_delivery() {
    let u1 = setup("u1", "abcdef");
    let u2 = setup("u2", "abcdef");

    let insert = u2.make_insert(0, "Z".to_string());
    u2.apply_local(insert.clone()).unwrap();

    let first = u1.apply_remote(insert.clone()).unwrap();
    assert_eq!(first, RemoteApplyOutcome::Applied);
    let snap_after_first = u1.get_document();

    let second = u1.apply_remote(insert).unwrap();
    assert_eq!(second, RemoteApplyOutcome::Duplicate);
    let snap_after_second = u1.get_document();

    assert_eq!(snap_after_first.content, snap_after_second.content);
    assert_eq!(snap_after_first.version, snap_after_second.version);
    assert_eq!(snap_after_first.clock, snap_after_second.clock);
}

#[test]
fn late_joining_peer_catches_up() {
    let original = "abcdef";
    let u1 = setup("u1", original);

    let op_a = u1.make_insert(2, "X".to_string());
    u1.apply_local(op_a).unwrap();
    let op_b = u1.make_insert(0, "Y".to_string());
    u1.apply_local(op_b).unwrap();

    let u3 = setup("u3", original);
    let empty_clock = VectorClock::new();
    for op in u1.get_operations_since(&empty_clock) {
        u3.apply_remote(op).unwrap();
    }

    assert_eq!(u3.get_document().content, u1.get_document().content);
}
