//! The transport placeholder: a trait capturing the "best-effort,
//! unordered, at-least-once, dedup-by-id" contract the engine assumes
//! of a real peer-to-peer layer, plus an in-process loopback
//! implementation for local demos and end-to-end tests.
//!
//! No NAT traversal, ICE negotiation, or encrypted data channel is
//! implemented here — a production transport is a separate concern.

use tokio::sync::mpsc;

use crate::operation::Operation;

/// What the engine needs from a transport: fire-and-forget send, and
/// non-blocking receive. Ordering, retries, and delivery guarantees are
/// the transport's problem; the engine tolerates reordering and
/// duplicates by design (vector clocks and `op_id` dedup).
pub trait OperationTransport: Send + Sync {
    fn send(&self, op: Operation);
    fn try_recv(&self) -> Option<Operation>;
}

/// An in-process channel standing in for a real P2P link. Two
/// `LoopbackTransport` handles created via [`loopback_pair`] deliver
/// operations to each other; tests may drop or reorder messages
/// between `send` and `try_recv` to model an unreliable channel.
pub struct LoopbackTransport {
    outbound: mpsc::UnboundedSender<Operation>,
    inbound: parking_lot::Mutex<mpsc::UnboundedReceiver<Operation>>,
}

/// Builds two endpoints wired to each other: sends on one arrive on
/// the other's `try_recv`.
pub fn loopback_pair() -> (LoopbackTransport, LoopbackTransport) {
    let (tx_a, rx_a) = mpsc::unbounded_channel();
    let (tx_b, rx_b) = mpsc::unbounded_channel();
    (
        LoopbackTransport {
            outbound: tx_b,
            inbound: parking_lot::Mutex::new(rx_a),
        },
        LoopbackTransport {
            outbound: tx_a,
            inbound: parking_lot::Mutex::new(rx_b),
        },
    )
}

impl OperationTransport for LoopbackTransport {
    fn send(&self, op: Operation) {
        // An unbounded channel with no live receiver only errors when
        // the peer has been dropped entirely; there is nothing
        // actionable to do with that here.
        let _ = self.outbound.send(op);
    }

    fn try_recv(&self) -> Option<Operation> {
        self.inbound.lock().try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::VectorClock;

    fn op(id: &str) -> Operation {
        let mut o = Operation::new_insert("u1", 0, "x".into(), 0, VectorClock::new());
        o.op_id = id.to_string();
        o
    }

    #[test]
    fn loopback_delivers_to_the_peer_not_the_sender() {
        let (a, b) = loopback_pair();
        a.send(op("1"));
        assert!(a.try_recv().is_none());
        let received = b.try_recv().unwrap();
        assert_eq!(received.op_id, "1");
    }

    #[test]
    fn try_recv_is_empty_with_nothing_sent() {
        let (a, _b) = loopback_pair();
        assert!(a.try_recv().is_none());
    }

    #[test]
    fn messages_arrive_in_send_order() {
        let (a, b) = loopback_pair();
        a.send(op("1"));
        a.send(op("2"));
        assert_eq!(b.try_recv().unwrap().op_id, "1");
        assert_eq!(b.try_recv().unwrap().op_id, "2");
    }
}
