//! Client-side state for the realtime chat protocol.
//!
//! Messages reach a client along two paths: the REST response to its own
//! writes, and the room broadcast over the gateway. Neither path is ordered
//! relative to the other, so the merge logic here is what keeps the local
//! view free of duplicates and losses. Everything in this crate is a pure
//! state machine (no sockets, no HTTP, clocks injected) so the protocol
//! invariants are testable without a server.

pub mod reconcile;
pub mod typing;
