//! Integration layer - the seam to the outside world.
//!
//! The hub connection itself is an external collaborator; this layer only
//! defines the contract the engine consumes.

pub mod transport;

pub use transport::{BoxedTransport, EventSink, JOIN_METHOD, SEND_METHOD, Transport};
