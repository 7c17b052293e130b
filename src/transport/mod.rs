//! Broker capability traits.
//!
//! The messaging core never talks to a broker client directly. It drives
//! these traits, which any binding can implement:
//!
//! ```text
//! ConnectionFactory ──► Connection ──► Session ──┬─► Destination (queue/topic, named/temporary)
//!                                                ├─► Producer ──send──► WireMessage
//!                                                └─► Consumer ──on_message──► MessageListener
//! ```
//!
//! Delivery runs on threads owned by the binding. A [`MessageListener`] may
//! be called from any thread, and may close its own consumer from inside
//! the callback.
//!
//! Bindings included:
//! - [`memory::InMemoryBroker`] (feature `memory`): in-process broker for
//!   tests and single-process use.

#[cfg(feature = "memory")]
pub mod memory;
mod resolve;
mod wire;

use std::fmt::Debug;
use std::sync::Arc;

pub use resolve::connection_factory_for_url;
pub use wire::{Destination, WireMessage};

use crate::error::TransportError;
use crate::message::MessageId;

/// Creates connections to one broker.
pub trait ConnectionFactory: Send + Sync + Debug {
    /// Open a new, not yet started, connection.
    fn create_connection(&self) -> Result<Arc<dyn Connection>, TransportError>;
}

/// A connection to a broker. Closing it closes everything created through it.
pub trait Connection: Send + Sync + Debug {
    /// Begin message delivery. Starting a started connection is a no-op.
    fn start(&self) -> Result<(), TransportError>;

    /// Close the connection, its sessions, producers, consumers and
    /// temporary destinations.
    fn close(&self) -> Result<(), TransportError>;

    fn is_closed(&self) -> bool;

    /// Create a non-transacted, auto-acknowledging session.
    fn create_session(&self) -> Result<Arc<dyn Session>, TransportError>;
}

/// A single-threaded unit of work on a connection.
pub trait Session: Send + Sync + Debug {
    /// Resolve a named queue.
    fn create_queue(&self, name: &str) -> Result<Destination, TransportError>;

    /// Resolve a named topic.
    fn create_topic(&self, name: &str) -> Result<Destination, TransportError>;

    /// Allocate a fresh temporary queue that lives as long as the connection.
    fn create_temporary_queue(&self) -> Result<Destination, TransportError>;

    /// Allocate a fresh temporary topic that lives as long as the connection.
    fn create_temporary_topic(&self) -> Result<Destination, TransportError>;

    fn create_producer(&self, destination: &Destination)
        -> Result<Arc<dyn Producer>, TransportError>;

    fn create_consumer(&self, destination: &Destination)
        -> Result<Arc<dyn Consumer>, TransportError>;
}

/// Sends messages to one destination.
pub trait Producer: Send + Sync + Debug {
    fn destination(&self) -> &Destination;

    /// Send a message. On success the transport-assigned id is stored on the
    /// message and returned.
    fn send(&self, message: &mut WireMessage) -> Result<MessageId, TransportError>;
}

/// Receives messages from one destination.
pub trait Consumer: Send + Sync + Debug {
    fn destination(&self) -> &Destination;

    /// Route arriving messages to `listener`, replacing any previous one.
    fn set_message_listener(&self, listener: Arc<dyn MessageListener>)
        -> Result<(), TransportError>;

    /// Stop delivery. Safe to call from inside the listener callback.
    fn close(&self) -> Result<(), TransportError>;

    fn is_closed(&self) -> bool;
}

/// Callback invoked by the transport for each delivered message.
pub trait MessageListener: Send + Sync {
    fn on_message(&self, message: WireMessage);
}
