//! In-process broker for tests and single-process deployments.
//!
//! Brokers register under a name and are reached through
//! `memory://<name>` URLs, so a [`ConnectionContextFactory`] can be pointed
//! at one exactly like at a networked broker.
//!
//! Semantics:
//! - Queues buffer messages until a consumer attaches, then hand each
//!   message to one consumer (round-robin).
//! - Topics deliver each message to every consumer attached at send time and
//!   drop it when there are none.
//! - Temporary destinations are removed when the connection that created
//!   them closes; sending to a removed one fails.
//! - Each consumer with a listener gets its own delivery thread, which waits
//!   until the connection is started.
//!
//! ## Example
//!
//! ```
//! use bus_rpc::transport::memory::InMemoryBroker;
//! use bus_rpc::ConnectionContextFactory;
//!
//! let broker = InMemoryBroker::new("docs-broker");
//! broker.start().unwrap();
//!
//! let factory = ConnectionContextFactory::new(&broker.connection_url()).unwrap();
//! // ... create contexts, send and listen ...
//! factory.close();
//! broker.stop();
//! ```
//!
//! [`ConnectionContextFactory`]: crate::ConnectionContextFactory

mod broker;
mod connection;
mod consumer;
mod session;

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

use tracing::debug;

use self::broker::BrokerState;
use super::{Connection, ConnectionFactory};
use crate::error::TransportError;

pub use self::connection::MemoryConnection;
pub use self::consumer::MemoryConsumer;
pub use self::session::{MemoryProducer, MemorySession};

static BROKERS: LazyLock<Mutex<HashMap<String, Arc<BrokerState>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// An in-process message broker.
///
/// Stopping the broker (explicitly or by dropping it) closes every
/// connection made to it.
#[derive(Debug)]
pub struct InMemoryBroker {
    state: Arc<BrokerState>,
}

impl InMemoryBroker {
    /// Create a broker. It is unreachable until [`start`](Self::start)ed.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            state: Arc::new(BrokerState::new(name.into())),
        }
    }

    /// Register the broker under its name and accept connections.
    ///
    /// Fails if another running broker already uses the name.
    pub fn start(&self) -> Result<(), TransportError> {
        let mut brokers = BROKERS
            .lock()
            .map_err(|_| TransportError::LockPoisoned("broker start"))?;

        if let Some(existing) = brokers.get(self.state.name()) {
            if Arc::ptr_eq(existing, &self.state) {
                return Ok(());
            }
            return Err(TransportError::Other(format!(
                "a broker named '{}' is already running",
                self.state.name()
            )));
        }

        self.state.set_running(true);
        brokers.insert(self.state.name().to_string(), Arc::clone(&self.state));
        debug!(broker = self.state.name(), "in-memory broker started");
        Ok(())
    }

    /// Unregister the broker and close all of its connections.
    pub fn stop(&self) {
        {
            let mut brokers = BROKERS.lock().unwrap_or_else(PoisonError::into_inner);
            if brokers
                .get(self.state.name())
                .is_some_and(|existing| Arc::ptr_eq(existing, &self.state))
            {
                brokers.remove(self.state.name());
            }
        }

        if self.state.set_running(false) {
            self.state.shutdown();
            debug!(broker = self.state.name(), "in-memory broker stopped");
        }
    }

    pub fn name(&self) -> &str {
        self.state.name()
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// URL that resolves to this broker.
    pub fn connection_url(&self) -> String {
        format!("memory://{}", self.state.name())
    }
}

impl ConnectionFactory for InMemoryBroker {
    fn create_connection(&self) -> Result<Arc<dyn Connection>, TransportError> {
        self.state.connect()
    }
}

impl Drop for InMemoryBroker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Connection factory for a `memory://` URL.
///
/// The broker is looked up by name each time a connection is created.
#[derive(Debug, Clone)]
pub struct MemoryConnectionFactory {
    broker_name: String,
}

impl MemoryConnectionFactory {
    pub fn new(broker_name: impl Into<String>) -> Self {
        Self {
            broker_name: broker_name.into(),
        }
    }
}

impl ConnectionFactory for MemoryConnectionFactory {
    fn create_connection(&self) -> Result<Arc<dyn Connection>, TransportError> {
        let broker = BROKERS
            .lock()
            .map_err(|_| TransportError::LockPoisoned("broker lookup"))?
            .get(&self.broker_name)
            .cloned()
            .ok_or_else(|| TransportError::Unreachable(format!("memory://{}", self.broker_name)))?;
        broker.connect()
    }
}
