use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

use tracing::debug;
use uuid::Uuid;

use super::broker::BrokerState;
use super::consumer::MemoryConsumer;
use super::session::MemorySession;
use crate::error::TransportError;
use crate::transport::{Connection, Consumer, Destination, Session};

/// State shared by a connection and everything created through it.
pub(super) struct ConnectionState {
    id: String,
    broker: Arc<BrokerState>,
    closed: AtomicBool,
    started: Mutex<bool>,
    started_cv: Condvar,
    consumers: Mutex<Vec<Arc<MemoryConsumer>>>,
    temporaries: Mutex<Vec<Destination>>,
}

impl ConnectionState {
    pub(super) fn new(broker: Arc<BrokerState>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            broker,
            closed: AtomicBool::new(false),
            started: Mutex::new(false),
            started_cv: Condvar::new(),
            consumers: Mutex::new(Vec::new()),
            temporaries: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn id(&self) -> &str {
        &self.id
    }

    pub(super) fn broker(&self) -> &Arc<BrokerState> {
        &self.broker
    }

    pub(super) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(super) fn ensure_open(&self) -> Result<(), TransportError> {
        if self.is_closed() {
            Err(TransportError::ConnectionClosed)
        } else {
            Ok(())
        }
    }

    pub(super) fn start(&self) -> Result<(), TransportError> {
        self.ensure_open()?;
        let mut started = self.started.lock().unwrap_or_else(PoisonError::into_inner);
        if !*started {
            *started = true;
            self.started_cv.notify_all();
            debug!(connection = %self.id, "connection started");
        }
        Ok(())
    }

    /// Block until the connection is started. Returns `false` if it closed first.
    pub(super) fn wait_started(&self) -> bool {
        let started = self.started.lock().unwrap_or_else(PoisonError::into_inner);
        let started = self
            .started_cv
            .wait_while(started, |started| !*started && !self.is_closed())
            .unwrap_or_else(PoisonError::into_inner);
        *started && !self.is_closed()
    }

    pub(super) fn track_consumer(&self, consumer: Arc<MemoryConsumer>) {
        let mut consumers = self.consumers.lock().unwrap_or_else(PoisonError::into_inner);
        consumers.retain(|existing| !existing.is_closed());
        consumers.push(consumer);
    }

    pub(super) fn track_temporary(&self, destination: Destination) {
        self.temporaries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(destination);
    }

    /// Close consumers, drop temporary destinations and wake waiting delivery threads.
    pub(super) fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        {
            let _started = self.started.lock().unwrap_or_else(PoisonError::into_inner);
            self.started_cv.notify_all();
        }

        let consumers: Vec<_> = self
            .consumers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for consumer in consumers {
            // Closing an in-memory consumer cannot fail.
            let _ = consumer.close();
        }

        let temporaries: Vec<_> = self
            .temporaries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for destination in &temporaries {
            self.broker.remove(destination);
        }

        debug!(connection = %self.id, broker = self.broker.name(), "connection closed");
    }
}

impl fmt::Debug for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionState")
            .field("id", &self.id)
            .field("broker", &self.broker.name())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Connection to an [`InMemoryBroker`](super::InMemoryBroker).
#[derive(Debug)]
pub struct MemoryConnection {
    state: Arc<ConnectionState>,
}

impl MemoryConnection {
    pub(super) fn new(state: Arc<ConnectionState>) -> Self {
        Self { state }
    }
}

impl Connection for MemoryConnection {
    fn start(&self) -> Result<(), TransportError> {
        self.state.start()
    }

    fn close(&self) -> Result<(), TransportError> {
        self.state.close();
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.state.is_closed()
    }

    fn create_session(&self) -> Result<Arc<dyn Session>, TransportError> {
        self.state.ensure_open()?;
        Ok(Arc::new(MemorySession::new(Arc::clone(&self.state))))
    }
}
