//! Builds connection contexts over one shared connection.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error};

use crate::context::{ConnectionContext, ConsumerContext, ProducerContext};
use crate::endpoint::{Endpoint, EndpointKind};
use crate::error::{MessagingError, Result};
use crate::transport::{self, Connection, ConnectionFactory, Destination, Session};

/// Creates producer and consumer contexts for endpoints on one broker.
///
/// The first context opens and starts a connection; every later context
/// reuses it. Each context gets its own session. [`close`](Self::close)
/// closes the shared connection, which invalidates every context made so far.
///
/// ```
/// use bus_rpc::transport::memory::InMemoryBroker;
/// use bus_rpc::{ConnectionContextFactory, Endpoint};
///
/// let broker = InMemoryBroker::new("factory-doc");
/// broker.start().unwrap();
///
/// let factory = ConnectionContextFactory::new(&broker.connection_url()).unwrap();
/// let producer = factory.create_producer_context(&Endpoint::queue("jobs")).unwrap();
/// assert!(producer.producer().is_some());
/// factory.close();
/// ```
#[derive(Debug)]
pub struct ConnectionContextFactory {
    connection_factory: Arc<dyn ConnectionFactory>,
    connection: Mutex<Option<Arc<dyn Connection>>>,
}

impl ConnectionContextFactory {
    /// Factory for the broker at `broker_url`, e.g. `memory://local`.
    ///
    /// Fails if the URL is malformed or its scheme has no transport binding.
    /// Reachability is checked when the first connection is opened.
    pub fn new(broker_url: &str) -> Result<Self> {
        let connection_factory =
            transport::connection_factory_for_url(broker_url).map_err(MessagingError::Connection)?;
        debug!(url = broker_url, "connection context factory created");
        Ok(Self::with_connection_factory(connection_factory))
    }

    /// Factory over any transport binding.
    pub fn with_connection_factory(connection_factory: Arc<dyn ConnectionFactory>) -> Self {
        Self {
            connection_factory,
            connection: Mutex::new(None),
        }
    }

    /// Connection, session, destination and producer for `endpoint`.
    ///
    /// Nothing is rolled back on failure; call [`close`](Self::close) to
    /// release what was opened.
    pub fn create_producer_context(&self, endpoint: &Endpoint) -> Result<ProducerContext> {
        let mut context = ProducerContext::new();
        self.create_or_reuse_connection(&mut context, true)?;
        self.create_session(&mut context)?;
        self.create_destination(&mut context, endpoint)?;
        self.create_producer(&mut context)?;
        debug!(endpoint = %endpoint, "producer context created");
        Ok(context)
    }

    /// Connection, session, destination and consumer for `endpoint`.
    pub fn create_consumer_context(&self, endpoint: &Endpoint) -> Result<ConsumerContext> {
        let mut context = ConsumerContext::new();
        self.create_or_reuse_connection(&mut context, true)?;
        self.create_session(&mut context)?;
        self.create_destination(&mut context, endpoint)?;
        self.create_consumer(&mut context)?;
        debug!(endpoint = %endpoint, "consumer context created");
        Ok(context)
    }

    /// Put the cached connection on `context`, opening one first if needed.
    pub fn create_or_reuse_connection(
        &self,
        context: &mut ConnectionContext,
        start: bool,
    ) -> Result<()> {
        let mut slot = self.lock_connection();
        let reusable = slot.as_ref().filter(|c| !c.is_closed()).cloned();
        let (connection, opened) = match reusable {
            Some(connection) => (connection, false),
            None => {
                let connection = self.open(start)?;
                replace(&mut slot, Some(Arc::clone(&connection)));
                (connection, true)
            }
        };
        drop(slot);

        if start && !opened {
            connection.start().map_err(MessagingError::Connection)?;
        }
        context.set_connection(Some(connection));
        Ok(())
    }

    /// Open a fresh connection for `context` and make it the cached one.
    ///
    /// The previously cached connection is closed.
    pub fn create_connection(&self, context: &mut ConnectionContext, start: bool) -> Result<()> {
        let connection = self.open(start)?;
        self.set_connection(Some(Arc::clone(&connection)));
        context.set_connection(Some(connection));
        Ok(())
    }

    /// Give `context` a new session on its connection.
    pub fn create_session(&self, context: &mut ConnectionContext) -> Result<()> {
        let connection = context
            .connection()
            .ok_or_else(|| MessagingError::missing("connection"))?;
        let session = connection.create_session().map_err(MessagingError::Connection)?;
        context.set_session(Some(session));
        Ok(())
    }

    /// Resolve `endpoint` on `context`'s session.
    ///
    /// Temporary endpoints get a fresh destination on every call.
    pub fn create_destination(
        &self,
        context: &mut ConnectionContext,
        endpoint: &Endpoint,
    ) -> Result<()> {
        let session = context
            .session()
            .ok_or_else(|| MessagingError::missing("session"))?;
        let destination = match (endpoint.kind(), endpoint.is_temporary()) {
            (EndpointKind::Queue, true) => session.create_temporary_queue(),
            (EndpointKind::Topic, true) => session.create_temporary_topic(),
            (EndpointKind::Queue, false) => session.create_queue(endpoint.name()),
            (EndpointKind::Topic, false) => session.create_topic(endpoint.name()),
        }
        .map_err(MessagingError::from_destination)?;
        context.set_destination(Some(destination));
        Ok(())
    }

    /// Attach a producer to `context`'s destination.
    pub fn create_producer(&self, context: &mut ProducerContext) -> Result<()> {
        let (session, destination) = session_and_destination(context)?;
        let producer = session
            .create_producer(&destination)
            .map_err(MessagingError::Connection)?;
        context.set_producer(Some(producer));
        Ok(())
    }

    /// Attach a consumer to `context`'s destination.
    pub fn create_consumer(&self, context: &mut ConsumerContext) -> Result<()> {
        let (session, destination) = session_and_destination(context)?;
        let consumer = session
            .create_consumer(&destination)
            .map_err(MessagingError::Connection)?;
        context.set_consumer(Some(consumer));
        Ok(())
    }

    /// Replace the cached connection, closing the previous one.
    pub fn set_connection(&self, connection: Option<Arc<dyn Connection>>) {
        replace(&mut self.lock_connection(), connection);
    }

    /// The cached connection, if one has been opened.
    pub fn connection(&self) -> Option<Arc<dyn Connection>> {
        self.lock_connection().clone()
    }

    /// Close the cached connection. Does nothing if none is open.
    pub fn close(&self) {
        if let Some(connection) = self.lock_connection().take() {
            close_logged(connection.as_ref());
            debug!("connection context factory closed");
        }
    }

    fn open(&self, start: bool) -> Result<Arc<dyn Connection>> {
        let connection = self
            .connection_factory
            .create_connection()
            .map_err(MessagingError::Connection)?;
        if start {
            connection.start().map_err(MessagingError::Connection)?;
        }
        debug!(started = start, "connection opened");
        Ok(connection)
    }

    fn lock_connection(&self) -> MutexGuard<'_, Option<Arc<dyn Connection>>> {
        self.connection.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn session_and_destination(
    context: &ConnectionContext,
) -> Result<(Arc<dyn Session>, Destination)> {
    let session = context
        .session()
        .ok_or_else(|| MessagingError::missing("session"))?;
    let destination = context
        .destination()
        .ok_or_else(|| MessagingError::missing("destination"))?;
    Ok((Arc::clone(session), destination.clone()))
}

fn replace(slot: &mut Option<Arc<dyn Connection>>, connection: Option<Arc<dyn Connection>>) {
    if let Some(previous) = slot.take() {
        let same = matches!(&connection, Some(next) if Arc::ptr_eq(&previous, next));
        if !same {
            close_logged(previous.as_ref());
        }
    }
    *slot = connection;
}

fn close_logged(connection: &dyn Connection) {
    if let Err(e) = connection.close() {
        error!(error = %e, "failed to close connection");
    }
}
