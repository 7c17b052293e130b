use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};

use tracing::debug;
use uuid::Uuid;

use super::connection::ConnectionState;
use super::consumer::MemoryConsumer;
use crate::endpoint::EndpointKind;
use crate::error::TransportError;
use crate::message::MessageId;
use crate::transport::{Consumer, Destination, Producer, Session, WireMessage};

static NEXT_CONSUMER_ID: AtomicU64 = AtomicU64::new(1);

/// Session on a [`MemoryConnection`](super::MemoryConnection).
#[derive(Debug)]
pub struct MemorySession {
    connection: Arc<ConnectionState>,
}

impl MemorySession {
    pub(super) fn new(connection: Arc<ConnectionState>) -> Self {
        Self { connection }
    }

    fn named(&self, kind: EndpointKind, name: &str) -> Result<Destination, TransportError> {
        self.connection.ensure_open()?;
        let destination = Destination::new(kind, name, false);
        self.connection.broker().declare(&destination)?;
        Ok(destination)
    }

    fn temporary(&self, kind: EndpointKind) -> Result<Destination, TransportError> {
        self.connection.ensure_open()?;
        let destination = Destination::new(kind, Uuid::new_v4().to_string(), true);
        self.connection.broker().declare(&destination)?;
        self.connection.track_temporary(destination.clone());
        debug!(destination = %destination, "temporary destination created");
        Ok(destination)
    }
}

impl Session for MemorySession {
    fn create_queue(&self, name: &str) -> Result<Destination, TransportError> {
        self.named(EndpointKind::Queue, name)
    }

    fn create_topic(&self, name: &str) -> Result<Destination, TransportError> {
        self.named(EndpointKind::Topic, name)
    }

    fn create_temporary_queue(&self) -> Result<Destination, TransportError> {
        self.temporary(EndpointKind::Queue)
    }

    fn create_temporary_topic(&self) -> Result<Destination, TransportError> {
        self.temporary(EndpointKind::Topic)
    }

    fn create_producer(
        &self,
        destination: &Destination,
    ) -> Result<Arc<dyn Producer>, TransportError> {
        self.connection.ensure_open()?;
        Ok(Arc::new(MemoryProducer {
            destination: destination.clone(),
            connection: Arc::clone(&self.connection),
        }))
    }

    fn create_consumer(
        &self,
        destination: &Destination,
    ) -> Result<Arc<dyn Consumer>, TransportError> {
        self.connection.ensure_open()?;

        let id = NEXT_CONSUMER_ID.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel();
        self.connection.broker().attach(destination, id, tx)?;

        let consumer = Arc::new(MemoryConsumer::new(
            id,
            destination.clone(),
            Arc::clone(&self.connection),
            rx,
        ));
        self.connection.track_consumer(Arc::clone(&consumer));
        Ok(consumer)
    }
}

/// Producer on a [`MemorySession`].
#[derive(Debug)]
pub struct MemoryProducer {
    destination: Destination,
    connection: Arc<ConnectionState>,
}

impl Producer for MemoryProducer {
    fn destination(&self) -> &Destination {
        &self.destination
    }

    fn send(&self, message: &mut WireMessage) -> Result<MessageId, TransportError> {
        self.connection.ensure_open()?;

        let message_id = MessageId::new(format!("ID:{}", Uuid::new_v4()));
        let mut delivered = message.clone();
        delivered.set_message_id(Some(message_id.clone()));
        self.connection.broker().route(&self.destination, delivered)?;

        message.set_message_id(Some(message_id.clone()));
        Ok(message_id)
    }
}
