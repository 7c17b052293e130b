use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError, RwLock};
use std::thread;

use tracing::{debug, error};

use super::connection::ConnectionState;
use crate::error::TransportError;
use crate::transport::{Consumer, Destination, MessageListener, WireMessage};

type ListenerSlot = Arc<RwLock<Option<Arc<dyn MessageListener>>>>;

/// Consumer on a [`MemorySession`](super::MemorySession).
///
/// Messages are buffered in a channel until a listener is set. The first
/// listener spawns a delivery thread, which waits for the connection to be
/// started and then invokes the current listener once per message.
pub struct MemoryConsumer {
    id: u64,
    destination: Destination,
    connection: Arc<ConnectionState>,
    receiver: Mutex<Option<mpsc::Receiver<WireMessage>>>,
    listener: ListenerSlot,
    closed: Arc<AtomicBool>,
}

impl MemoryConsumer {
    pub(super) fn new(
        id: u64,
        destination: Destination,
        connection: Arc<ConnectionState>,
        receiver: mpsc::Receiver<WireMessage>,
    ) -> Self {
        Self {
            id,
            destination,
            connection,
            receiver: Mutex::new(Some(receiver)),
            listener: Arc::new(RwLock::new(None)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    fn spawn_delivery(&self, receiver: mpsc::Receiver<WireMessage>) -> Result<(), TransportError> {
        let connection = Arc::clone(&self.connection);
        let listener = Arc::clone(&self.listener);
        let closed = Arc::clone(&self.closed);
        let destination = self.destination.clone();

        thread::Builder::new()
            .name(format!("bus-rpc-delivery-{}", self.id))
            .spawn(move || deliver(&connection, &destination, receiver, &listener, &closed))
            .map(|_| ())
            .map_err(|e| TransportError::Other(format!("failed to spawn delivery thread: {}", e)))
    }
}

fn deliver(
    connection: &ConnectionState,
    destination: &Destination,
    receiver: mpsc::Receiver<WireMessage>,
    listener: &RwLock<Option<Arc<dyn MessageListener>>>,
    closed: &AtomicBool,
) {
    if !connection.wait_started() {
        // The connection closed first; detaching its consumers ends this iterator.
        let undelivered = receiver.iter().collect();
        connection.broker().requeue(destination, undelivered);
        return;
    }

    while let Ok(message) = receiver.recv() {
        if closed.load(Ordering::SeqCst) {
            connection.broker().requeue(destination, vec![message]);
            continue;
        }
        let current = listener
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(current) = current else { continue };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| current.on_message(message)));
        if outcome.is_err() {
            error!(destination = %destination, "message listener panicked");
        }
    }
    debug!(destination = %destination, "delivery stopped");
}

impl Consumer for MemoryConsumer {
    fn destination(&self) -> &Destination {
        &self.destination
    }

    fn set_message_listener(
        &self,
        listener: Arc<dyn MessageListener>,
    ) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::ConsumerClosed);
        }
        self.connection.ensure_open()?;

        *self.listener.write().unwrap_or_else(PoisonError::into_inner) = Some(listener);

        let receiver = self
            .receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match receiver {
            Some(receiver) => self.spawn_delivery(receiver),
            None => Ok(()),
        }
    }

    fn close(&self) -> Result<(), TransportError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        // Detaching drops the broker's sender, which ends the delivery thread.
        self.connection.broker().detach(&self.destination, self.id);
        *self.listener.write().unwrap_or_else(PoisonError::into_inner) = None;

        let undelivered = self
            .receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(receiver) = undelivered {
            let messages = receiver.try_iter().collect();
            self.connection.broker().requeue(&self.destination, messages);
        }
        debug!(destination = %self.destination, consumer = self.id, "consumer closed");
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for MemoryConsumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryConsumer")
            .field("id", &self.id)
            .field("destination", &self.destination)
            .field("closed", &self.is_closed())
            .finish()
    }
}
