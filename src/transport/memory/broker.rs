use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, trace};

use super::connection::{ConnectionState, MemoryConnection};
use crate::endpoint::EndpointKind;
use crate::error::TransportError;
use crate::transport::{Connection, Destination, WireMessage};

/// Shared state of one in-memory broker.
#[derive(Debug)]
pub(super) struct BrokerState {
    name: String,
    running: AtomicBool,
    destinations: Mutex<HashMap<Destination, DestinationState>>,
    connections: Mutex<Vec<Weak<ConnectionState>>>,
}

/// Messages and attached consumers of one destination.
#[derive(Debug, Default)]
struct DestinationState {
    pending: VecDeque<WireMessage>,
    consumers: Vec<ConsumerSlot>,
    next: usize,
}

#[derive(Debug)]
struct ConsumerSlot {
    id: u64,
    tx: mpsc::Sender<WireMessage>,
}

impl BrokerState {
    pub(super) fn new(name: String) -> Self {
        Self {
            name,
            running: AtomicBool::new(false),
            destinations: Mutex::new(HashMap::new()),
            connections: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn name(&self) -> &str {
        &self.name
    }

    pub(super) fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Returns the previous value.
    pub(super) fn set_running(&self, running: bool) -> bool {
        self.running.swap(running, Ordering::SeqCst)
    }

    pub(super) fn connect(self: &Arc<Self>) -> Result<Arc<dyn Connection>, TransportError> {
        if !self.is_running() {
            return Err(TransportError::Unreachable(format!("memory://{}", self.name)));
        }

        let state = Arc::new(ConnectionState::new(Arc::clone(self)));
        let mut connections = self
            .connections
            .lock()
            .map_err(|_| TransportError::LockPoisoned("connect"))?;
        connections.retain(|weak| weak.strong_count() > 0);
        connections.push(Arc::downgrade(&state));
        debug!(broker = %self.name, connection = state.id(), "connection opened");

        Ok(Arc::new(MemoryConnection::new(state)))
    }

    /// Close every live connection and forget all destinations.
    pub(super) fn shutdown(&self) {
        let connections: Vec<_> = self
            .connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .filter_map(|weak| weak.upgrade())
            .collect();

        for connection in connections {
            connection.close();
        }

        self.lock_destinations().clear();
    }

    /// Make a destination known. Named destinations may be declared repeatedly.
    pub(super) fn declare(&self, destination: &Destination) -> Result<(), TransportError> {
        self.try_lock_destinations("declare")?
            .entry(destination.clone())
            .or_default();
        Ok(())
    }

    pub(super) fn remove(&self, destination: &Destination) {
        // Dropping the state drops the consumer senders, ending their delivery threads.
        self.lock_destinations().remove(destination);
    }

    /// Route a sent message to the destination's consumers.
    pub(super) fn route(
        &self,
        destination: &Destination,
        message: WireMessage,
    ) -> Result<(), TransportError> {
        let mut destinations = self.try_lock_destinations("send")?;
        let state = match destinations.get_mut(destination) {
            Some(state) => state,
            None if destination.is_temporary() => {
                return Err(TransportError::DestinationNotFound(destination.to_string()))
            }
            None => destinations.entry(destination.clone()).or_default(),
        };

        match destination.kind() {
            EndpointKind::Queue => state.enqueue(message),
            EndpointKind::Topic => state.publish(message),
        }
        trace!(destination = %destination, "message routed");
        Ok(())
    }

    /// Attach a consumer. Queued messages are handed to it immediately.
    pub(super) fn attach(
        &self,
        destination: &Destination,
        id: u64,
        tx: mpsc::Sender<WireMessage>,
    ) -> Result<(), TransportError> {
        let mut destinations = self.try_lock_destinations("attach")?;
        let state = match destinations.get_mut(destination) {
            Some(state) => state,
            None if destination.is_temporary() => {
                return Err(TransportError::DestinationNotFound(destination.to_string()))
            }
            None => destinations.entry(destination.clone()).or_default(),
        };

        state.consumers.push(ConsumerSlot { id, tx });
        if destination.kind() == EndpointKind::Queue {
            while let Some(message) = state.pending.pop_front() {
                state.enqueue(message);
            }
        }
        Ok(())
    }

    /// Hand messages a closed queue consumer never delivered to the
    /// remaining consumers, or hold them. Topic messages are dropped.
    pub(super) fn requeue(
        &self,
        destination: &Destination,
        messages: Vec<WireMessage>,
    ) {
        if messages.is_empty() || destination.kind() != EndpointKind::Queue {
            return;
        }
        let count = messages.len();
        if let Some(state) = self.lock_destinations().get_mut(destination) {
            for message in messages {
                state.enqueue(message);
            }
            trace!(destination = %destination, count, "undelivered messages requeued");
        }
    }

    pub(super) fn detach(&self, destination: &Destination, id: u64) {
        if let Some(state) = self.lock_destinations().get_mut(destination) {
            state.consumers.retain(|slot| slot.id != id);
        }
    }

    fn try_lock_destinations(
        &self,
        operation: &'static str,
    ) -> Result<MutexGuard<'_, HashMap<Destination, DestinationState>>, TransportError> {
        self.destinations
            .lock()
            .map_err(|_| TransportError::LockPoisoned(operation))
    }

    fn lock_destinations(&self) -> MutexGuard<'_, HashMap<Destination, DestinationState>> {
        self.destinations.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DestinationState {
    /// Hand the message to one consumer, round-robin, or hold it.
    fn enqueue(&mut self, mut message: WireMessage) {
        while !self.consumers.is_empty() {
            let index = self.next % self.consumers.len();
            match self.consumers[index].tx.send(message) {
                Ok(()) => {
                    self.next = index + 1;
                    return;
                }
                Err(mpsc::SendError(returned)) => {
                    self.consumers.remove(index);
                    message = returned;
                }
            }
        }
        self.pending.push_back(message);
    }

    /// Hand a copy of the message to every attached consumer.
    fn publish(&mut self, message: WireMessage) {
        self.consumers
            .retain(|slot| slot.tx.send(message.clone()).is_ok());
    }
}
