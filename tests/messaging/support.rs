//! Shared fixtures: a per-test broker and a typed request/response envelope.

use std::sync::{mpsc, Arc, Mutex, Weak};
use std::thread;
use std::time::{Duration, Instant};

use bus_rpc::transport::memory::InMemoryBroker;
use bus_rpc::{BasicMessage, BasicMessageListener, ConnectionContextFactory, Envelope};
use serde::{Deserialize, Serialize};

/// Envelope with one field of its own on top of the basic message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Envelope)]
pub struct SpecificMessage {
    #[serde(flatten)]
    pub basic: BasicMessage,
    pub specific: String,
}

impl SpecificMessage {
    pub fn new(basic: BasicMessage, specific: impl Into<String>) -> Self {
        Self {
            basic,
            specific: specific.into(),
        }
    }
}

pub struct Harness {
    pub broker: InMemoryBroker,
    pub factory: ConnectionContextFactory,
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.factory.close();
    }
}

/// Start a uniquely named broker and a factory connected to it.
pub fn harness() -> Harness {
    init_tracing();
    let broker = InMemoryBroker::new(format!("it-{}", uuid::Uuid::new_v4()));
    broker.start().unwrap();
    let factory = ConnectionContextFactory::new(&broker.connection_url()).unwrap();
    Harness { broker, factory }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A listener that forwards every envelope into a channel.
pub fn collecting<T: Envelope>() -> (Arc<BasicMessageListener<T>>, mpsc::Receiver<T>) {
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    let listener = BasicMessageListener::new(move |msg: T| {
        let _ = tx.lock().unwrap().send(msg);
    });
    (Arc::new(listener), rx)
}

pub const WAIT: Duration = Duration::from_secs(5);

/// Wait for the last strong reference behind `weak` to go away.
///
/// Delivery threads may hold a listener for the rest of the callback that
/// closed it, so this polls briefly.
pub fn released<T: ?Sized>(weak: &Weak<T>) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while weak.upgrade().is_some() {
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(10));
    }
    true
}
