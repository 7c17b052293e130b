use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use super::ConnectionContext;
use crate::transport::Producer;

/// A [`ConnectionContext`] with a producer on its destination.
#[derive(Debug, Clone, Default)]
pub struct ProducerContext {
    context: ConnectionContext,
    producer: Option<Arc<dyn Producer>>,
}

impl ProducerContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn producer(&self) -> Option<&Arc<dyn Producer>> {
        self.producer.as_ref()
    }

    pub fn set_producer(&mut self, producer: Option<Arc<dyn Producer>>) {
        self.producer = producer;
    }
}

impl Deref for ProducerContext {
    type Target = ConnectionContext;

    fn deref(&self) -> &Self::Target {
        &self.context
    }
}

impl DerefMut for ProducerContext {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.context
    }
}
