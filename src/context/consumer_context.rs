use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use tracing::error;

use super::ConnectionContext;
use crate::transport::Consumer;

/// A [`ConnectionContext`] with a consumer on its destination.
#[derive(Debug, Clone, Default)]
pub struct ConsumerContext {
    context: ConnectionContext,
    consumer: Option<Arc<dyn Consumer>>,
}

impl ConsumerContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn consumer(&self) -> Option<&Arc<dyn Consumer>> {
        self.consumer.as_ref()
    }

    pub fn set_consumer(&mut self, consumer: Option<Arc<dyn Consumer>>) {
        self.consumer = consumer;
    }

    /// Stop delivery to this context's consumer. Failures are logged.
    pub fn close_consumer(&self) {
        if let Some(consumer) = &self.consumer {
            if let Err(e) = consumer.close() {
                error!(destination = %consumer.destination(), error = %e, "failed to close consumer");
            }
        }
    }
}

impl Deref for ConsumerContext {
    type Target = ConnectionContext;

    fn deref(&self) -> &Self::Target {
        &self.context
    }
}

impl DerefMut for ConsumerContext {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.context
    }
}
