use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use super::ConsumerContext;
use crate::transport::{MessageListener, WireMessage};

/// Requester side of a request/response exchange.
///
/// The inner [`ConsumerContext`] points at the temporary reply queue. Only
/// the side that initiated the exchange fills in the request and listener.
#[derive(Clone, Default)]
pub struct RpcContext {
    context: ConsumerContext,
    request_message: Option<WireMessage>,
    response_listener: Option<Arc<dyn MessageListener>>,
}

impl RpcContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// The request as it was sent, including its assigned message id.
    pub fn request_message(&self) -> Option<&WireMessage> {
        self.request_message.as_ref()
    }

    pub fn set_request_message(&mut self, message: Option<WireMessage>) {
        self.request_message = message;
    }

    pub fn response_listener(&self) -> Option<&Arc<dyn MessageListener>> {
        self.response_listener.as_ref()
    }

    pub fn set_response_listener(&mut self, listener: Option<Arc<dyn MessageListener>>) {
        self.response_listener = listener;
    }
}

impl Deref for RpcContext {
    type Target = ConsumerContext;

    fn deref(&self) -> &Self::Target {
        &self.context
    }
}

impl DerefMut for RpcContext {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.context
    }
}

impl fmt::Debug for RpcContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcContext")
            .field("context", &self.context)
            .field("request_message", &self.request_message)
            .field("has_response_listener", &self.response_listener.is_some())
            .finish()
    }
}
