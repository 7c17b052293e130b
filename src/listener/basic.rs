use std::fmt::{self, Display};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, error, warn};

use super::future::FutureSlot;
use crate::context::ConsumerContext;
use crate::error::{MessagingError, Result};
use crate::message::{Envelope, MessageId};
use crate::transport::{MessageListener, WireMessage};

type Callback<T> = Box<dyn Fn(T) + Send + Sync>;
type Responder<T> = Box<dyn Fn(T) -> Result<WireMessage, String> + Send + Sync>;

enum Behavior<T> {
    Forward(Callback<T>),
    Resolve(Arc<FutureSlot<T>>),
    Reply(Responder<T>),
}

/// Receives typed envelopes from a consumer.
///
/// Register it with [`MessageProcessor::listen`](crate::MessageProcessor::listen),
/// which also hands it the consumer context it listens on.
pub struct BasicMessageListener<T: Envelope> {
    context: RwLock<Option<ConsumerContext>>,
    behavior: Behavior<T>,
}

impl<T: Envelope> BasicMessageListener<T> {
    /// Call `callback` with every decoded envelope.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self::with_behavior(Behavior::Forward(Box::new(callback)))
    }

    /// Answer each request with `handler`'s response.
    ///
    /// The response goes to the request's reply-to destination. It carries
    /// the request's correlation id when the request had one, otherwise the
    /// response's own. If `handler` fails, nothing is sent.
    pub fn rpc<R, E, F>(handler: F) -> Self
    where
        R: Envelope,
        E: Display + 'static,
        F: Fn(T) -> std::result::Result<R, E> + Send + Sync + 'static,
    {
        let responder = move |request: T| -> Result<WireMessage, String> {
            let response = handler(request).map_err(|e| e.to_string())?;
            let mut wire = WireMessage::text(response.to_json().map_err(|e| e.to_string())?);
            wire.set_correlation_id(response.correlation_id().cloned());
            Ok(wire)
        };
        Self::with_behavior(Behavior::Reply(Box::new(responder)))
    }

    pub(crate) fn resolving(slot: Arc<FutureSlot<T>>) -> Self {
        Self::with_behavior(Behavior::Resolve(slot))
    }

    fn with_behavior(behavior: Behavior<T>) -> Self {
        Self {
            context: RwLock::new(None),
            behavior,
        }
    }

    /// The context whose consumer delivers to this listener.
    pub fn consumer_context(&self) -> Option<ConsumerContext> {
        self.context
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_consumer_context(&self, context: ConsumerContext) {
        *self.context.write().unwrap_or_else(PoisonError::into_inner) = Some(context);
    }

    /// Close the consumer this listener is registered on, if known.
    pub fn close_consumer(&self) {
        if let Some(context) = self.consumer_context() {
            context.close_consumer();
        }
    }

    fn decode(message: &WireMessage) -> Result<T> {
        let mut envelope = T::from_json(message.body())?;
        envelope.set_message_id(message.message_id().cloned());
        envelope.set_correlation_id(message.correlation_id().cloned());
        if !message.headers().is_empty() {
            envelope.basic_mut().set_headers(Some(message.headers().clone()));
        }
        Ok(envelope)
    }

    fn resolve(&self, slot: &FutureSlot<T>, outcome: Result<T>, message_id: Option<&MessageId>) {
        if slot.resolve(outcome, || self.close_consumer()) {
            debug!(message_id = ?message_id, "response future resolved");
        } else {
            warn!(message_id = ?message_id, "response future already finished, dropping message");
        }
    }

    fn reply(&self, responder: &Responder<T>, request: T, message: &WireMessage) {
        let Some(reply_to) = message.reply_to() else {
            warn!(message_id = ?message.message_id(), "request has no reply-to, dropping it");
            return;
        };

        let mut response = match responder(request) {
            Ok(response) => response,
            Err(e) => {
                error!(message_id = ?message.message_id(), error = %e, "request handler failed, no response sent");
                return;
            }
        };
        if let Some(correlation_id) = message.correlation_id() {
            response.set_correlation_id(Some(correlation_id.clone()));
        }

        let Some(session) = self.consumer_context().and_then(|c| c.session().cloned()) else {
            error!(reply_to = %reply_to, "listener has no session to reply on");
            return;
        };
        let sent = session
            .create_producer(reply_to)
            .and_then(|producer| producer.send(&mut response));
        match sent {
            Ok(id) => debug!(reply_to = %reply_to, message_id = %id, "response sent"),
            Err(e) => error!(reply_to = %reply_to, error = %MessagingError::from_send(e), "failed to send response"),
        }
    }
}

impl<T: Envelope> MessageListener for BasicMessageListener<T> {
    fn on_message(&self, message: WireMessage) {
        let decoded = Self::decode(&message);

        if let Behavior::Resolve(slot) = &self.behavior {
            self.resolve(slot, decoded, message.message_id());
            return;
        }

        let envelope = match decoded {
            Ok(envelope) => envelope,
            Err(e) => {
                error!(message_id = ?message.message_id(), error = %e, "dropping undecodable message");
                return;
            }
        };
        debug!(message_id = ?message.message_id(), "dispatching message");

        // Callbacks run on the transport's delivery thread and must not unwind it.
        let dispatched = panic::catch_unwind(AssertUnwindSafe(|| match &self.behavior {
            Behavior::Forward(callback) => callback(envelope),
            Behavior::Reply(responder) => self.reply(responder, envelope, &message),
            Behavior::Resolve(_) => {}
        }));
        if dispatched.is_err() {
            error!(message_id = ?message.message_id(), "message callback panicked, message dropped");
        }
    }
}

impl<T: Envelope> fmt::Debug for BasicMessageListener<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let behavior = match self.behavior {
            Behavior::Forward(_) => "forward",
            Behavior::Resolve(_) => "resolve",
            Behavior::Reply(_) => "reply",
        };
        f.debug_struct("BasicMessageListener")
            .field("behavior", &behavior)
            .field("context", &self.consumer_context())
            .finish()
    }
}
