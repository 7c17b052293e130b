use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::context::{ConnectionContext, ConsumerContext, ProducerContext, RpcContext};
use crate::error::{MessagingError, Result};
use crate::listener::{BasicMessageListener, ResponseFuture};
use crate::message::{Envelope, MessageId};
use crate::transport::{MessageListener, WireMessage};

/// Sends envelopes and wires listeners onto contexts.
///
/// Holds no state; one processor can serve any number of contexts.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageProcessor;

impl MessageProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Encode `envelope` into a wire message.
    ///
    /// The envelope's correlation id, if any, becomes the wire correlation id.
    pub fn create_message<E: Envelope>(
        &self,
        context: &ConnectionContext,
        envelope: &E,
    ) -> Result<WireMessage> {
        if context.session().is_none() {
            return Err(MessagingError::Send("context had no session".into()));
        }
        let mut message = WireMessage::text(envelope.to_json()?);
        message.set_correlation_id(envelope.correlation_id().cloned());
        Ok(message)
    }

    /// Send `envelope` through the context's producer.
    ///
    /// Any message id already on the envelope is discarded; the id assigned
    /// by the transport is written back to the envelope and returned.
    pub fn send<E: Envelope>(&self, context: &ProducerContext, envelope: &mut E) -> Result<MessageId> {
        self.send_with_headers(context, envelope, None)
    }

    /// [`send`](Self::send), attaching `headers` as transport metadata.
    pub fn send_with_headers<E: Envelope>(
        &self,
        context: &ProducerContext,
        envelope: &mut E,
        headers: Option<&HashMap<String, String>>,
    ) -> Result<MessageId> {
        let mut message = self.create_message(context, envelope)?;
        apply_headers(&mut message, headers);
        self.transmit(context, envelope, &mut message)
    }

    /// Register `listener` on the context's consumer.
    ///
    /// The listener is given the context first so it can close its own
    /// consumer. Delivery happens on the transport's threads.
    pub fn listen<T: Envelope>(
        &self,
        context: &ConsumerContext,
        listener: Arc<BasicMessageListener<T>>,
    ) -> Result<()> {
        let consumer = context
            .consumer()
            .ok_or_else(|| MessagingError::missing("consumer"))?;
        listener.set_consumer_context(context.clone());
        consumer
            .set_message_listener(listener)
            .map_err(MessagingError::Connection)?;
        debug!(destination = %consumer.destination(), "listener registered");
        Ok(())
    }

    /// Send a request and route its response to `listener`.
    ///
    /// The temporary reply queue and its consumer are set up and listening
    /// before the request leaves, so a fast responder cannot be missed.
    pub fn send_and_listen<E, T>(
        &self,
        context: &ProducerContext,
        envelope: &mut E,
        listener: Arc<BasicMessageListener<T>>,
    ) -> Result<RpcContext>
    where
        E: Envelope,
        T: Envelope,
    {
        self.send_and_listen_with_headers(context, envelope, listener, None)
    }

    /// [`send_and_listen`](Self::send_and_listen), attaching `headers`.
    pub fn send_and_listen_with_headers<E, T>(
        &self,
        context: &ProducerContext,
        envelope: &mut E,
        listener: Arc<BasicMessageListener<T>>,
        headers: Option<&HashMap<String, String>>,
    ) -> Result<RpcContext>
    where
        E: Envelope,
        T: Envelope,
    {
        let mut message = self.create_message(context, envelope)?;
        apply_headers(&mut message, headers);

        let session = context
            .session()
            .ok_or_else(|| MessagingError::Send("context had no session".into()))?;
        let reply_to = session
            .create_temporary_queue()
            .map_err(MessagingError::from_destination)?;
        let consumer = session
            .create_consumer(&reply_to)
            .map_err(MessagingError::Connection)?;

        let mut rpc = RpcContext::new();
        rpc.copy_from(context);
        rpc.set_destination(Some(reply_to.clone()));
        rpc.set_consumer(Some(consumer));
        self.listen(&rpc, Arc::clone(&listener))?;
        let listener: Arc<dyn MessageListener> = listener;
        rpc.set_response_listener(Some(listener));

        message.set_reply_to(Some(reply_to));
        if let Err(e) = self.transmit(context, envelope, &mut message) {
            rpc.close_consumer();
            return Err(e);
        }
        rpc.set_request_message(Some(message));
        Ok(rpc)
    }

    /// Send a request and return a future for its `R` response.
    pub fn send_rpc<E, R>(&self, context: &ProducerContext, envelope: &mut E) -> Result<ResponseFuture<R>>
    where
        E: Envelope,
        R: Envelope,
    {
        self.send_rpc_with_headers(context, envelope, None)
    }

    /// [`send_rpc`](Self::send_rpc), attaching `headers`.
    pub fn send_rpc_with_headers<E, R>(
        &self,
        context: &ProducerContext,
        envelope: &mut E,
        headers: Option<&HashMap<String, String>>,
    ) -> Result<ResponseFuture<R>>
    where
        E: Envelope,
        R: Envelope,
    {
        let future = ResponseFuture::new();
        self.send_and_listen_with_headers(context, envelope, future.listener(), headers)?;
        Ok(future)
    }

    fn transmit<E: Envelope>(
        &self,
        context: &ProducerContext,
        envelope: &mut E,
        message: &mut WireMessage,
    ) -> Result<MessageId> {
        let producer = context
            .producer()
            .ok_or_else(|| MessagingError::Send("context had no producer".into()))?;

        envelope.basic_mut().clear_message_id();
        let message_id = producer.send(message).map_err(MessagingError::from_send)?;
        envelope.set_message_id(Some(message_id.clone()));

        debug!(destination = %producer.destination(), message_id = %message_id, "message sent");
        Ok(message_id)
    }
}

fn apply_headers(message: &mut WireMessage, headers: Option<&HashMap<String, String>>) {
    for (name, value) in headers.into_iter().flatten() {
        message.set_header(name.clone(), value.clone());
    }
}
