use std::collections::HashMap;
use std::sync::Arc;

use super::MessageProcessor;
use crate::context::{ConsumerContext, ProducerContext, RpcContext};
use crate::error::Result;
use crate::listener::{BasicMessageListener, ResponseFuture};
use crate::message::{Envelope, MessageId};

/// A [`MessageProcessor`] bound to one consumer context and one producer
/// context, for services that listen on one endpoint and send on another.
#[derive(Debug, Clone)]
pub struct SimpleMessageProcessor {
    processor: MessageProcessor,
    consumer_context: ConsumerContext,
    producer_context: ProducerContext,
}

impl SimpleMessageProcessor {
    pub fn new(consumer_context: ConsumerContext, producer_context: ProducerContext) -> Self {
        Self {
            processor: MessageProcessor::new(),
            consumer_context,
            producer_context,
        }
    }

    pub fn consumer_context(&self) -> &ConsumerContext {
        &self.consumer_context
    }

    pub fn producer_context(&self) -> &ProducerContext {
        &self.producer_context
    }

    pub fn listen<T: Envelope>(&self, listener: Arc<BasicMessageListener<T>>) -> Result<()> {
        self.processor.listen(&self.consumer_context, listener)
    }

    pub fn send<E: Envelope>(&self, envelope: &mut E) -> Result<MessageId> {
        self.processor.send(&self.producer_context, envelope)
    }

    pub fn send_with_headers<E: Envelope>(
        &self,
        envelope: &mut E,
        headers: Option<&HashMap<String, String>>,
    ) -> Result<MessageId> {
        self.processor
            .send_with_headers(&self.producer_context, envelope, headers)
    }

    pub fn send_and_listen<E: Envelope, T: Envelope>(
        &self,
        envelope: &mut E,
        listener: Arc<BasicMessageListener<T>>,
    ) -> Result<RpcContext> {
        self.processor
            .send_and_listen(&self.producer_context, envelope, listener)
    }

    pub fn send_rpc<E: Envelope, R: Envelope>(&self, envelope: &mut E) -> Result<ResponseFuture<R>> {
        self.processor.send_rpc(&self.producer_context, envelope)
    }
}
