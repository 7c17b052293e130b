//! Request/response messaging over queue and topic brokers.
//!
//! The bus underneath only offers fire-and-forget delivery. This crate adds
//! typed envelopes and three ways to use them:
//!
//! - **send**: fire-and-forget to a queue or topic
//! - **listen**: dispatch every arriving envelope to a callback
//! - **send_rpc**: send a request and block on a [`ResponseFuture`] for the reply
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use bus_rpc::transport::memory::InMemoryBroker;
//! use bus_rpc::{
//!     BasicMessage, BasicMessageListener, ConnectionContextFactory, Endpoint, Envelope,
//!     MessageProcessor,
//! };
//!
//! let broker = InMemoryBroker::new("lib-doc");
//! broker.start().unwrap();
//! let factory = ConnectionContextFactory::new(&broker.connection_url()).unwrap();
//! let processor = MessageProcessor::new();
//!
//! // Server: answer every request on the "echo" queue.
//! let server = factory.create_consumer_context(&Endpoint::queue("echo")).unwrap();
//! let echo = BasicMessageListener::rpc(|req: BasicMessage| {
//!     Ok::<_, String>(BasicMessage::new(format!("echo:{}", req.body())))
//! });
//! processor.listen(&server, Arc::new(echo)).unwrap();
//!
//! // Client: send a request and wait for the answer.
//! let client = factory.create_producer_context(&Endpoint::queue("echo")).unwrap();
//! let mut request = BasicMessage::new("hi");
//! let future = processor.send_rpc::<_, BasicMessage>(&client, &mut request).unwrap();
//! let response = future.get_timeout(Duration::from_secs(5)).unwrap();
//! assert_eq!(response.body(), "echo:hi");
//!
//! factory.close();
//! ```
//!
//! Brokers are reached through the [`transport`] traits. The `memory`
//! feature (on by default) provides an in-process broker addressed as
//! `memory://<name>`.

extern crate self as bus_rpc;

mod context;
mod endpoint;
mod error;
mod factory;
mod listener;
mod message;
mod processor;
pub mod transport;

pub use context::{ConnectionContext, ConsumerContext, ProducerContext, RpcContext};
pub use endpoint::{Endpoint, EndpointKind};
pub use error::{MessagingError, Result, TransportError};
pub use factory::ConnectionContextFactory;
pub use listener::{BasicMessageListener, ResponseFuture};
pub use message::{BasicMessage, Envelope, MessageId, ObjectMessage};
pub use processor::{MessageProcessor, SimpleMessageProcessor};

/// Derive [`Envelope`] for a struct that embeds a [`BasicMessage`].
pub use bus_rpc_macros::Envelope;
