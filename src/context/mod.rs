//! Connection contexts.
//!
//! A context bundles what one flow needs to talk to one endpoint:
//!
//! ```text
//! ConnectionContext   connection ─► session ─► destination
//! ProducerContext     ConnectionContext + producer
//! ConsumerContext     ConnectionContext + consumer
//! RpcContext          ConsumerContext (reply queue) + request + response listener
//! ```
//!
//! Contexts are filled in step by step by the
//! [`ConnectionContextFactory`](crate::ConnectionContextFactory). The
//! connection may be shared with other contexts made by the same factory;
//! the session, destination and producer or consumer belong to one context.

mod connection_context;
mod consumer_context;
mod producer_context;
mod rpc_context;

pub use connection_context::ConnectionContext;
pub use consumer_context::ConsumerContext;
pub use producer_context::ProducerContext;
pub use rpc_context::RpcContext;
