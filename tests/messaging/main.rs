//! Messaging integration tests over the in-memory broker.

mod support;
mod envelopes;
mod rpc;
mod send_listen;
