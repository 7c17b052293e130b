//! Listener framework.
//!
//! Every listener runs the same steps on delivery: decode the wire text
//! into the envelope type, copy the message id, correlation id and headers
//! from the wire metadata, then dispatch. Dispatch depends on how the
//! listener was built:
//!
//! | Constructor | Dispatch |
//! |---|---|
//! | [`BasicMessageListener::new`] | call the callback, keep listening |
//! | [`BasicMessageListener::rpc`] | compute a response, send it to the request's reply-to |
//! | [`ResponseFuture::new`] | resolve the future once, then close the consumer |
//!
//! Listeners are called on the transport's delivery thread. Failures there
//! are logged, never raised.

mod basic;
mod future;

pub use basic::BasicMessageListener;
pub use future::ResponseFuture;
