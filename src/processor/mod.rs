//! Message processor: the send and listen verbs.
//!
//! ```text
//! send            envelope ──► producer
//! listen          consumer ──► listener
//! send_and_listen temp queue + consumer + listener, then envelope (reply-to = temp queue) ──► producer
//! send_rpc        send_and_listen with a ResponseFuture's listener
//! ```

mod message_processor;
mod simple;

pub use message_processor::MessageProcessor;
pub use simple::SimpleMessageProcessor;
