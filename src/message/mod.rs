//! Typed message envelopes.
//!
//! Every message that crosses the bus is an [`Envelope`]: a struct that
//! embeds a [`BasicMessage`] (body text plus optional details) and may add
//! its own fields. The envelope is encoded to JSON text for the wire. The
//! message id, correlation id and headers never enter the JSON; they travel
//! as transport metadata and are filled back in on the receiving side.
//!
//! ```text
//! ┌──────────────────────────── wire message ────────────────────────────┐
//! │ message-id │ correlation-id │ reply-to │ headers │ text (JSON body)  │
//! └──────────────────────────────────────────────────────────────────────┘
//!                                                        │
//!                                     {"message": "...", "details": {...},
//!                                      ...fields of the concrete type}
//! ```

mod basic_message;
mod envelope;
mod message_id;
mod object_message;

pub use basic_message::BasicMessage;
pub use envelope::Envelope;
pub use message_id::MessageId;
pub use object_message::ObjectMessage;
