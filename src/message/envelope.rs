use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{BasicMessage, MessageId};
use crate::error::{MessagingError, Result};

/// A typed message that can travel over the bus.
///
/// Implementors embed a [`BasicMessage`] and hand it out through
/// [`basic`](Envelope::basic) / [`basic_mut`](Envelope::basic_mut); every
/// other method is provided. Use `#[derive(Envelope)]` rather than writing
/// the two accessors by hand.
///
/// ## Example
///
/// ```
/// use bus_rpc::{BasicMessage, Envelope};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Debug, Serialize, Deserialize, Envelope)]
/// struct Greeting {
///     #[serde(flatten)]
///     basic: BasicMessage,
///     language: String,
/// }
///
/// let greeting = Greeting { basic: BasicMessage::new("hello"), language: "en".into() };
/// let json = greeting.to_json().unwrap();
/// assert_eq!(json, r#"{"message":"hello","language":"en"}"#);
///
/// let decoded = Greeting::from_json(&json).unwrap();
/// assert_eq!(decoded.body(), "hello");
/// assert_eq!(decoded.language, "en");
/// ```
pub trait Envelope: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// The embedded basic message.
    fn basic(&self) -> &BasicMessage;

    /// Mutable access to the embedded basic message.
    fn basic_mut(&mut self) -> &mut BasicMessage;

    fn message_id(&self) -> Option<&MessageId> {
        self.basic().message_id()
    }

    fn set_message_id(&mut self, message_id: Option<MessageId>) {
        self.basic_mut().set_message_id(message_id);
    }

    fn correlation_id(&self) -> Option<&MessageId> {
        self.basic().correlation_id()
    }

    /// Correlate this message with an earlier one. Must be set before sending.
    fn set_correlation_id(&mut self, correlation_id: Option<MessageId>) {
        self.basic_mut().set_correlation_id(correlation_id);
    }

    fn body(&self) -> &str {
        self.basic().body()
    }

    fn details(&self) -> Option<&HashMap<String, String>> {
        self.basic().details()
    }

    fn headers(&self) -> Option<&HashMap<String, String>> {
        self.basic().headers()
    }

    /// Encode this envelope as the JSON text carried on the wire.
    fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| MessagingError::Encode(e.to_string()))
    }

    /// Decode an envelope from JSON text. Ids and headers are left empty.
    fn from_json(json: &str) -> Result<Self>
    where
        Self: Sized,
    {
        Ok(serde_json::from_str(json)?)
    }
}
