use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::basic_message::write_envelope;
use super::{BasicMessage, Envelope};
use crate::error::{MessagingError, Result};

/// A message whose body is an arbitrary serialised object.
///
/// [`ObjectMessage::new`] stores the object as JSON text in the body;
/// [`ObjectMessage::compact`] stores it as base64-encoded `bitcode` bytes for
/// payloads that are large or not naturally JSON. The receiver decodes with
/// the matching [`object`](ObjectMessage::object) or
/// [`compact_object`](ObjectMessage::compact_object).
///
/// ## Example
///
/// ```
/// use bus_rpc::ObjectMessage;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, PartialEq, Serialize, Deserialize)]
/// struct Reading { sensor: String, value: f64 }
///
/// let reading = Reading { sensor: "t1".into(), value: 21.5 };
/// let msg = ObjectMessage::new(&reading).unwrap();
/// assert_eq!(msg.object::<Reading>().unwrap(), reading);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, crate::Envelope)]
pub struct ObjectMessage {
    #[serde(flatten)]
    basic: BasicMessage,
}

impl ObjectMessage {
    /// Wrap an object, encoded as JSON text.
    pub fn new<T: Serialize>(object: &T) -> Result<Self> {
        let body = serde_json::to_string(object).map_err(|e| MessagingError::Encode(e.to_string()))?;
        Ok(Self {
            basic: BasicMessage::new(body),
        })
    }

    /// Wrap an object, encoded as base64 `bitcode` bytes.
    pub fn compact<T: Serialize>(object: &T) -> Result<Self> {
        let bytes = bitcode::serialize(object).map_err(|e| MessagingError::Encode(e.to_string()))?;
        Ok(Self {
            basic: BasicMessage::new(STANDARD.encode(bytes)),
        })
    }

    /// Decode the JSON-encoded object.
    pub fn object<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(self.basic.body())?)
    }

    /// Decode the compact-encoded object.
    pub fn compact_object<T: DeserializeOwned>(&self) -> Result<T> {
        let bytes = STANDARD
            .decode(self.basic.body())
            .map_err(|e| MessagingError::Decode(e.to_string()))?;
        bitcode::deserialize(&bytes).map_err(|e| MessagingError::Decode(e.to_string()))
    }
}

impl fmt::Display for ObjectMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_envelope(f, "ObjectMessage", self)
    }
}
