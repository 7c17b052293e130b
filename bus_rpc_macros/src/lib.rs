mod envelope;

use proc_macro::TokenStream;

/// Derive macro that implements `bus_rpc::Envelope` for a message struct.
///
/// The struct must embed a `bus_rpc::BasicMessage`, normally with
/// `#[serde(flatten)]` so the body and details sit next to the struct's own
/// fields in the encoded JSON.
///
/// # Usage
///
/// ```ignore
/// #[derive(Clone, Debug, Serialize, Deserialize, Envelope)]
/// pub struct SpecificMessage {
///     #[serde(flatten)]
///     basic: BasicMessage,
///     specific: String,
/// }
/// ```
///
/// The embedded field is found by type. Use `#[envelope(basic = "field")]`
/// when the struct holds more than one `BasicMessage`:
///
/// ```ignore
/// #[derive(Clone, Debug, Serialize, Deserialize, Envelope)]
/// #[envelope(basic = "inner")]
/// pub struct Wrapped {
///     #[serde(flatten)]
///     inner: BasicMessage,
///     #[serde(skip)]
///     previous: BasicMessage,
/// }
/// ```
#[proc_macro_derive(Envelope, attributes(envelope))]
pub fn derive_envelope(input: TokenStream) -> TokenStream {
    envelope::derive_envelope(input)
}
