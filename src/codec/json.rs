//! JSON codec using `serde_json`.

use crate::error::Result;

/// JSON codec for text-frame payloads.
pub struct JsonCodec;

impl JsonCodec {
    /// Encode a value as compact JSON text.
    #[inline]
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<String> {
        Ok(serde_json::to_string(value)?)
    }

    /// Decode JSON text into a value.
    ///
    /// # Errors
    ///
    /// Returns error if the text is not valid JSON for type T.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(text: &str) -> Result<T> {
        Ok(serde_json::from_str(text)?)
    }
}
