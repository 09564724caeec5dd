//! Outbound broker envelope.

/// Header carrying the correlation id of the message that caused this one.
pub const CORRELATION_HEADER: &str = "correlation-id";

/// A message as handed to a broker channel: an id, a routing type, opaque
/// payload bytes, and string headers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    /// Unique identifier for this event
    pub id: String,
    /// Routing type (e.g., "OrderShipped")
    pub event_type: String,
    /// Serialized payload
    pub payload: Vec<u8>,
    /// Headers in insertion order
    pub headers: Vec<(String, String)>,
}

impl Event {
    pub fn new(id: impl Into<String>, event_type: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            event_type: event_type.into(),
            payload,
            headers: Vec::new(),
        }
    }

    /// Create an event with a bitcode-serialized payload.
    pub fn encode<T: serde::Serialize>(
        id: impl Into<String>,
        event_type: impl Into<String>,
        payload: &T,
    ) -> Result<Self, bitcode::Error> {
        let bytes = bitcode::serialize(payload)?;
        Ok(Self::new(id, event_type, bytes))
    }

    /// Decode a bitcode payload.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, bitcode::Error> {
        bitcode::deserialize(&self.payload)
    }

    pub fn with_string_payload(
        id: impl Into<String>,
        event_type: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self::new(id, event_type, payload.into().into_bytes())
    }

    /// Add a header. Later values for the same key shadow earlier ones.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn with_correlation_id(self, correlation_id: impl Into<String>) -> Self {
        self.with_header(CORRELATION_HEADER, correlation_id)
    }

    /// Most recent value for `key`.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.header(CORRELATION_HEADER)
    }

    /// The payload as a string, if it is valid UTF-8.
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}
