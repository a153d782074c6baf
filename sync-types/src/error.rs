//! Error types for the boardsync wire format.

use thiserror::Error;

/// Errors that can occur while parsing or producing protocol frames.
#[derive(Debug, Error)]
pub enum WireError {
    /// The frame is not valid JSON at all.
    #[error("malformed JSON: {0}")]
    MalformedJson(#[source] serde_json::Error),

    /// The frame is valid JSON but not an object.
    #[error("message is not a JSON object")]
    NotAnObject,

    /// The object has no `type` field.
    #[error("message has no `type` discriminant")]
    MissingType,

    /// The `type` field is present but not a string.
    #[error("message `type` discriminant is not a string")]
    InvalidType,

    /// A recognized message type is missing a required field or has a
    /// field of the wrong shape.
    #[error("invalid {kind} message: {source}")]
    InvalidBody {
        /// The message discriminant.
        kind: String,
        /// Underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },

    /// Outbound serialization failed.
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),
}

impl WireError {
    /// True when the payload could not be parsed as JSON.
    ///
    /// These are reported as connection-level protocol errors; every other
    /// variant concerns a single well-formed but unusable message.
    pub fn is_malformed_json(&self) -> bool {
        matches!(self, Self::MalformedJson(_))
    }
}
