//! Options and results of object retrieval.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::Serialize;

use crate::payload::ByteStream;

/// Alternate representation of a Drive resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Alt {
    /// Raw object content instead of metadata.
    Media,
}

/// How the response body is handed back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    Json,
    ArrayBuffer,
    Blob,
    Stream,
}

impl FromStr for ResponseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "arraybuffer" => Ok(Self::ArrayBuffer),
            "blob" => Ok(Self::Blob),
            "stream" => Ok(Self::Stream),
            other => Err(format!(
                "unknown response type '{}' (expected json, arraybuffer, blob or stream)",
                other
            )),
        }
    }
}

/// Optional knobs merged onto the `{ fileId }` retrieval filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GetOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<Alt>,
    #[serde(skip)]
    pub response_type: Option<ResponseType>,
}

impl GetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request raw content (`alt=media`).
    pub fn media() -> Self {
        Self {
            alt: Some(Alt::Media),
            ..Self::default()
        }
    }

    pub fn with_fields(mut self, fields: impl Into<String>) -> Self {
        self.fields = Some(fields.into());
        self
    }

    pub fn with_response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = Some(response_type);
        self
    }

    /// The representation the response will be decoded into. An explicit
    /// response type wins; otherwise media is returned as bytes and
    /// metadata as JSON.
    pub fn representation(&self) -> ResponseType {
        match (self.response_type, self.alt) {
            (Some(response_type), _) => response_type,
            (None, Some(Alt::Media)) => ResponseType::ArrayBuffer,
            (None, None) => ResponseType::Json,
        }
    }
}

/// The payload returned by a successful retrieval.
pub enum Retrieved {
    Json(serde_json::Value),
    Bytes(Bytes),
    Stream(ByteStream),
}

impl Retrieved {
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }
}

impl fmt::Debug for Retrieved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}
