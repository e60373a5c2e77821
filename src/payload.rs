//! Normalization of upload inputs into a single streamed body.

use std::fmt;
use std::path::Path;

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use reqwest::multipart::Part;
use reqwest::Body;
use serde_json::{Map, Value};
use tokio_util::io::ReaderStream;

use crate::error::Result;

/// Default content type of the media part.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// A finite stream of byte chunks.
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// An already-open readable stream, optionally tagged with its content type.
pub struct PayloadStream {
    inner: ByteStream,
    mime_type: Option<String>,
}

/// An object carrying its bytes in a `buffer` or `data` field, plus any
/// other attributes the caller attached to it.
#[derive(Debug, Clone, Default)]
pub struct PayloadObject {
    pub buffer: Option<Bytes>,
    pub data: Option<Bytes>,
    pub attributes: Map<String, Value>,
}

impl PayloadObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buffer(mut self, buffer: impl Into<Bytes>) -> Self {
        self.buffer = Some(buffer.into());
        self
    }

    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// A file input accepted by [`crate::DriveClient::upload`].
pub enum Payload {
    Stream(PayloadStream),
    Bytes(Bytes),
    Object(PayloadObject),
}

impl Payload {
    /// Wrap an already-open stream. It is passed through without being read.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = std::io::Result<Bytes>> + Send + 'static,
    {
        Self::Stream(PayloadStream {
            inner: stream.boxed(),
            mime_type: None,
        })
    }

    /// Open a local file as a stream payload, guessing its content type
    /// from the extension.
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = tokio::fs::File::open(path).await?;
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string();
        Ok(Self::Stream(PayloadStream {
            inner: ReaderStream::new(file).boxed(),
            mime_type: Some(mime_type),
        }))
    }

    /// The buffered bytes this payload would upload, if any.
    ///
    /// Streams have no buffered source. For the other shapes the first
    /// non-empty of {raw bytes, `buffer`, `data`} wins.
    pub fn source(&self) -> Option<&Bytes> {
        match self {
            Self::Stream(_) => None,
            Self::Bytes(bytes) => Some(bytes).filter(|b| !b.is_empty()),
            Self::Object(object) => [object.buffer.as_ref(), object.data.as_ref()]
                .into_iter()
                .flatten()
                .find(|b| !b.is_empty()),
        }
    }

    /// Whether the payload has something to upload. Streams are trusted
    /// without being read.
    pub fn has_content(&self) -> bool {
        matches!(self, Self::Stream(_)) || self.source().is_some()
    }

    /// Content type for the media part. A declared type that does not
    /// parse as a MIME type is replaced by `application/octet-stream`.
    pub fn mime_type(&self) -> String {
        let declared = match self {
            Self::Stream(stream) => stream.mime_type.clone(),
            Self::Bytes(_) => None,
            Self::Object(object) => ["mimetype", "mimeType"]
                .iter()
                .find_map(|key| object.attributes.get(*key))
                .and_then(Value::as_str)
                .map(str::to_string),
        };
        declared
            .filter(|m| m.parse::<mime_guess::Mime>().is_ok())
            .unwrap_or_else(|| OCTET_STREAM.to_string())
    }

    /// Convert into an HTTP body. Returns `None` when there is no binary
    /// source to upload.
    pub fn into_body(self) -> Option<Body> {
        match self {
            Self::Stream(stream) => Some(Body::wrap_stream(stream.inner)),
            other => other.source().cloned().map(Body::from),
        }
    }

    /// Build the multipart media part for an upload.
    pub fn into_part(self, file_name: &str) -> Option<reqwest::Result<Part>> {
        let mime_type = self.mime_type();
        let part = match self.source().cloned() {
            Some(bytes) => {
                let len = bytes.len() as u64;
                Part::stream_with_length(Body::from(bytes), len)
            }
            None => Part::stream(self.into_body()?),
        };
        Some(part.file_name(file_name.to_string()).mime_str(&mime_type))
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream(stream) => f
                .debug_struct("Stream")
                .field("mime_type", &stream.mime_type)
                .finish_non_exhaustive(),
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Object(object) => f.debug_tuple("Object").field(object).finish(),
        }
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for Payload {
    fn from(bytes: &'static [u8]) -> Self {
        Self::Bytes(Bytes::from_static(bytes))
    }
}

impl From<PayloadObject> for Payload {
    fn from(object: PayloadObject) -> Self {
        Self::Object(object)
    }
}
