//! drive_facade - Upload payloads to a Google Drive folder and fetch them back.
//!
//! This library provides:
//! - Validation of service account credentials (inline JSON or a key file path)
//! - Uploads of buffers, byte streams or `{ buffer | data }` objects into a
//!   configured parent folder, returning metadata with a direct-download link
//! - Retrieval of object metadata or raw content by id
//!
//! # Example
//!
//! ```no_run
//! use drive_facade::{DriveClient, GetOptions, PayloadObject};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = DriveClient::new("service-account.json")?;
//!
//!     let payload = PayloadObject::new().with_buffer(b"hello drive".to_vec());
//!     if let Some(stored) = client.upload(payload, Some("name,size".into())).await? {
//!         println!("{:?}", stored);
//!
//!         let content = client.get(&stored.id, GetOptions::media()).await;
//!         println!("{:?}", content);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod credentials;
pub mod error;
pub mod link;
pub mod models;
pub mod payload;
pub mod projection;
pub mod retrieval;
pub mod url_parser;

// Re-exports for convenience
pub use auth::Authenticator;
pub use client::{DriveClient, DriveConfig, DEFAULT_PARENT_ID};
pub use credentials::CredentialSource;
pub use error::{DriveError, Result};
pub use link::ContentLinkResolver;
pub use models::{ServiceAccountCredentials, StoredObjectMetadata};
pub use payload::{Payload, PayloadObject};
pub use projection::FieldFilter;
pub use retrieval::{Alt, GetOptions, ResponseType, Retrieved};
pub use url_parser::extract_id;
pub use tokio_util::sync::CancellationToken;
