//! Upload and retrieval facade over the Google Drive v3 API.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures::{StreamExt, TryStreamExt};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::Authenticator;
use crate::credentials::CredentialSource;
use crate::error::{DriveError, Result};
use crate::link::{ContentLinkResolver, DEFAULT_CONTENT_BASE};
use crate::models::{ApiErrorResponse, CreateResource, StoredObjectMetadata};
use crate::payload::Payload;
use crate::projection::{project, FieldFilter};
use crate::retrieval::{GetOptions, ResponseType, Retrieved};
use crate::url_parser::is_valid_id;

/// Base URL for Google Drive API v3.
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Upload URL for Google Drive API.
pub const UPLOAD_API_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Folder that receives uploads unless configured otherwise.
pub const DEFAULT_PARENT_ID: &str = "1-sQEbClcbj6xmywa5XygM3wWfGCWWF69";

/// Endpoints and destination used by a [`DriveClient`].
#[derive(Debug, Clone)]
pub struct DriveConfig {
    /// Container every upload is created in.
    pub parent_id: String,
    /// Base URL of the metadata and content endpoints.
    pub api_base: String,
    /// Base URL of the media upload endpoint.
    pub upload_base: String,
    /// Host of the public `uc?id=` content URLs.
    pub content_base: String,
    /// Upper bound for each HTTP request, including the link probe.
    pub request_timeout: Option<Duration>,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            parent_id: DEFAULT_PARENT_ID.to_string(),
            api_base: DRIVE_API_BASE.to_string(),
            upload_base: UPLOAD_API_BASE.to_string(),
            content_base: DEFAULT_CONTENT_BASE.to_string(),
            request_timeout: None,
        }
    }
}

impl DriveConfig {
    /// Set the folder that receives uploads.
    ///
    /// # Arguments
    /// * `parent_id` - The ID of the destination folder
    pub fn with_parent_id(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = parent_id.into();
        self
    }

    /// Override the Drive API base URL.
    ///
    /// # Arguments
    /// * `api_base` - URL replacing `https://www.googleapis.com/drive/v3`
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Override the upload base URL.
    ///
    /// # Arguments
    /// * `upload_base` - URL replacing `https://www.googleapis.com/upload/drive/v3`
    pub fn with_upload_base(mut self, upload_base: impl Into<String>) -> Self {
        self.upload_base = upload_base.into();
        self
    }

    /// Override the host probed for content links.
    ///
    /// # Arguments
    /// * `content_base` - URL replacing `https://drive.google.com`
    pub fn with_content_base(mut self, content_base: impl Into<String>) -> Self {
        self.content_base = content_base.into();
        self
    }

    /// Bound every HTTP request made by the client.
    ///
    /// # Arguments
    /// * `timeout` - Maximum duration of a single request
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

/// Client that uploads payloads into a fixed Drive folder and fetches
/// objects back by id.
pub struct DriveClient {
    config: DriveConfig,
    auth: Authenticator,
    http: Client,
    links: ContentLinkResolver,
}

impl DriveClient {
    /// Create a client with the default configuration.
    ///
    /// Fails with [`DriveError::InvalidCredential`] when the credential
    /// cannot be resolved.
    pub fn new(credential: impl Into<CredentialSource>) -> Result<Self> {
        Self::with_config(credential, DriveConfig::default())
    }

    /// Create a client with an explicit configuration.
    pub fn with_config(credential: impl Into<CredentialSource>, config: DriveConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        let auth = Authenticator::from_source(credential.into(), http.clone())?;
        let links = ContentLinkResolver::new(&config.content_base, config.request_timeout)?;

        debug!(
            client_email = auth.client_email(),
            parent_id = %config.parent_id,
            "drive client ready"
        );

        Ok(Self {
            config,
            auth,
            http,
            links,
        })
    }

    /// Get the configuration the client was built with.
    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    /// Upload a payload into the configured folder.
    ///
    /// Returns `Ok(None)` when the payload has no binary content (nothing is
    /// sent) or when the content link of the created object could not be
    /// resolved. A failed create request is returned as an error.
    pub async fn upload(
        &self,
        payload: impl Into<Payload>,
        field_filter: Option<FieldFilter>,
    ) -> Result<Option<StoredObjectMetadata>> {
        self.upload_cancellable(payload, field_filter, &CancellationToken::new())
            .await
    }

    /// Like [`upload`](Self::upload), but gives up when `cancel` fires.
    ///
    /// Cancellation during the create request yields
    /// [`DriveError::Cancelled`]; during link resolution it yields `Ok(None)`.
    pub async fn upload_cancellable(
        &self,
        payload: impl Into<Payload>,
        field_filter: Option<FieldFilter>,
        cancel: &CancellationToken,
    ) -> Result<Option<StoredObjectMetadata>> {
        let payload = payload.into();
        if !payload.has_content() {
            debug!(?payload, "payload has no binary content, skipping upload");
            return Ok(None);
        }

        let fields = project(field_filter.as_ref());
        let name = timestamp_name();
        let Some(media) = payload.into_part(&name) else {
            return Ok(None);
        };
        let media = media?;

        let created = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DriveError::Cancelled),
            created = self.create_object(&name, media, &fields) => created?,
        };

        let link = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            link = self.links.resolve(&created.id) => link,
        };

        let Some(link) = link else {
            warn!(object_id = %created.id, "no content link for uploaded object, discarding result");
            return Ok(None);
        };

        info!(object_id = %created.id, parent_id = %self.config.parent_id, "uploaded object");

        Ok(Some(StoredObjectMetadata {
            web_content_link: Some(link),
            ..created
        }))
    }

    /// Create the object with a multipart request.
    async fn create_object(&self, name: &str, media: Part, fields: &str) -> Result<StoredObjectMetadata> {
        let token = self.auth.get_access_token().await?;

        let resource = CreateResource {
            name: name.to_string(),
            parents: [self.config.parent_id.as_str()],
        };
        let metadata_part = Part::text(serde_json::to_string(&resource)?)
            .mime_str("application/json")?;

        let form = Form::new()
            .part("metadata", metadata_part)
            .part("file", media);

        debug!(name, fields, "creating object");

        let response = self
            .http
            .post(format!("{}/files", self.config.upload_base))
            .bearer_auth(&token)
            .query(&[
                ("uploadType", "multipart"),
                ("supportsAllDrives", "true"),
                ("fields", fields),
            ])
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let metadata: StoredObjectMetadata = response.json().await?;
        Ok(metadata)
    }

    /// Fetch metadata or content of an object.
    ///
    /// Every failure, including a missing object, yields `None`.
    pub async fn get(&self, object_id: &str, options: GetOptions) -> Option<Retrieved> {
        self.get_cancellable(object_id, options, &CancellationToken::new())
            .await
    }

    /// Like [`get`](Self::get), but yields `None` when `cancel` fires.
    pub async fn get_cancellable(
        &self,
        object_id: &str,
        options: GetOptions,
        cancel: &CancellationToken,
    ) -> Option<Retrieved> {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DriveError::Cancelled),
            result = self.fetch(object_id, &options) => result,
        };

        match result {
            Ok(retrieved) => Some(retrieved),
            Err(e) => {
                warn!(object_id, error = %e, "retrieval failed");
                None
            }
        }
    }

    async fn fetch(&self, object_id: &str, options: &GetOptions) -> Result<Retrieved> {
        if !is_valid_id(object_id) {
            return Err(DriveError::InvalidUrlOrId(object_id.to_string()));
        }

        let token = self.auth.get_access_token().await?;

        debug!(object_id, ?options, "fetching object");

        let response = self
            .http
            .get(format!("{}/files/{}", self.config.api_base, object_id))
            .bearer_auth(&token)
            .query(options)
            .query(&[("supportsAllDrives", "true")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let retrieved = match options.representation() {
            ResponseType::Json => Retrieved::Json(response.json().await?),
            ResponseType::ArrayBuffer | ResponseType::Blob => Retrieved::Bytes(response.bytes().await?),
            ResponseType::Stream => Retrieved::Stream(
                response
                    .bytes_stream()
                    .map_err(std::io::Error::other)
                    .boxed(),
            ),
        };
        Ok(retrieved)
    }
}

/// Turn a non-success response into an [`DriveError::ApiError`], preferring
/// Google's structured error body when there is one.
async fn error_from_response(response: Response) -> DriveError {
    let status = response.status();
    let error_body = response.text().await.unwrap_or_default();
    if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&error_body) {
        return DriveError::ApiError {
            status: api_error.error.code,
            message: api_error.error.message,
        };
    }
    DriveError::ApiError {
        status: status.as_u16(),
        message: error_body,
    }
}

/// Object name derived from the current time in milliseconds.
fn timestamp_name() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
        .to_string()
}
