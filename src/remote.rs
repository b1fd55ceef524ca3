use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    auth::models::User,
    document::{
        models::{DocumentMetadata, Identifier},
        Document, DocumentUpdate,
    },
};

pub mod http;

#[cfg(test)]
pub mod fake;

pub use http::HttpDocumentService;

/// Shown when the service rejects a call without saying why.
pub const GENERIC_FAILURE: &str = "request failed";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The service answered but refused the call.
    #[error("{}", .0.as_deref().unwrap_or(GENERIC_FAILURE))]
    Rejected(Option<String>),

    /// The service could not be reached or answered with garbage.
    #[error("{0}")]
    Transport(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value.to_string())
    }
}

/// Envelope every service response is wrapped in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiResponse<T> {
    pub success: bool,

    #[serde(default)]
    pub data: Option<T>,

    #[serde(default)]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    /// The payload of a successful response.
    pub fn into_result(self) -> Result<Option<T>, RemoteError> {
        if self.success {
            Ok(self.data)
        } else {
            Err(RemoteError::Rejected(self.message))
        }
    }
}

/// Descriptor fields supplied by the publisher.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishMetadata {
    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub document_number: Option<String>,

    #[serde(default)]
    pub issued_date: Option<NaiveDate>,

    #[serde(default)]
    pub effectivity_date: Option<NaiveDate>,
}

impl PublishMetadata {
    /// Merge into a document descriptor. Absent fields leave the descriptor as is.
    pub fn merge_into(&self, metadata: &mut DocumentMetadata) {
        let PublishMetadata {
            version,
            document_number,
            issued_date,
            effectivity_date,
        } = self;

        if version.is_some() {
            metadata.version = version.clone();
        }
        if document_number.is_some() {
            metadata.document_number = document_number.clone();
        }
        if issued_date.is_some() {
            metadata.issued_date = *issued_date;
        }
        if effectivity_date.is_some() {
            metadata.effectivity_date = *effectivity_date;
        }
    }
}

/// The remote document and request service.
///
/// Assumed to enforce the lifecycle rules itself and to be the source of truth
/// after every call.
#[async_trait]
pub trait DocumentService: Send + Sync {
    /// Open a review request for the document and return its id.
    async fn submit_request(&self, document_id: &Identifier) -> Result<Identifier, RemoteError>;

    async fn discard_request(&self, request_id: &Identifier) -> Result<(), RemoteError>;

    async fn endorse_request(&self, request_id: &Identifier) -> Result<(), RemoteError>;

    async fn reject_request(&self, request_id: &Identifier) -> Result<(), RemoteError>;

    async fn publish_request(
        &self,
        request_id: &Identifier,
        metadata: &PublishMetadata,
    ) -> Result<(), RemoteError>;

    /// Restart the workflow on a published document.
    async fn checkout_document(
        &self,
        document_id: &Identifier,
        snapshot: &Document,
    ) -> Result<(), RemoteError>;

    /// Apply a partial update and return the stored document.
    async fn update_document(
        &self,
        document_id: &Identifier,
        update: &DocumentUpdate,
    ) -> Result<Document, RemoteError>;

    async fn get_document(&self, document_id: &Identifier) -> Result<Document, RemoteError>;

    async fn list_documents(&self) -> Result<Vec<Document>, RemoteError>;

    async fn get_user(&self, user_id: &Identifier) -> Result<User, RemoteError>;
}
