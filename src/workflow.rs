//! Sequencing of lifecycle transitions against the document service.
//!
//! Every transition runs the same three steps: validate against the local copy,
//! call the service, then reconcile the local copy with what the service stored.
//! Any failure leaves the local copy untouched.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
    document::{models::Identifier, Document, DocumentEdit, DocumentUpdate},
    lifecycle::{validate_transition, Action, Transition, TransitionError},
    remote::{DocumentService, PublishMetadata, RemoteError},
};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("precondition not met: {0}")]
    Precondition(#[from] TransitionError),

    #[error("request rejected by server: {0}")]
    Rejected(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("document {0} is already being processed")]
    Busy(Identifier),

    #[error("document {0} not found")]
    NotFound(Identifier),
}

impl From<RemoteError> for WorkflowError {
    fn from(value: RemoteError) -> Self {
        match value {
            e @ RemoteError::Rejected(_) => Self::Rejected(e.to_string()),
            RemoteError::Transport(e) => Self::Transport(e),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks a document as in flight for as long as it lives.
struct Processing<'a> {
    processing: &'a Mutex<HashSet<Identifier>>,
    id: Identifier,
}

impl<'a> Processing<'a> {
    fn start(
        processing: &'a Mutex<HashSet<Identifier>>,
        id: &Identifier,
    ) -> Result<Self, WorkflowError> {
        if !lock(processing).insert(id.clone()) {
            return Err(WorkflowError::Busy(id.clone()));
        }
        Ok(Self {
            processing,
            id: id.clone(),
        })
    }
}

impl Drop for Processing<'_> {
    fn drop(&mut self) {
        lock(self.processing).remove(&self.id);
    }
}

/// One session's view of its documents plus the transition orchestration.
pub struct Workflow {
    service: Arc<dyn DocumentService>,
    documents: Mutex<HashMap<Identifier, Document>>,
    processing: Mutex<HashSet<Identifier>>,
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("documents", &lock(&self.documents).len())
            .field("processing", &*lock(&self.processing))
            .finish()
    }
}

impl Workflow {
    pub fn new(service: Arc<dyn DocumentService>) -> Self {
        Self {
            service,
            documents: Mutex::new(HashMap::new()),
            processing: Mutex::new(HashSet::new()),
        }
    }

    /// The locally held copy of a document.
    pub fn document(&self, id: &Identifier) -> Option<Document> {
        lock(&self.documents).get(id).cloned()
    }

    pub fn hydrate(&self, document: Document) {
        lock(&self.documents).insert(document.id.clone(), document);
    }

    /// Whether a call for the document is in flight.
    pub fn is_processing(&self, id: &Identifier) -> bool {
        lock(&self.processing).contains(id)
    }

    /// Replace the local copy with the service's.
    pub async fn refresh(&self, id: &Identifier) -> Result<Document, WorkflowError> {
        let document = self.service.get_document(id).await?;
        self.hydrate(document.clone());
        Ok(document)
    }

    /// Reload every document the service lists.
    pub async fn refresh_all(&self) -> Result<Vec<Document>, WorkflowError> {
        let documents = self.service.list_documents().await?;
        let mut held = lock(&self.documents);
        for document in documents.iter() {
            held.insert(document.id.clone(), document.clone());
        }
        debug!("Hydrated {} documents", documents.len());
        Ok(documents)
    }

    /// The local copy, fetching it first if the session has not seen it yet.
    pub async fn load(&self, id: &Identifier) -> Result<Document, WorkflowError> {
        match self.document(id) {
            Some(document) => Ok(document),
            None => self.refresh(id).await,
        }
    }

    /// Validate `action` against the local copy without side effects.
    pub fn validate(&self, id: &Identifier, action: Action) -> Result<Transition, WorkflowError> {
        let document = self
            .document(id)
            .ok_or_else(|| WorkflowError::NotFound(id.clone()))?;
        Ok(validate_transition(&document, action)?)
    }

    pub async fn submit(&self, id: &Identifier) -> Result<Document, WorkflowError> {
        self.transition(id, Action::Submit, None).await
    }

    pub async fn discard(&self, id: &Identifier) -> Result<Document, WorkflowError> {
        self.transition(id, Action::Discard, None).await
    }

    pub async fn endorse(&self, id: &Identifier) -> Result<Document, WorkflowError> {
        self.transition(id, Action::Endorse, None).await
    }

    pub async fn reject(&self, id: &Identifier) -> Result<Document, WorkflowError> {
        self.transition(id, Action::Reject, None).await
    }

    pub async fn publish(
        &self,
        id: &Identifier,
        metadata: PublishMetadata,
    ) -> Result<Document, WorkflowError> {
        self.transition(id, Action::Publish, Some(metadata)).await
    }

    pub async fn checkout(&self, id: &Identifier) -> Result<Document, WorkflowError> {
        self.transition(id, Action::Checkout, None).await
    }

    /// Run `action` on the document and return the reconciled copy.
    ///
    /// `metadata` is only read for publish.
    pub async fn transition(
        &self,
        id: &Identifier,
        action: Action,
        metadata: Option<PublishMetadata>,
    ) -> Result<Document, WorkflowError> {
        // Held before the snapshot is read so a call finishing in between
        // cannot leave this one validating stale state
        let _processing = Processing::start(&self.processing, id)?;

        let snapshot = self
            .document(id)
            .ok_or_else(|| WorkflowError::NotFound(id.clone()))?;

        let transition = validate_transition(&snapshot, action).map_err(|e| {
            debug!("{action} on {id} refused: {e}");
            e
        })?;

        let result = self.execute(&snapshot, &transition, metadata).await;

        match result {
            Ok(document) => {
                info!(
                    "{action} on {id} applied, request: {:?}",
                    document.request_id.as_ref().map(Identifier::as_str)
                );
                self.hydrate(document.clone());
                Ok(document)
            }
            Err(e) => {
                match e {
                    WorkflowError::Transport(ref reason) => {
                        error!("{action} on {id} failed: {reason}")
                    }
                    ref e => warn!("{action} on {id} failed: {e}"),
                }
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        snapshot: &Document,
        transition: &Transition,
        metadata: Option<PublishMetadata>,
    ) -> Result<Document, WorkflowError> {
        let id = &snapshot.id;
        let action = transition.action;

        let issued = match action {
            Action::Submit => Some(self.service.submit_request(id).await?),
            Action::Checkout => {
                self.service.checkout_document(id, snapshot).await?;
                None
            }
            Action::Discard | Action::Endorse | Action::Reject | Action::Publish => {
                let request_id = transition
                    .request_id()
                    .ok_or(TransitionError::NoRequest(action))?;

                match action {
                    Action::Discard => self.service.discard_request(request_id).await?,
                    Action::Endorse => self.service.endorse_request(request_id).await?,
                    Action::Reject => self.service.reject_request(request_id).await?,
                    _ => {
                        let metadata = metadata.clone().unwrap_or_default();
                        self.service.publish_request(request_id, &metadata).await?
                    }
                }
                None
            }
        };

        // Optimistic local state, confirmed by the service's stored copy
        let expected = transition.expected_state(issued);
        let mut optimistic = snapshot.clone();
        optimistic.apply_lifecycle(expected.clone());

        let mut update = DocumentUpdate {
            lifecycle: Some(expected),
            ..Default::default()
        };

        if let (Action::Publish, Some(metadata)) = (action, metadata) {
            metadata.merge_into(&mut optimistic.metadata);
            update.metadata = Some(optimistic.metadata.clone());
        }

        let confirmed = self.service.update_document(id, &update).await?;

        if confirmed.lifecycle() != optimistic.lifecycle() {
            warn!(
                "Server state for {id} differs from expected after {action}, keeping server copy"
            );
        }

        Ok(confirmed)
    }

    /// Apply an ordinary field edit. Access checks are the caller's.
    pub async fn edit(
        &self,
        id: &Identifier,
        edit: DocumentEdit,
    ) -> Result<Document, WorkflowError> {
        let _processing = Processing::start(&self.processing, id)?;

        if self.document(id).is_none() {
            return Err(WorkflowError::NotFound(id.clone()));
        }

        let document = self
            .service
            .update_document(id, &DocumentUpdate::from(edit))
            .await?;

        self.hydrate(document.clone());
        Ok(document)
    }
}
