//! In-memory [DocumentService] for tests. Enforces the same lifecycle rules
//! as the real service so races and stale clients can be exercised.

use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};
use tokio::sync::Notify;

use super::{DocumentService, PublishMetadata, RemoteError};
use crate::{
    auth::models::User,
    document::{models::Identifier, Document, DocumentUpdate},
    lifecycle::{validate_transition, Action},
};

#[derive(Debug, Default)]
pub struct FakeDocumentService {
    documents: Mutex<HashMap<Identifier, Document>>,
    users: Mutex<HashMap<Identifier, User>>,
    calls: Mutex<Vec<String>>,
    failure: Mutex<Option<RemoteError>>,
    next_request: Mutex<u32>,
    gate: Mutex<Option<std::sync::Arc<Notify>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FakeDocumentService {
    pub fn with_documents(documents: impl IntoIterator<Item = Document>) -> Self {
        let service = Self::default();
        for document in documents {
            service.put_document(document);
        }
        service
    }

    pub fn put_document(&self, document: Document) {
        lock(&self.documents).insert(document.id.clone(), document);
    }

    pub fn put_user(&self, user: User) {
        lock(&self.users).insert(user.id.clone(), user);
    }

    pub fn stored(&self, id: &str) -> Option<Document> {
        lock(&self.documents).get(&Identifier::from(id)).cloned()
    }

    /// Calls made so far, e.g. `submit d1` or `update d1`.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    /// Make the next call fail with `error`.
    pub fn fail_next(&self, error: RemoteError) {
        *lock(&self.failure) = Some(error);
    }

    /// Hold every call until the returned handle is notified.
    pub fn hold(&self) -> std::sync::Arc<Notify> {
        let notify = std::sync::Arc::new(Notify::new());
        *lock(&self.gate) = Some(notify.clone());
        notify
    }

    async fn enter(&self, call: String) -> Result<(), RemoteError> {
        lock(&self.calls).push(call);

        let gate = lock(&self.gate).take();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        match lock(&self.failure).take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn by_request(&self, request_id: &Identifier) -> Result<Document, RemoteError> {
        lock(&self.documents)
            .values()
            .find(|document| document.request_id.as_ref() == Some(request_id))
            .cloned()
            .ok_or_else(|| RemoteError::Rejected(Some(format!("unknown request {request_id}"))))
    }

    fn check(document: &Document, action: Action) -> Result<(), RemoteError> {
        validate_transition(document, action)
            .map(|_| ())
            .map_err(|e| RemoteError::Rejected(Some(e.to_string())))
    }

    fn by_id(&self, id: &Identifier) -> Result<Document, RemoteError> {
        lock(&self.documents)
            .get(id)
            .cloned()
            .ok_or_else(|| RemoteError::Rejected(Some(format!("document {id} not found"))))
    }
}

#[async_trait]
impl DocumentService for FakeDocumentService {
    async fn submit_request(&self, document_id: &Identifier) -> Result<Identifier, RemoteError> {
        self.enter(format!("submit {document_id}")).await?;
        Self::check(&self.by_id(document_id)?, Action::Submit)?;

        let mut next = lock(&self.next_request);
        *next += 1;
        Ok(Identifier::from(format!("R{next}")))
    }

    async fn discard_request(&self, request_id: &Identifier) -> Result<(), RemoteError> {
        self.enter(format!("discard {request_id}")).await?;
        Self::check(&self.by_request(request_id)?, Action::Discard)
    }

    async fn endorse_request(&self, request_id: &Identifier) -> Result<(), RemoteError> {
        self.enter(format!("endorse {request_id}")).await?;
        Self::check(&self.by_request(request_id)?, Action::Endorse)
    }

    async fn reject_request(&self, request_id: &Identifier) -> Result<(), RemoteError> {
        self.enter(format!("reject {request_id}")).await?;
        Self::check(&self.by_request(request_id)?, Action::Reject)
    }

    async fn publish_request(
        &self,
        request_id: &Identifier,
        _metadata: &PublishMetadata,
    ) -> Result<(), RemoteError> {
        self.enter(format!("publish {request_id}")).await?;
        Self::check(&self.by_request(request_id)?, Action::Publish)
    }

    async fn checkout_document(
        &self,
        document_id: &Identifier,
        _snapshot: &Document,
    ) -> Result<(), RemoteError> {
        self.enter(format!("checkout {document_id}")).await?;
        Self::check(&self.by_id(document_id)?, Action::Checkout)
    }

    async fn update_document(
        &self,
        document_id: &Identifier,
        update: &DocumentUpdate,
    ) -> Result<Document, RemoteError> {
        self.enter(format!("update {document_id}")).await?;

        let mut documents = lock(&self.documents);
        let document = documents
            .get_mut(document_id)
            .ok_or_else(|| RemoteError::Rejected(Some(format!("document {document_id} not found"))))?;

        if let Some(ref lifecycle) = update.lifecycle {
            document.apply_lifecycle(lifecycle.clone());
        }
        if let Some(ref name) = update.name {
            document.name = name.clone();
        }
        if let Some(ref metadata) = update.metadata {
            document.metadata = metadata.clone();
        }

        Ok(document.clone())
    }

    async fn get_document(&self, document_id: &Identifier) -> Result<Document, RemoteError> {
        self.enter(format!("get {document_id}")).await?;
        self.by_id(document_id)
    }

    async fn list_documents(&self) -> Result<Vec<Document>, RemoteError> {
        self.enter("list".to_string()).await?;
        let mut documents = lock(&self.documents).values().cloned().collect::<Vec<_>>();
        documents.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(documents)
    }

    async fn get_user(&self, user_id: &Identifier) -> Result<User, RemoteError> {
        self.enter(format!("user {user_id}")).await?;
        lock(&self.users)
            .get(user_id)
            .cloned()
            .ok_or_else(|| RemoteError::Rejected(Some(format!("user {user_id} not found"))))
    }
}
