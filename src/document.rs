use serde::{Deserialize, Serialize};

pub mod models;

use self::models::{
    CheckoutState, DocumentKind, DocumentMetadata, DocumentStatus, Identifier, LifecycleState,
    PermissionOverrides, Principal, Privacy, WorkflowMode,
};

/// A document as held by a session. Mirrors the service's JSON shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Identifier,

    #[serde(rename = "type")]
    pub kind: DocumentKind,

    #[serde(default)]
    pub name: String,

    /// Immutable after creation.
    #[serde(default, alias = "owner")]
    pub author: Option<Principal>,

    #[serde(default)]
    pub metadata: DocumentMetadata,

    // Lifecycle fields. Only meaningful for quality documents.
    #[serde(default)]
    pub status: Option<DocumentStatus>,

    #[serde(default)]
    pub checked_out: Option<CheckoutState>,

    #[serde(default)]
    pub request_id: Option<Identifier>,

    #[serde(default)]
    pub mode: Option<WorkflowMode>,

    #[serde(default)]
    pub privacy: Privacy,

    #[serde(default)]
    pub permission_overrides: PermissionOverrides,
}

impl Document {
    /// Only file documents whose type descriptor opts in are subject to the
    /// review lifecycle.
    pub fn is_quality_document(&self) -> bool {
        self.kind == DocumentKind::File
            && self
                .metadata
                .file_type
                .as_ref()
                .is_some_and(|file_type| file_type.is_quality_document)
    }

    /// The lifecycle fields, or `None` for documents outside the lifecycle.
    ///
    /// Fields the service omitted fall back to the creation state.
    pub fn lifecycle(&self) -> Option<LifecycleState> {
        if !self.is_quality_document() {
            return None;
        }

        let initial = LifecycleState::initial();

        Some(LifecycleState {
            status: self.status.unwrap_or(initial.status),
            checked_out: self.checked_out.unwrap_or(initial.checked_out),
            request_id: self.request_id.clone(),
            mode: self.mode,
        })
    }

    pub fn apply_lifecycle(&mut self, state: LifecycleState) {
        let LifecycleState {
            status,
            checked_out,
            request_id,
            mode,
        } = state;

        self.status = Some(status);
        self.checked_out = Some(checked_out);
        self.request_id = request_id;
        self.mode = mode;
    }

    /// Whether the document is locked against direct edits by a pending review.
    pub fn is_locked(&self) -> bool {
        self.lifecycle()
            .is_some_and(|state| state.checked_out == CheckoutState::CheckedIn)
    }

    pub fn owner_id(&self) -> Option<&Identifier> {
        self.author.as_ref().map(Principal::id)
    }
}

/// Ordinary field edit accepted from clients. Lifecycle and access fields are
/// not part of it and are rejected when present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DocumentEdit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DocumentMetadata>,
}

/// Partial document sent to the service's update endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUpdate {
    #[serde(flatten)]
    pub lifecycle: Option<LifecycleState>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DocumentMetadata>,
}

impl From<DocumentEdit> for DocumentUpdate {
    fn from(value: DocumentEdit) -> Self {
        let DocumentEdit { name, metadata } = value;
        Self {
            lifecycle: None,
            name,
            metadata,
        }
    }
}
