use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Display;

/// Opaque identifier as handed out by the document service.
///
/// The service is not consistent about ID types, so both JSON strings and
/// integers are accepted and normalised to their string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawIdentifier", into = "String")]
pub struct Identifier(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawIdentifier {
    Text(String),
    Signed(i64),
    Unsigned(u64),
    Float(f64),
}

impl From<RawIdentifier> for Identifier {
    fn from(value: RawIdentifier) -> Self {
        match value {
            RawIdentifier::Text(s) => Self(s),
            RawIdentifier::Signed(n) => Self(n.to_string()),
            RawIdentifier::Unsigned(n) => Self(n.to_string()),
            RawIdentifier::Float(n) => Self(n.to_string()),
        }
    }
}

impl Identifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<Identifier> for String {
    fn from(value: Identifier) -> Self {
        value.0
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An entry in a privacy list or an owner reference. The service sends
/// either bare IDs or populated `{id, ...}` objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Principal {
    Bare(Identifier),
    Object {
        id: Identifier,
        #[serde(flatten)]
        rest: Map<String, Value>,
    },
}

impl Principal {
    pub fn id(&self) -> &Identifier {
        match self {
            Principal::Bare(id) => id,
            Principal::Object { id, .. } => id,
        }
    }
}

impl From<&str> for Principal {
    fn from(value: &str) -> Self {
        Self::Bare(Identifier::from(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentKind {
    File,
    Folder,
    AuditSchedule,
}

/// Status of a quality document. Encoded on the wire as `-1..=2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum DocumentStatus {
    Working,
    UnderReview,
    /// Reserved. No transition currently produces it.
    Approved,
    Published,
}

impl DocumentStatus {
    /// Phrase used in transition rejection reasons, e.g. "under review".
    pub fn describe(&self) -> &'static str {
        match self {
            DocumentStatus::Working => "in working state",
            DocumentStatus::UnderReview => "under review",
            DocumentStatus::Approved => "approved",
            DocumentStatus::Published => "published",
        }
    }
}

impl TryFrom<i8> for DocumentStatus {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Self::Working),
            0 => Ok(Self::UnderReview),
            1 => Ok(Self::Approved),
            2 => Ok(Self::Published),
            other => Err(format!("invalid document status: {other}")),
        }
    }
}

impl From<DocumentStatus> for i8 {
    fn from(value: DocumentStatus) -> Self {
        match value {
            DocumentStatus::Working => -1,
            DocumentStatus::UnderReview => 0,
            DocumentStatus::Approved => 1,
            DocumentStatus::Published => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum CheckoutState {
    CheckedIn,
    CheckedOut,
}

impl TryFrom<u8> for CheckoutState {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::CheckedIn),
            1 => Ok(Self::CheckedOut),
            other => Err(format!("invalid checkout state: {other}")),
        }
    }
}

impl From<CheckoutState> for u8 {
    fn from(value: CheckoutState) -> Self {
        match value {
            CheckoutState::CheckedIn => 0,
            CheckoutState::CheckedOut => 1,
        }
    }
}

/// Which side of the review holds action rights on an outstanding request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WorkflowMode {
    Team,
    Controller,
}

impl Display for WorkflowMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowMode::Team => write!(f, "TEAM"),
            WorkflowMode::Controller => write!(f, "CONTROLLER"),
        }
    }
}

/// The four lifecycle fields of a quality document, taken as one unit.
///
/// Serialises with explicit `null`s so it can be sent as a partial update
/// that clears `requestId` and `mode`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleState {
    pub status: DocumentStatus,
    pub checked_out: CheckoutState,
    pub request_id: Option<Identifier>,
    pub mode: Option<WorkflowMode>,
}

impl LifecycleState {
    /// The state every quality document is created in.
    pub fn initial() -> Self {
        Self {
            status: DocumentStatus::Working,
            checked_out: CheckoutState::CheckedOut,
            request_id: None,
            mode: None,
        }
    }
}

/// Descriptor of a file document's type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub is_quality_document: bool,

    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<FileType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effectivity_date: Option<NaiveDate>,

    /// Anything else the service stores in the descriptor.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// Allow-list of principals. All three empty means public.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Privacy {
    #[serde(default)]
    pub users: Vec<Principal>,

    #[serde(default)]
    pub teams: Vec<Principal>,

    #[serde(default)]
    pub roles: Vec<Principal>,
}

impl Privacy {
    pub fn is_public(&self) -> bool {
        self.users.is_empty() && self.teams.is_empty() && self.roles.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionOverrides {
    #[serde(default)]
    pub read_only: bool,

    #[serde(default)]
    pub restricted: bool,
}
