use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{document::models::Identifier, permission::PermissionTree, workflow::Workflow};

/// The acting user as returned by the document service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Identifier,

    #[serde(default)]
    pub name: Option<String>,

    /// Matched against `privacy.teams`.
    #[serde(default)]
    pub team: Option<Identifier>,

    /// Matched against `privacy.roles`.
    #[serde(default)]
    pub user_type: Option<Identifier>,

    #[serde(default)]
    pub permissions: PermissionTree,
}

impl User {
    pub fn new(id: impl Into<Identifier>) -> Self {
        Self {
            id: id.into(),
            name: None,
            team: None,
            user_type: None,
            permissions: PermissionTree::default(),
        }
    }
}

/// Session model
#[derive(Debug)]
pub struct Session {
    pub id: uuid::Uuid,
    pub user: User,
    pub expires: DateTime<Utc>,
    pub created_at: DateTime<Utc>,

    /// The session's own copy of the documents it has seen.
    pub workflow: Workflow,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires <= Utc::now()
    }
}
