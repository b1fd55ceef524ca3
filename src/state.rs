use std::{collections::HashMap, sync::Arc};

use crate::{
    auth::Sessions,
    config::Config,
    lifecycle::Action,
    permission::{PathError, PermissionPath},
    remote::DocumentService,
};

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn DocumentService>,
    pub sessions: Arc<Sessions>,
    pub policy: Arc<AccessPolicy>,
}

impl AppState {
    pub fn new(
        service: Arc<dyn DocumentService>,
        sessions: Sessions,
        policy: AccessPolicy,
    ) -> Self {
        Self {
            service,
            sessions: Arc::new(sessions),
            policy: Arc::new(policy),
        }
    }
}

/// The permission paths guarding each operation, parsed once at start-up.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    actions: HashMap<Action, PermissionPath>,
    edit: PermissionPath,
}

impl AccessPolicy {
    pub fn from_config(config: &Config) -> Result<Self, PathError> {
        let mut actions = HashMap::new();
        for action in Action::ALL {
            actions.insert(action, config.permission_for(action).parse()?);
        }

        Ok(Self {
            actions,
            edit: config.edit_permission.parse()?,
        })
    }

    pub fn action(&self, action: Action) -> Option<&PermissionPath> {
        self.actions.get(&action)
    }

    pub fn edit(&self) -> &PermissionPath {
        &self.edit
    }
}
