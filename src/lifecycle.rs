//! Review lifecycle of quality documents.
//!
//! A quality document moves between the authoring team and the controlling
//! reviewer through a fixed set of [Action]s. [validate_transition] checks an
//! action against a document's current [LifecycleState] and [expected_state]
//! computes the state that must follow once the service accepts it.
//!
//! | Action   | Requires                                          | Results in                              |
//! |----------|---------------------------------------------------|-----------------------------------------|
//! | submit   | WORKING, CHECKED_OUT, no request                  | UNDER_REVIEW, CHECKED_IN, new id, TEAM  |
//! | discard  | request, mode TEAM or CONTROLLER                  | WORKING, CHECKED_OUT, -, -              |
//! | endorse  | UNDER_REVIEW, request, mode TEAM                  | UNDER_REVIEW, CHECKED_IN, id, CONTROLLER|
//! | reject   | UNDER_REVIEW, request                             | WORKING, CHECKED_IN, id, TEAM           |
//! | publish  | UNDER_REVIEW, request, mode CONTROLLER            | PUBLISHED, CHECKED_IN, -, -             |
//! | checkout | PUBLISHED, no request                             | WORKING, CHECKED_OUT, -, -              |
//!
//! A rejected document stays checked in. It can be resubmitted (submit with the
//! TEAM request still attached) or discarded.

use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use thiserror::Error;

use crate::document::{
    models::{CheckoutState, DocumentStatus, Identifier, LifecycleState, WorkflowMode},
    Document,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Submit,
    Discard,
    Endorse,
    Reject,
    Publish,
    /// Restarts the workflow on a published document.
    Checkout,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::Submit,
        Action::Discard,
        Action::Endorse,
        Action::Reject,
        Action::Publish,
        Action::Checkout,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Submit => "submit",
            Action::Discard => "discard",
            Action::Endorse => "endorse",
            Action::Reject => "reject",
            Action::Publish => "publish",
            Action::Checkout => "checkout",
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = TransitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| TransitionError::UnknownAction(s.to_string()))
    }
}

/// Why a transition was refused. The messages are shown to users as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("not a quality document")]
    NotQualityDocument,

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("document must be {} to {action}", .required.describe())]
    Status {
        action: Action,
        required: DocumentStatus,
        actual: DocumentStatus,
    },

    #[error("document must be checked out to {0}")]
    NotCheckedOut(Action),

    #[error("document already has an outstanding request and cannot {0}")]
    RequestOutstanding(Action),

    #[error("document has no outstanding request to {0}")]
    NoRequest(Action),

    #[error("document must be in {required} mode to {action} (current mode: {})", mode_name(.actual))]
    Mode {
        action: Action,
        required: WorkflowMode,
        actual: Option<WorkflowMode>,
    },

    #[error("request must be in TEAM or CONTROLLER mode to {0}")]
    NoMode(Action),
}

fn mode_name(mode: &Option<WorkflowMode>) -> String {
    match mode {
        Some(mode) => mode.to_string(),
        None => "none".to_string(),
    }
}

/// A transition that passed validation against a snapshot of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub action: Action,
    pub from: LifecycleState,
}

impl Transition {
    /// The request the action operates on. Always present for discard,
    /// endorse, reject and publish.
    pub fn request_id(&self) -> Option<&Identifier> {
        self.from.request_id.as_ref()
    }

    /// State to apply once the service accepts the action. `issued` is the
    /// request id handed out by the service and is only read for submit.
    pub fn expected_state(&self, issued: Option<Identifier>) -> LifecycleState {
        match self.action {
            Action::Submit => expected_state(self.action, issued),
            _ => expected_state(self.action, self.from.request_id.clone()),
        }
    }
}

/// Check `action` against the document's current lifecycle fields.
///
/// Never mutates the document. Non-quality documents are refused before any
/// lifecycle field is read.
pub fn validate_transition(
    document: &Document,
    action: Action,
) -> Result<Transition, TransitionError> {
    let Some(current) = document.lifecycle() else {
        return Err(TransitionError::NotQualityDocument);
    };

    match action {
        Action::Submit => {
            require_status(&current, action, DocumentStatus::Working)?;
            match current.request_id {
                None => {
                    if current.checked_out != CheckoutState::CheckedOut {
                        return Err(TransitionError::NotCheckedOut(action));
                    }
                }
                // Resubmission of a rejected document
                Some(_) => {
                    if current.mode != Some(WorkflowMode::Team) {
                        return Err(TransitionError::RequestOutstanding(action));
                    }
                }
            }
        }
        Action::Discard => {
            require_request(&current, action)?;
            if current.mode.is_none() {
                return Err(TransitionError::NoMode(action));
            }
        }
        Action::Endorse => {
            require_status(&current, action, DocumentStatus::UnderReview)?;
            require_request(&current, action)?;
            require_mode(&current, action, WorkflowMode::Team)?;
        }
        Action::Reject => {
            require_status(&current, action, DocumentStatus::UnderReview)?;
            require_request(&current, action)?;
        }
        Action::Publish => {
            require_status(&current, action, DocumentStatus::UnderReview)?;
            require_request(&current, action)?;
            require_mode(&current, action, WorkflowMode::Controller)?;
        }
        Action::Checkout => {
            require_status(&current, action, DocumentStatus::Published)?;
            if current.request_id.is_some() {
                return Err(TransitionError::RequestOutstanding(action));
            }
        }
    }

    Ok(Transition {
        action,
        from: current,
    })
}

/// The lifecycle fields that must follow a successful `action`.
///
/// `request_id` is the id to carry forward: the newly issued one for submit,
/// the current one for endorse and reject. It is ignored by the actions that
/// clear the request.
pub fn expected_state(action: Action, request_id: Option<Identifier>) -> LifecycleState {
    use CheckoutState::*;
    use DocumentStatus::*;

    let (status, checked_out, request_id, mode) = match action {
        Action::Submit => (UnderReview, CheckedIn, request_id, Some(WorkflowMode::Team)),
        Action::Discard => (Working, CheckedOut, None, None),
        Action::Endorse => (
            UnderReview,
            CheckedIn,
            request_id,
            Some(WorkflowMode::Controller),
        ),
        // Stays checked in until the team discards or resubmits
        Action::Reject => (Working, CheckedIn, request_id, Some(WorkflowMode::Team)),
        Action::Publish => (Published, CheckedIn, None, None),
        Action::Checkout => (Working, CheckedOut, None, None),
    };

    LifecycleState {
        status,
        checked_out,
        request_id,
        mode,
    }
}

fn require_status(
    current: &LifecycleState,
    action: Action,
    required: DocumentStatus,
) -> Result<(), TransitionError> {
    if current.status == required {
        return Ok(());
    }
    Err(TransitionError::Status {
        action,
        required,
        actual: current.status,
    })
}

fn require_request(current: &LifecycleState, action: Action) -> Result<(), TransitionError> {
    match current.request_id {
        Some(_) => Ok(()),
        None => Err(TransitionError::NoRequest(action)),
    }
}

fn require_mode(
    current: &LifecycleState,
    action: Action,
    required: WorkflowMode,
) -> Result<(), TransitionError> {
    if current.mode == Some(required) {
        return Ok(());
    }
    Err(TransitionError::Mode {
        action,
        required,
        actual: current.mode,
    })
}
