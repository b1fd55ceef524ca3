use crate::{
    auth::{models::Session, AuthError, SESSION_COOKIE},
    document::{
        models::{Identifier, LifecycleState},
        Document, DocumentEdit,
    },
    error::QdocsError,
    lifecycle::Action,
    permission::{has_permission, permission_value},
    remote::PublishMetadata,
    state::AppState,
    visibility::{can_act, can_edit, can_view},
    workflow::WorkflowError,
};
use axum::{
    body::Bytes,
    extract::{Path, Request, State},
    middleware::{self, Next},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::{headers::Cookie, TypedHeader};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

pub(super) fn documents_router(state: AppState) -> Router {
    Router::new()
        .route("/documents", get(list_documents))
        .route("/documents/:id", get(get_document).patch(edit_document))
        .route(
            "/documents/:id/transitions/:action",
            get(check_transition).post(run_transition),
        )
        .route("/permissions", post(check_permission))
        .layer(middleware::from_fn_with_state(state.clone(), session_check))
        .with_state(state)
}

/// A document as returned to clients, with what the session may do with it.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentView {
    #[serde(flatten)]
    pub document: Document,

    /// A transition or edit is in flight. Clients disable their triggers.
    pub processing: bool,

    pub editable: bool,
}

impl DocumentView {
    fn new(document: Document, session: &Session, state: &AppState) -> Self {
        Self {
            processing: session.workflow.is_processing(&document.id),
            editable: has_permission(Some(&session.user), state.policy.edit())
                && can_edit(&document, &session.user),
            document,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionCheck {
    pub action: Action,
    pub valid: bool,
    pub permitted: bool,

    #[serde(default)]
    pub reason: Option<String>,

    /// For submit the request id is only known once the service issues it.
    #[serde(default)]
    pub expected: Option<LifecycleState>,
}

#[derive(Debug, Deserialize)]
pub struct PermissionQuery {
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PermissionAnswer {
    pub path: Option<String>,
    pub granted: bool,
}

async fn list_documents(
    State(state): State<AppState>,
    Extension(session): Extension<Arc<Session>>,
) -> Result<Json<Vec<DocumentView>>, QdocsError> {
    let documents = session.workflow.refresh_all().await?;
    let total = documents.len();

    let visible = documents
        .into_iter()
        .filter(|document| can_view(document, Some(&session.user)))
        .map(|document| DocumentView::new(document, &session, &state))
        .collect::<Vec<_>>();

    debug!("Listing {} of {total} documents", visible.len());

    Ok(Json(visible))
}

async fn get_document(
    State(state): State<AppState>,
    Extension(session): Extension<Arc<Session>>,
    Path(id): Path<String>,
) -> Result<Json<DocumentView>, QdocsError> {
    let document = session.workflow.refresh(&Identifier::from(id)).await?;

    if !can_view(&document, Some(&session.user)) {
        return Err(QdocsError::NotPermitted);
    }

    Ok(Json(DocumentView::new(document, &session, &state)))
}

async fn edit_document(
    State(state): State<AppState>,
    Extension(session): Extension<Arc<Session>>,
    Path(id): Path<String>,
    Json(edit): Json<DocumentEdit>,
) -> Result<Json<DocumentView>, QdocsError> {
    let id = Identifier::from(id);
    let document = session.workflow.load(&id).await?;

    if !has_permission(Some(&session.user), state.policy.edit())
        || !can_edit(&document, &session.user)
    {
        return Err(QdocsError::NotPermitted);
    }

    let document = session.workflow.edit(&id, edit).await?;
    info!("Document {id} edited by {}", session.user.id);

    Ok(Json(DocumentView::new(document, &session, &state)))
}

fn parse_action(action: &str) -> Result<Action, QdocsError> {
    action
        .parse::<Action>()
        .map_err(|e| QdocsError::NotFound(e.to_string()))
}

/// Whether the session user may trigger `action` on `document`.
fn permitted(state: &AppState, session: &Session, document: &Document, action: Action) -> bool {
    let holds = state
        .policy
        .action(action)
        .is_some_and(|path| has_permission(Some(&session.user), path));

    holds && can_act(document, &session.user)
}

/// Publish metadata from a request body. Only an empty body means none was
/// given, anything else must decode.
fn publish_metadata(body: &[u8]) -> Result<Option<PublishMetadata>, QdocsError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| QdocsError::InvalidBody(e.to_string()))
}

async fn check_transition(
    State(state): State<AppState>,
    Extension(session): Extension<Arc<Session>>,
    Path((id, action)): Path<(String, String)>,
) -> Result<Json<TransitionCheck>, QdocsError> {
    let id = Identifier::from(id);
    let action = parse_action(&action)?;
    let document = session.workflow.load(&id).await?;

    if !can_view(&document, Some(&session.user)) {
        return Err(QdocsError::NotPermitted);
    }

    let permitted = permitted(&state, &session, &document, action);

    let check = match session.workflow.validate(&id, action) {
        Ok(transition) => TransitionCheck {
            action,
            valid: true,
            permitted,
            reason: None,
            expected: Some(transition.expected_state(None)),
        },
        Err(WorkflowError::Precondition(e)) => TransitionCheck {
            action,
            valid: false,
            permitted,
            reason: Some(e.to_string()),
            expected: None,
        },
        Err(e) => return Err(e.into()),
    };

    Ok(Json(check))
}

async fn run_transition(
    State(state): State<AppState>,
    Extension(session): Extension<Arc<Session>>,
    Path((id, action)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<DocumentView>, QdocsError> {
    let id = Identifier::from(id);
    let action = parse_action(&action)?;

    let metadata = match action {
        Action::Publish => publish_metadata(&body)?,
        _ => None,
    };

    let document = session.workflow.load(&id).await?;

    if !can_view(&document, Some(&session.user))
        || !permitted(&state, &session, &document, action)
    {
        return Err(QdocsError::NotPermitted);
    }

    let document = session.workflow.transition(&id, action, metadata).await?;

    Ok(Json(DocumentView::new(document, &session, &state)))
}

async fn check_permission(
    Extension(session): Extension<Arc<Session>>,
    Json(PermissionQuery { path }): Json<PermissionQuery>,
) -> Json<PermissionAnswer> {
    let granted = permission_value(&session.user.permissions, path.as_deref()) == 1;
    Json(PermissionAnswer { path, granted })
}

async fn session_check(
    State(state): State<AppState>,
    cookie: Option<TypedHeader<Cookie>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, QdocsError> {
    let Some(TypedHeader(cookie)) = cookie else {
        return Err(AuthError::NoSession.into());
    };

    let Some(cookie) = cookie.get(SESSION_COOKIE) else {
        return Err(AuthError::NoSession.into());
    };

    let Ok(session_id) = uuid::Uuid::parse_str(cookie) else {
        return Err(AuthError::NoSession.into());
    };

    let session = state.sessions.session_check(session_id).await?;
    req.extensions_mut().insert(session);

    let response = next.run(req).await;

    Ok(response)
}
