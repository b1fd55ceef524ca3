use crate::{
    auth::models::User,
    document::models::Identifier,
    error::QdocsError,
    state::AppState,
    ui_control::{resolve_controls, UiControlContext, UiControlState},
};
use axum::{
    extract::State,
    http::{header, Method},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use axum_macros::debug_handler;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use self::documents::documents_router;

mod documents;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH]);

    public_router(state.clone())
        .merge(documents_router(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn public_router(state: AppState) -> Router {
    Router::new()
        .route("/session", post(open_session))
        .route("/ui-controls", post(ui_controls))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenSession {
    pub user_id: Identifier,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: uuid::Uuid,
    pub user: User,
    pub expires: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[debug_handler]
pub async fn open_session(
    State(state): State<AppState>,
    Json(OpenSession { user_id }): Json<OpenSession>,
) -> Result<Response, QdocsError> {
    let user = state.service.get_user(&user_id).await?;
    let session = state
        .sessions
        .create_session(user, state.service.clone())
        .await;
    let cookie = state.sessions.create_session_cookie(session.id);

    info!("Session opened for {user_id}");

    let info = SessionInfo {
        id: session.id,
        user: session.user.clone(),
        expires: session.expires,
        created_at: session.created_at,
    };

    Ok(([(header::SET_COOKIE, cookie.to_string())], Json(info)).into_response())
}

pub async fn ui_controls(Json(context): Json<UiControlContext>) -> Json<UiControlState> {
    Json(resolve_controls(&context))
}
