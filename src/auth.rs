use self::models::{Session, User};
use crate::{config::SessionConfig, remote::DocumentService, workflow::Workflow};
use axum::{http::StatusCode, response::IntoResponse};
use chrono::{Duration, Utc};
use cookie::{Cookie, SameSite};
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

pub mod models;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "SID";

/// Open sessions. Each one holds its own copy of the documents it works on.
#[derive(Debug)]
pub struct Sessions {
    cookie_domain: String,
    ttl: Duration,
    sessions: RwLock<HashMap<uuid::Uuid, Arc<Session>>>,
}

impl Sessions {
    pub fn new(
        SessionConfig {
            cookie_domain,
            ttl_minutes,
        }: SessionConfig,
    ) -> Self {
        Self {
            cookie_domain,
            ttl: Duration::minutes(ttl_minutes),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn create_session(
        &self,
        user: User,
        service: Arc<dyn DocumentService>,
    ) -> Arc<Session> {
        let now = Utc::now();
        let session = Arc::new(Session {
            id: uuid::Uuid::new_v4(),
            user,
            expires: now + self.ttl,
            created_at: now,
            workflow: Workflow::new(service),
        });

        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, session| !session.is_expired());
        sessions.insert(session.id, session.clone());

        debug!("Opened session for user {}", session.user.id);

        session
    }

    pub async fn session_check(&self, session_id: uuid::Uuid) -> Result<Arc<Session>, AuthError> {
        let session = self.sessions.read().await.get(&session_id).cloned();

        let Some(session) = session else {
            return Err(AuthError::NoSession);
        };

        if session.is_expired() {
            self.sessions.write().await.remove(&session_id);
            return Err(AuthError::Expired);
        }

        Ok(session)
    }

    pub fn create_session_cookie(&self, session_id: uuid::Uuid) -> Cookie<'static> {
        let mut cookie = Cookie::new(SESSION_COOKIE, session_id.to_string());
        cookie.set_secure(true);
        cookie.set_http_only(true);
        cookie.set_same_site(SameSite::Strict);
        cookie.set_domain(self.cookie_domain.clone());
        cookie.set_path("/");
        cookie.set_max_age(cookie::time::Duration::minutes(self.ttl.num_minutes()));
        cookie
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Session required for requested resource")]
    NoSession,

    #[error("Session expired")]
    Expired,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        match self {
            Self::NoSession => (StatusCode::UNAUTHORIZED, "No session").into_response(),
            Self::Expired => (StatusCode::UNAUTHORIZED, "Session expired").into_response(),
        }
    }
}
