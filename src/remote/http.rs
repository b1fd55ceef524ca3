use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ApiResponse, DocumentService, PublishMetadata, RemoteError};
use crate::{
    auth::models::User,
    config::ApiConfig,
    document::{models::Identifier, Document, DocumentUpdate},
};

/// [DocumentService] over the service's JSON HTTP API.
#[derive(Debug, Clone)]
pub struct HttpDocumentService {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitBody<'a> {
    document_id: &'a Identifier,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitData {
    request_id: Identifier,
}

impl HttpDocumentService {
    pub fn new(ApiConfig { base_url, api_key }: ApiConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match self.api_key {
            Some(ref key) => req.header("X-API-Key", key),
            None => req,
        }
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.authorize(self.client.get(self.url(path)))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.authorize(self.client.post(self.url(path)))
    }

    fn patch(&self, path: &str) -> RequestBuilder {
        self.authorize(self.client.patch(self.url(path)))
    }

    /// Send the request and unwrap the response envelope.
    async fn send<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
    ) -> Result<Option<T>, RemoteError> {
        let response = req.send().await?;
        let status = response.status();
        let url = response.url().to_string();
        let body = response.bytes().await?;

        if !status.is_success() {
            // Error bodies carry the envelope too when the service produced them
            let message = serde_json::from_slice::<ApiResponse<serde_json::Value>>(&body)
                .ok()
                .and_then(|envelope| envelope.message);
            warn!("{url} responded with {status}");
            return Err(RemoteError::Rejected(message));
        }

        let envelope: ApiResponse<T> = serde_json::from_slice(&body)
            .map_err(|e| RemoteError::Transport(format!("{url}: invalid response body: {e}")))?;

        debug!("{url} responded with success = {}", envelope.success);

        envelope.into_result()
    }

    /// Like [Self::send] but the response must carry data.
    async fn fetch<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, RemoteError> {
        self.send(req)
            .await?
            .ok_or_else(|| RemoteError::Transport("response is missing data".to_string()))
    }

    async fn request_action(
        &self,
        request_id: &Identifier,
        action: &str,
    ) -> Result<(), RemoteError> {
        self.send::<serde_json::Value>(self.post(&format!("/requests/{request_id}/{action}")))
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl DocumentService for HttpDocumentService {
    async fn submit_request(&self, document_id: &Identifier) -> Result<Identifier, RemoteError> {
        let data: SubmitData = self
            .fetch(self.post("/requests").json(&SubmitBody { document_id }))
            .await?;
        Ok(data.request_id)
    }

    async fn discard_request(&self, request_id: &Identifier) -> Result<(), RemoteError> {
        self.request_action(request_id, "discard").await
    }

    async fn endorse_request(&self, request_id: &Identifier) -> Result<(), RemoteError> {
        self.request_action(request_id, "endorse").await
    }

    async fn reject_request(&self, request_id: &Identifier) -> Result<(), RemoteError> {
        self.request_action(request_id, "reject").await
    }

    async fn publish_request(
        &self,
        request_id: &Identifier,
        metadata: &PublishMetadata,
    ) -> Result<(), RemoteError> {
        self.send::<serde_json::Value>(
            self.post(&format!("/requests/{request_id}/publish"))
                .json(metadata),
        )
        .await
        .map(|_| ())
    }

    async fn checkout_document(
        &self,
        document_id: &Identifier,
        snapshot: &Document,
    ) -> Result<(), RemoteError> {
        self.send::<serde_json::Value>(
            self.post(&format!("/documents/{document_id}/checkout"))
                .json(snapshot),
        )
        .await
        .map(|_| ())
    }

    async fn update_document(
        &self,
        document_id: &Identifier,
        update: &DocumentUpdate,
    ) -> Result<Document, RemoteError> {
        self.fetch(self.patch(&format!("/documents/{document_id}")).json(update))
            .await
    }

    async fn get_document(&self, document_id: &Identifier) -> Result<Document, RemoteError> {
        self.fetch(self.get(&format!("/documents/{document_id}")))
            .await
    }

    async fn list_documents(&self) -> Result<Vec<Document>, RemoteError> {
        self.fetch(self.get("/documents")).await
    }

    async fn get_user(&self, user_id: &Identifier) -> Result<User, RemoteError> {
        self.fetch(self.get(&format!("/users/{user_id}"))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{models::LifecycleState, tests::quality_document};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(server: &MockServer) -> HttpDocumentService {
        HttpDocumentService::new(ApiConfig {
            base_url: format!("{}/", server.uri()),
            api_key: Some("secret".to_string()),
        })
    }

    #[tokio::test]
    async fn submit_returns_issued_request_id() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/requests"))
            .and(header("X-API-Key", "secret"))
            .and(body_json(json!({"documentId": "d1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": {"requestId": "R1"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request_id = service(&server)
            .submit_request(&"d1".into())
            .await
            .unwrap();
        assert_eq!(request_id.as_str(), "R1");
    }

    #[tokio::test]
    async fn unsuccessful_envelope_is_rejected_with_message() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/requests/R1/endorse"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "message": "request already endorsed"
            })))
            .mount(&server)
            .await;

        let err = service(&server)
            .endorse_request(&"R1".into())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RemoteError::Rejected(Some("request already endorsed".to_string()))
        );
    }

    #[tokio::test]
    async fn error_status_without_envelope_is_a_generic_rejection() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/requests/R1/discard"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
            .mount(&server)
            .await;

        let err = service(&server)
            .discard_request(&"R1".into())
            .await
            .unwrap_err();
        assert_eq!(err, RemoteError::Rejected(None));
    }

    #[tokio::test]
    async fn malformed_body_is_a_transport_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/documents/d1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = service(&server)
            .get_document(&"d1".into())
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Transport(_)));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_transport_failure() {
        let service = HttpDocumentService::new(ApiConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            api_key: None,
        });
        let err = service.list_documents().await.unwrap_err();
        assert!(matches!(err, RemoteError::Transport(_)));
    }

    #[tokio::test]
    async fn update_sends_lifecycle_delta_and_returns_document() {
        let server = MockServer::start().await;
        let stored = quality_document("d1");

        Mock::given(method("PATCH"))
            .and(path("/documents/d1"))
            .and(body_json(json!({
                "status": -1,
                "checkedOut": 1,
                "requestId": null,
                "mode": null
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": stored
            })))
            .expect(1)
            .mount(&server)
            .await;

        let update = DocumentUpdate {
            lifecycle: Some(LifecycleState::initial()),
            ..Default::default()
        };
        let document = service(&server)
            .update_document(&"d1".into(), &update)
            .await
            .unwrap();
        assert_eq!(document, stored);
    }

    #[tokio::test]
    async fn publish_sends_metadata() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/requests/R9/publish"))
            .and(body_json(json!({
                "version": "2",
                "documentNumber": "QA-7",
                "issuedDate": "2024-05-01",
                "effectivityDate": null
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        let metadata = PublishMetadata {
            version: Some("2".to_string()),
            document_number: Some("QA-7".to_string()),
            issued_date: chrono::NaiveDate::from_ymd_opt(2024, 5, 1),
            effectivity_date: None,
        };
        service(&server)
            .publish_request(&"R9".into(), &metadata)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn fetches_users() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/u1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": {
                    "id": "u1",
                    "team": "t1",
                    "userType": 2,
                    "permissions": {"documents": {"c": 1, "r": 1, "u": 1, "d": 0}}
                }
            })))
            .mount(&server)
            .await;

        let user = service(&server).get_user(&"u1".into()).await.unwrap();
        assert_eq!(user.user_type, Some("2".into()));
        assert!(user.permissions.grants(&"documents.u".parse().unwrap()));
    }
}
