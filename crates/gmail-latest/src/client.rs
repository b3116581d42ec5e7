//! Read-only Gmail REST client bound to an [`AuthorizedClient`].

use serde::Deserialize;
use tracing::debug;

use crate::{auth::AuthorizedClient, error::FetchError};

pub const DEFAULT_GMAIL_ENDPOINT: &str = "https://gmail.googleapis.com/gmail/v1";

#[derive(Debug)]
pub struct GmailClient {
    auth: AuthorizedClient,
    base_url: String,
}

impl GmailClient {
    /// Creates a client against `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is empty or contains only whitespace.
    pub fn new(auth: AuthorizedClient, endpoint: &str) -> Result<Self, FetchError> {
        Ok(Self {
            auth,
            base_url: normalize_base_url(endpoint)?,
        })
    }

    pub(crate) async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<T, FetchError> {
        let url = self.build_url(segments)?;
        let token = self.auth.access_token().await?;

        debug!(%url, ?query, "GET");
        let response = self
            .auth
            .http()
            .get(url)
            .query(query)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        handle_response(response).await
    }

    /// Builds a complete URL by appending path segments to the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the `base_url` is not an absolute URL.
    fn build_url(&self, segments: &[&str]) -> Result<reqwest::Url, FetchError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| FetchError::InvalidEndpoint(e.to_string()))?;
        {
            let mut path = url.path_segments_mut().map_err(|()| {
                FetchError::InvalidEndpoint("endpoint must be an absolute URL".to_string())
            })?;
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }
}

async fn handle_response<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, FetchError> {
    let status = response.status();
    let body = response.text().await?;

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(FetchError::Authorization {
            status,
            message: body,
        });
    }
    if !status.is_success() {
        return Err(FetchError::Service { status, body });
    }

    serde_json::from_str(&body).map_err(|e| FetchError::MalformedResponse(e.to_string()))
}

/// Normalizes a base URL by trimming whitespace and removing trailing slashes.
///
/// # Errors
///
/// Returns an error if the endpoint string is empty or contains only
/// whitespace.
fn normalize_base_url(endpoint: &str) -> Result<String, FetchError> {
    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        return Err(FetchError::InvalidEndpoint(
            "endpoint must not be empty".to_string(),
        ));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path, query_param},
    };

    use super::*;
    use crate::{
        auth::{Authenticator, DelegatedIdentity},
        credential::{ServiceAccountKey, tests::FIXTURE},
        types::ListMessagesResponse,
    };

    async fn mount_token(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"access_token": "test-token", "expires_in": 3600}"#,
                "application/json",
            ))
            .mount(server)
            .await;
    }

    fn client_for(server: &MockServer) -> GmailClient {
        let auth = Authenticator::new(ServiceAccountKey::from_slice(FIXTURE).unwrap())
            .with_token_uri(format!("{}/token", server.uri()))
            .authorize(DelegatedIdentity::new("alice@example.com").unwrap());
        GmailClient::new(auth, &format!("{}/gmail/v1/", server.uri())).unwrap()
    }

    #[test]
    fn test_normalize_base_url_trims_trailing_slash() {
        assert_eq!(
            normalize_base_url(" https://example.com/gmail/v1/ ").unwrap(),
            "https://example.com/gmail/v1"
        );
    }

    #[test]
    fn test_normalize_base_url_empty_returns_error() {
        assert!(normalize_base_url("   ").is_err());
    }

    #[tokio::test]
    async fn test_get_json_sends_bearer_token() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages"))
            .and(query_param("maxResults", "1"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"messages": [{"id": "m1", "threadId": "t1"}], "resultSizeEstimate": 1}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let list: ListMessagesResponse = client
            .get_json(&["users", "me", "messages"], &[("maxResults", "1")])
            .await
            .unwrap();

        assert_eq!(list.messages.len(), 1);
        assert_eq!(list.messages[0].id, "m1");
        assert_eq!(list.messages[0].thread_id.as_deref(), Some("t1"));
    }

    #[tokio::test]
    async fn test_forbidden_maps_to_authorization_error() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_raw(
                r#"{"error": {"code": 403, "message": "Insufficient Permission"}}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_json::<ListMessagesResponse>(&["users", "me", "messages"], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Authorization { status, .. } if status == 403));
    }

    #[tokio::test]
    async fn test_server_error_maps_to_service_error() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_json::<ListMessagesResponse>(&["users", "me", "messages"], &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("503"));
        assert!(matches!(err, FetchError::Service { .. }));
    }

    #[tokio::test]
    async fn test_unexpected_shape_maps_to_malformed_response() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(r#"{"messages": [{"threadId": "t1"}]}"#, "application/json"),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_json::<ListMessagesResponse>(&["users", "me", "messages"], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::MalformedResponse(_)));
    }
}
