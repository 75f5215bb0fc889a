//! Shared HTTP plumbing for the Supabase auth and REST endpoints

use crate::core::store::Session;
use anyhow::{Result, anyhow};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::sync::{PoisonError, RwLock};
use tracing::debug;

/// Connection to one Supabase project, carrying the current session.
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    session: RwLock<Option<Session>>,
}

impl SupabaseClient {
    pub fn new(base_url: &str, anon_key: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("dealboard/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            session: RwLock::new(None),
        })
    }

    pub fn with_session(self, session: Option<Session>) -> Self {
        self.set_session(session);
        self
    }

    pub fn session(&self) -> Option<Session> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_session(&self, session: Option<Session>) {
        *self
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner) = session;
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Request with the project key and the user's token, or the anon key
    /// when nobody is signed in.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let token = self
            .session()
            .map(|s| s.access_token)
            .unwrap_or_else(|| self.anon_key.clone());
        let url = self.url(path);
        debug!(%method, %url, "Supabase request");
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
    }
}

/// Error body shapes returned by PostgREST and GoTrue.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

/// Message from an error response, falling back to the status line.
pub async fn error_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .and_then(|b| b.message.or(b.msg).or(b.error_description).or(b.error))
        .unwrap_or_else(|| format!("Request failed with status {status}"))
}

/// Passes successful responses through and turns the rest into errors.
pub async fn check(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let message = error_message(response).await;
    debug!(%status, %message, "Supabase error response");
    Err(anyhow!(message))
}

pub fn is_unauthorized(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::User;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session(token: &str) -> Session {
        Session {
            access_token: token.to_string(),
            refresh_token: None,
            expires_at: None,
            user: User {
                id: "u-1".to_string(),
                email: None,
                full_name: None,
            },
        }
    }

    #[tokio::test]
    async fn test_request_uses_session_token() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .and(header("apikey", "anon"))
            .and(header("authorization", "Bearer user-jwt"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = SupabaseClient::new(&format!("{}/", mock_server.uri()), "anon")
            .unwrap()
            .with_session(Some(session("user-jwt")));
        let response = client.request(Method::GET, "/ping").send().await.unwrap();
        assert!(check(response).await.is_ok());
    }

    #[tokio::test]
    async fn test_request_falls_back_to_anon_key() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .and(header("authorization", "Bearer anon"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = SupabaseClient::new(&mock_server.uri(), "anon").unwrap();
        assert!(client.session().is_none());
        client.request(Method::GET, "/ping").send().await.unwrap();
    }

    #[tokio::test]
    async fn test_error_messages() {
        let mock_server = MockServer::start().await;
        Mock::given(path("/postgrest"))
            .respond_with(ResponseTemplate::new(400).set_body_string(
                r#"{"code":"22P02","details":null,"hint":null,"message":"invalid input syntax for type uuid"}"#,
            ))
            .mount(&mock_server)
            .await;
        Mock::given(path("/gotrue"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_string(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#),
            )
            .mount(&mock_server)
            .await;
        Mock::given(path("/plain"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&mock_server)
            .await;

        let client = SupabaseClient::new(&mock_server.uri(), "anon").unwrap();
        let send = |p: &'static str| client.request(Method::GET, p).send();

        let err = check(send("/postgrest").await.unwrap()).await.unwrap_err();
        assert_eq!(err.to_string(), "invalid input syntax for type uuid");

        let err = check(send("/gotrue").await.unwrap()).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid login credentials");

        let err = check(send("/plain").await.unwrap()).await.unwrap_err();
        assert!(err.to_string().contains("502"));
    }
}
