use super::supabase::{SupabaseClient, check, error_message, is_unauthorized};
use crate::core::error::AuthError;
use crate::core::store::{Session, SessionProvider, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize, Default)]
struct UserMetadata {
    full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    email: Option<String>,
    #[serde(default)]
    user_metadata: Option<UserMetadata>,
}

impl From<AuthUser> for User {
    fn from(user: AuthUser) -> Self {
        User {
            id: user.id,
            email: user.email,
            full_name: user.user_metadata.and_then(|m| m.full_name),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .or_else(|| {
                self.expires_in
                    .map(|secs| now + chrono::Duration::seconds(secs))
            });
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user.into(),
        }
    }
}

#[derive(Debug)]
pub enum SignUpOutcome {
    SignedIn(Session),
    ConfirmationRequired(User),
}

/// Checks a new password before anything is sent to the backend.
pub fn validate_new_password(password: &str, confirmation: &str) -> Result<(), AuthError> {
    if password != confirmation {
        return Err(AuthError::PasswordMismatch);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::PasswordTooShort(MIN_PASSWORD_LEN));
    }
    Ok(())
}

fn sign_up_error(message: String) -> AuthError {
    let lower = message.to_lowercase();
    if lower.contains("already registered") || lower.contains("already exists") {
        AuthError::AlreadyRegistered
    } else if lower.contains("password should be at least") {
        AuthError::PasswordTooShort(MIN_PASSWORD_LEN)
    } else {
        AuthError::Rejected(message)
    }
}

/// GoTrue auth endpoints. A successful sign-in is stored on the shared
/// client so the REST calls run as that user.
pub struct SupabaseAuth {
    client: Arc<SupabaseClient>,
}

impl SupabaseAuth {
    pub fn new(client: Arc<SupabaseClient>) -> Self {
        Self { client }
    }

    #[instrument(name = "SupabaseSignIn", skip(self, password))]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let response = self
            .client
            .request(Method::POST, "/auth/v1/token?grant_type=password")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .context("Sign-in request failed")?;

        if !response.status().is_success() {
            return Err(AuthError::Rejected(error_message(response).await));
        }

        let token: TokenResponse = response
            .json()
            .await
            .context("Failed to parse sign-in response")?;
        let session = token.into_session(Utc::now());
        info!(user_id = %session.user.id, "Signed in");
        self.client.set_session(Some(session.clone()));
        Ok(session)
    }

    #[instrument(name = "SupabaseSignUp", skip(self, password, confirmation))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        confirmation: &str,
        full_name: &str,
    ) -> Result<SignUpOutcome, AuthError> {
        validate_new_password(password, confirmation)?;

        let response = self
            .client
            .request(Method::POST, "/auth/v1/signup")
            .json(&json!({
                "email": email,
                "password": password,
                "data": { "full_name": full_name },
            }))
            .send()
            .await
            .context("Sign-up request failed")?;

        if !response.status().is_success() {
            return Err(sign_up_error(error_message(response).await));
        }

        // A session when email confirmation is off, the bare user otherwise.
        let body: serde_json::Value = response
            .json()
            .await
            .context("Failed to parse sign-up response")?;
        if body.get("access_token").is_none() {
            let user: AuthUser =
                serde_json::from_value(body).context("Failed to parse sign-up user")?;
            return Ok(SignUpOutcome::ConfirmationRequired(user.into()));
        }

        let token: TokenResponse =
            serde_json::from_value(body).context("Failed to parse sign-up session")?;
        let session = token.into_session(Utc::now());
        self.client.set_session(Some(session.clone()));
        Ok(SignUpOutcome::SignedIn(session))
    }

    /// Exchanges the stored refresh token for a new session.
    #[instrument(name = "SupabaseRefreshSession", skip(self))]
    pub async fn refresh_session(&self) -> Result<Session, AuthError> {
        let refresh_token = self
            .client
            .session()
            .and_then(|s| s.refresh_token)
            .ok_or_else(|| AuthError::Rejected("No refresh token stored".to_string()))?;

        let response = self
            .client
            .request(Method::POST, "/auth/v1/token?grant_type=refresh_token")
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .context("Refresh request failed")?;

        if !response.status().is_success() {
            return Err(AuthError::Rejected(error_message(response).await));
        }

        let token: TokenResponse = response
            .json()
            .await
            .context("Failed to parse refresh response")?;
        let session = token.into_session(Utc::now());
        debug!(user_id = %session.user.id, "Refreshed session");
        self.client.set_session(Some(session.clone()));
        Ok(session)
    }

    /// Revokes the token on the backend. The local session is dropped even
    /// when the backend call fails.
    #[instrument(name = "SupabaseSignOut", skip(self))]
    pub async fn sign_out(&self) -> Result<()> {
        if self.client.session().is_none() {
            return Ok(());
        }
        let result = self
            .client
            .request(Method::POST, "/auth/v1/logout")
            .send()
            .await
            .context("Sign-out request failed");
        self.client.set_session(None);

        let response = result?;
        if !response.status().is_success() && !is_unauthorized(response.status()) {
            warn!(status = %response.status(), "Backend rejected sign-out");
        }
        Ok(())
    }
}

#[async_trait]
impl SessionProvider for SupabaseAuth {
    #[instrument(name = "SupabaseCurrentUser", skip(self))]
    async fn current_user(&self) -> Result<Option<User>> {
        if self.client.session().is_none() {
            debug!("No session");
            return Ok(None);
        }

        let response = self
            .client
            .request(Method::GET, "/auth/v1/user")
            .send()
            .await
            .context("User request failed")?;

        if is_unauthorized(response.status()) {
            debug!(status = %response.status(), "Session rejected");
            return Ok(None);
        }

        let user: AuthUser = check(response)
            .await?
            .json()
            .await
            .context("Failed to parse user response")?;
        Ok(Some(user.into()))
    }
}
