//! Abstractions over the remote deal table and the auth session

use crate::core::deal::{Deal, DealPatch, NewDeal};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row storage for deals. Implementations decide ownership filtering;
/// `list_deals` returns rows newest `deal_date` first.
#[async_trait]
pub trait DealStore: Send + Sync {
    async fn list_deals(&self) -> Result<Vec<Deal>>;
    async fn insert_deal(&self, row: &NewDeal) -> Result<Deal>;
    /// Fails when no row matches `id`.
    async fn update_deal(&self, id: &str, patch: &DealPatch) -> Result<Deal>;
    /// Fails when no row matches `id`.
    async fn delete_deal(&self, id: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
}

impl User {
    /// Name shown to the user: full name if known, else the email.
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or("User")
    }
}

/// Tokens issued by the auth backend for a signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub user: User,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// `Ok(None)` when nobody is signed in.
    async fn current_user(&self) -> Result<Option<User>>;
}

/// A session fixed at construction time.
#[derive(Debug, Clone, Default)]
pub struct StaticSession {
    user: Option<User>,
}

impl StaticSession {
    pub fn signed_in(user_id: &str) -> Self {
        Self {
            user: Some(User {
                id: user_id.to_string(),
                email: None,
                full_name: None,
            }),
        }
    }

    pub fn anonymous() -> Self {
        Self { user: None }
    }
}

#[async_trait]
impl SessionProvider for StaticSession {
    async fn current_user(&self) -> Result<Option<User>> {
        Ok(self.user.clone())
    }
}
