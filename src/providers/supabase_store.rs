use super::supabase::{SupabaseClient, check};
use super::util::{RetryPolicy, with_retry};
use crate::core::deal::{Deal, DealPatch, NewDeal};
use crate::core::store::DealStore;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Method;
use std::sync::Arc;
use tracing::{debug, instrument};

const TABLE_PATH: &str = "/rest/v1/deals";

/// `deals` table served by PostgREST. Row-level security on the backend
/// limits every query to the signed-in user's rows.
pub struct SupabaseDealStore {
    client: Arc<SupabaseClient>,
    retry: RetryPolicy,
}

impl SupabaseDealStore {
    pub fn new(client: Arc<SupabaseClient>) -> Self {
        Self {
            client,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// PostgREST row filter for a single id. Passed through `query` so
    /// characters like `#` and `&` stay part of the value.
    fn id_filter(id: &str) -> [(&'static str, String); 1] {
        [("id", format!("eq.{id}"))]
    }

    /// PostgREST answers writes with an array of the affected rows.
    async fn single_row(response: reqwest::Response, id: &str) -> Result<Deal> {
        let rows: Vec<Deal> = check(response)
            .await?
            .json()
            .await
            .context("Failed to parse deal rows")?;
        rows.into_iter()
            .next()
            .ok_or_else(|| anyhow!("Deal not found: {}", id))
    }
}

#[async_trait]
impl DealStore for SupabaseDealStore {
    #[instrument(name = "SupabaseListDeals", skip(self))]
    async fn list_deals(&self) -> Result<Vec<Deal>> {
        let response = with_retry(
            || {
                self.client
                    .request(Method::GET, TABLE_PATH)
                    .query(&[("select", "*"), ("order", "deal_date.desc")])
                    .send()
            },
            self.retry,
        )
        .await
        .context("Deals request failed")?;

        let deals: Vec<Deal> = check(response)
            .await?
            .json()
            .await
            .context("Failed to parse deals response")?;
        debug!(count = deals.len(), "Fetched deals");
        Ok(deals)
    }

    #[instrument(name = "SupabaseInsertDeal", skip(self, row), fields(name = %row.name))]
    async fn insert_deal(&self, row: &NewDeal) -> Result<Deal> {
        let response = self
            .client
            .request(Method::POST, TABLE_PATH)
            .header("Prefer", "return=representation")
            .json(&[row])
            .send()
            .await
            .context("Insert request failed")?;

        let rows: Vec<Deal> = check(response)
            .await?
            .json()
            .await
            .context("Failed to parse inserted deal")?;
        rows.into_iter()
            .next()
            .ok_or_else(|| anyhow!("Insert returned no rows"))
    }

    #[instrument(name = "SupabaseUpdateDeal", skip(self, patch))]
    async fn update_deal(&self, id: &str, patch: &DealPatch) -> Result<Deal> {
        let response = self
            .client
            .request(Method::PATCH, TABLE_PATH)
            .query(&Self::id_filter(id))
            .header("Prefer", "return=representation")
            .json(patch)
            .send()
            .await
            .context("Update request failed")?;

        Self::single_row(response, id).await
    }

    #[instrument(name = "SupabaseDeleteDeal", skip(self))]
    async fn delete_deal(&self, id: &str) -> Result<()> {
        let response = self
            .client
            .request(Method::DELETE, TABLE_PATH)
            .query(&Self::id_filter(id))
            .header("Prefer", "return=representation")
            .send()
            .await
            .context("Delete request failed")?;

        Self::single_row(response, id).await.map(|_| ())
    }
}
