use crate::core::deal::{Deal, DealPatch, NewDeal};
use crate::core::store::DealStore;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory deal table. Assigns ids and timestamps like the hosted one.
pub struct MemoryDealStore {
    rows: Arc<Mutex<Vec<Deal>>>,
    next_id: AtomicU64,
}

impl MemoryDealStore {
    pub fn new() -> Self {
        Self::with_deals(Vec::new())
    }

    pub fn with_deals(deals: Vec<Deal>) -> Self {
        Self {
            next_id: AtomicU64::new(deals.len() as u64 + 1),
            rows: Arc::new(Mutex::new(deals)),
        }
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }
}

impl Default for MemoryDealStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DealStore for MemoryDealStore {
    async fn list_deals(&self) -> Result<Vec<Deal>> {
        let mut deals = self.rows.lock().await.clone();
        deals.sort_by(|a, b| b.deal_date.cmp(&a.deal_date));
        debug!(count = deals.len(), "Memory store SELECT");
        Ok(deals)
    }

    async fn insert_deal(&self, row: &NewDeal) -> Result<Deal> {
        let now = Utc::now();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let deal = Deal {
            id: format!("deal-{id}"),
            user_id: row.user_id.clone(),
            name: row.name.clone(),
            company: row.company.clone(),
            amount: row.amount,
            deal_date: row.deal_date,
            owner: row.owner.clone(),
            stage: row.stage,
            created_at: now,
            updated_at: now,
        };

        let mut rows = self.rows.lock().await;
        debug!(id = %deal.id, "Memory store INSERT");
        rows.push(deal.clone());
        Ok(deal)
    }

    async fn update_deal(&self, id: &str, patch: &DealPatch) -> Result<Deal> {
        let mut rows = self.rows.lock().await;
        let row = rows
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| anyhow!("Deal not found: {}", id))?;

        let mut updated = patch.apply_to(row);
        updated.updated_at = Utc::now();
        *row = updated.clone();
        debug!(%id, "Memory store UPDATE");
        Ok(updated)
    }

    async fn delete_deal(&self, id: &str) -> Result<()> {
        let mut rows = self.rows.lock().await;
        let position = rows
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| anyhow!("Deal not found: {}", id))?;
        rows.remove(position);
        debug!(%id, "Memory store DELETE");
        Ok(())
    }
}
