//! Session-scoped owner of the user's deals.
//!
//! The repository keeps the deal collection as an `Arc<Vec<Deal>>` that is
//! replaced wholesale after every successful store call, so readers always
//! see a consistent list. Mutations are not queued: concurrent calls apply
//! in the order their store requests complete.
use crate::core::deal::{Deal, DealDraft, DealPatch};
use crate::core::error::{DealError, Result};
use crate::core::store::{DealStore, SessionProvider};
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Idle,
    Loading,
    Ready,
    Error,
}

struct Shared {
    store: Arc<dyn DealStore>,
    session: Arc<dyn SessionProvider>,
    deals: watch::Sender<Arc<Vec<Deal>>>,
    status: watch::Sender<LoadStatus>,
    error: Mutex<Option<String>>,
}

impl Shared {
    fn error(&self) -> MutexGuard<'_, Option<String>> {
        self.error.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin_load(&self) {
        self.status.send_replace(LoadStatus::Loading);
    }

    fn finish_load(&self, result: anyhow::Result<Vec<Deal>>) {
        match result {
            Ok(deals) => {
                info!(count = deals.len(), "Loaded deals");
                self.deals.send_replace(Arc::new(deals));
                *self.error() = None;
                self.status.send_replace(LoadStatus::Ready);
            }
            Err(err) => {
                warn!(error = %err, "Failed to load deals");
                *self.error() = Some(format!("{err:#}"));
                self.status.send_replace(LoadStatus::Error);
            }
        }
    }
}

pub struct DealRepository {
    shared: Arc<Shared>,
}

impl DealRepository {
    /// Creates an idle repository with an empty collection.
    pub fn new(store: Arc<dyn DealStore>, session: Arc<dyn SessionProvider>) -> Self {
        let (deals, _) = watch::channel(Arc::new(Vec::new()));
        let (status, _) = watch::channel(LoadStatus::Idle);
        Self {
            shared: Arc::new(Shared {
                store,
                session,
                deals,
                status,
                error: Mutex::new(None),
            }),
        }
    }

    /// Creates a repository and starts the initial load in the background.
    ///
    /// Must be called from within a tokio runtime. If the repository is
    /// dropped before the load finishes, the result is discarded.
    pub fn activate(store: Arc<dyn DealStore>, session: Arc<dyn SessionProvider>) -> Self {
        let repo = Self::new(store, session);
        repo.shared.begin_load();

        let store = Arc::clone(&repo.shared.store);
        let target = Arc::downgrade(&repo.shared);
        tokio::spawn(async move {
            let result = store.list_deals().await;
            match target.upgrade() {
                Some(shared) => shared.finish_load(result),
                None => debug!("Repository dropped before initial load completed"),
            }
        });

        repo
    }

    /// Current collection, newest first.
    pub fn deals(&self) -> Arc<Vec<Deal>> {
        self.shared.deals.borrow().clone()
    }

    pub fn loading(&self) -> bool {
        self.status() == LoadStatus::Loading
    }

    /// Message from the last failed load, if any.
    pub fn error(&self) -> Option<String> {
        self.shared.error().clone()
    }

    pub fn status(&self) -> LoadStatus {
        *self.shared.status.borrow()
    }

    /// Receiver notified each time the collection is replaced.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Deal>>> {
        self.shared.deals.subscribe()
    }

    /// Waits until no load is in flight and returns the resulting status.
    pub async fn loaded(&self) -> LoadStatus {
        let mut status = self.shared.status.subscribe();
        match status.wait_for(|s| *s != LoadStatus::Loading).await {
            Ok(s) => *s,
            // Sender lives in `self`, so this is unreachable in practice.
            Err(_) => self.status(),
        }
    }

    /// Reloads the collection from the store. Failures are recorded in
    /// [`DealRepository::error`] and leave the collection as it was.
    #[instrument(name = "RefreshDeals", skip(self))]
    pub async fn refresh_deals(&self) {
        self.shared.begin_load();
        let result = self.shared.store.list_deals().await;
        self.shared.finish_load(result);
    }

    #[instrument(name = "CreateDeal", skip(self, draft), fields(name = %draft.name))]
    pub async fn create_deal(&self, draft: DealDraft) -> Result<Deal> {
        check_amount(draft.amount)?;

        let user = match self.shared.session.current_user().await {
            Ok(Some(user)) => user,
            Ok(None) => return Err(DealError::Unauthenticated),
            Err(err) => {
                warn!(error = %err, "Session lookup failed");
                return Err(DealError::Unauthenticated);
            }
        };

        let row = draft.into_new_deal(&user.id);
        let created = self
            .shared
            .store
            .insert_deal(&row)
            .await
            .map_err(|e| DealError::store(&e))?;

        debug!(id = %created.id, "Created deal");
        self.shared.deals.send_modify(|deals| {
            let mut next = Vec::with_capacity(deals.len() + 1);
            next.push(created.clone());
            next.extend(deals.iter().cloned());
            *deals = Arc::new(next);
        });
        Ok(created)
    }

    #[instrument(name = "UpdateDeal", skip(self, patch))]
    pub async fn update_deal(&self, id: &str, patch: DealPatch) -> Result<Deal> {
        if patch.is_empty() {
            return Err(DealError::Invalid("no fields to update".to_string()));
        }
        if let Some(amount) = patch.amount {
            check_amount(amount)?;
        }

        let updated = self
            .shared
            .store
            .update_deal(id, &patch)
            .await
            .map_err(|e| DealError::store(&e))?;

        debug!("Updated deal");
        self.shared.deals.send_modify(|deals| {
            let next = deals
                .iter()
                .map(|d| if d.id == id { updated.clone() } else { d.clone() })
                .collect();
            *deals = Arc::new(next);
        });
        Ok(updated)
    }

    #[instrument(name = "DeleteDeal", skip(self))]
    pub async fn delete_deal(&self, id: &str) -> Result<()> {
        self.shared
            .store
            .delete_deal(id)
            .await
            .map_err(|e| DealError::store(&e))?;

        debug!("Deleted deal");
        self.shared.deals.send_modify(|deals| {
            let next = deals.iter().filter(|d| d.id != id).cloned().collect();
            *deals = Arc::new(next);
        });
        Ok(())
    }
}

fn check_amount(amount: Decimal) -> Result<()> {
    if amount < Decimal::ZERO {
        return Err(DealError::Invalid(format!(
            "amount must not be negative: {amount}"
        )));
    }
    Ok(())
}
