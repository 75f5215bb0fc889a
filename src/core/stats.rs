//! Aggregate sales figures derived from the deal collection.
//!
//! Expenses, trend series and percentage changes are simulated constants
//! until real expense and history data exist.
use crate::core::deal::{Deal, Stage};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

pub const SERIES_LEN: usize = 6;

const SALES_CHANGE: i32 = 12;
const EXPENSES_CHANGE: i32 = -8;
const PROFIT_CHANGE: i32 = 18;
const SALES_SERIES: [i64; SERIES_LEN] = [120, 150, 180, 160, 200, 220];
const EXPENSES_SERIES: [i64; SERIES_LEN] = [80, 95, 110, 100, 125, 135];

/// Monthly revenue sample shown by the dashboard chart.
pub const REVENUE_SERIES: [(&str, i64); SERIES_LEN] = [
    ("Jan", 15000),
    ("Feb", 18500),
    ("Mar", 22000),
    ("Apr", 19500),
    ("May", 25000),
    ("Jun", 28000),
];

#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsSnapshot {
    pub total_sales: Decimal,
    pub sales_change: i32,
    pub operating_expenses: Decimal,
    pub expenses_change: i32,
    pub gross_profit: Decimal,
    pub profit_change: i32,
    pub sales_data: [i64; SERIES_LEN],
    pub expenses_data: [i64; SERIES_LEN],
    pub profit_data: [i64; SERIES_LEN],
}

impl Default for StatisticsSnapshot {
    fn default() -> Self {
        Self {
            total_sales: Decimal::ZERO,
            sales_change: 0,
            operating_expenses: Decimal::ZERO,
            expenses_change: 0,
            gross_profit: Decimal::ZERO,
            profit_change: 0,
            sales_data: [0; SERIES_LEN],
            expenses_data: [0; SERIES_LEN],
            profit_data: [0; SERIES_LEN],
        }
    }
}

/// Share of sales booked as operating expenses (0.4).
fn expense_ratio() -> Decimal {
    Decimal::new(4, 1)
}

/// Builds a snapshot from `deals`, or `None` when there is nothing to
/// aggregate.
pub fn compute_snapshot(deals: &[Deal]) -> Option<StatisticsSnapshot> {
    if deals.is_empty() {
        return None;
    }

    let total_sales: Decimal = deals
        .iter()
        .filter(|d| d.stage == Stage::Won)
        .map(|d| d.amount)
        .sum();
    let operating_expenses = total_sales * expense_ratio();
    let gross_profit = total_sales - operating_expenses;

    let mut profit_data = [0; SERIES_LEN];
    for (i, profit) in profit_data.iter_mut().enumerate() {
        *profit = SALES_SERIES[i] - EXPENSES_SERIES[i];
    }

    Some(StatisticsSnapshot {
        total_sales,
        sales_change: SALES_CHANGE,
        operating_expenses,
        expenses_change: EXPENSES_CHANGE,
        gross_profit,
        profit_change: PROFIT_CHANGE,
        sales_data: SALES_SERIES,
        expenses_data: EXPENSES_SERIES,
        profit_data,
    })
}

/// Holds the latest snapshot and refreshes it when the deal collection
/// is replaced.
#[derive(Debug, Default)]
pub struct StatisticsEngine {
    snapshot: StatisticsSnapshot,
}

impl StatisticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> &StatisticsSnapshot {
        &self.snapshot
    }

    /// An empty collection keeps the previous snapshot instead of
    /// resetting it.
    pub fn recompute(&mut self, deals: &[Deal]) -> &StatisticsSnapshot {
        match compute_snapshot(deals) {
            Some(snapshot) => {
                debug!(total_sales = %snapshot.total_sales, "Recomputed statistics");
                self.snapshot = snapshot;
            }
            None => debug!("No deals, keeping previous statistics"),
        }
        &self.snapshot
    }

    /// Recomputes if the collection was replaced since the last call.
    /// Returns whether a recompute happened.
    pub fn sync(&mut self, deals: &mut watch::Receiver<Arc<Vec<Deal>>>) -> bool {
        if !deals.has_changed().unwrap_or(false) {
            return false;
        }
        let current = deals.borrow_and_update().clone();
        self.recompute(&current);
        true
    }

    /// Waits for the next collection replacement and recomputes.
    /// Returns `None` once the repository is gone.
    pub async fn changed(
        &mut self,
        deals: &mut watch::Receiver<Arc<Vec<Deal>>>,
    ) -> Option<&StatisticsSnapshot> {
        deals.changed().await.ok()?;
        let current = deals.borrow_and_update().clone();
        Some(self.recompute(&current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn deal(id: &str, amount: i64, stage: Stage) -> Deal {
        Deal {
            id: id.to_string(),
            user_id: "u-1".to_string(),
            name: format!("Deal {id}"),
            company: "Acme".to_string(),
            amount: Decimal::from(amount),
            deal_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            owner: "Ana".to_string(),
            stage,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_only_won_deals_count() {
        let deals = vec![
            deal("1", 125000, Stage::Won),
            deal("2", 45000, Stage::Negotiation),
            deal("3", 9000, Stage::Lost),
            deal("4", 5000, Stage::Won),
        ];

        let snapshot = compute_snapshot(&deals).unwrap();
        assert_eq!(snapshot.total_sales, Decimal::from(130000));
        assert_eq!(snapshot.operating_expenses, Decimal::from(52000));
        assert_eq!(snapshot.gross_profit, Decimal::from(78000));
    }

    #[test]
    fn test_profit_invariants() {
        let deals = vec![deal("1", 33333, Stage::Won), deal("2", 7, Stage::Won)];
        let snapshot = compute_snapshot(&deals).unwrap();

        assert_eq!(
            snapshot.gross_profit,
            snapshot.total_sales - snapshot.operating_expenses
        );
        assert_eq!(
            snapshot.operating_expenses,
            snapshot.total_sales * Decimal::new(4, 1)
        );
        for i in 0..SERIES_LEN {
            assert_eq!(
                snapshot.profit_data[i],
                snapshot.sales_data[i] - snapshot.expenses_data[i]
            );
        }
        assert_eq!(snapshot.profit_data, [40, 55, 70, 60, 75, 85]);
        assert_eq!(
            (snapshot.sales_change, snapshot.expenses_change, snapshot.profit_change),
            (12, -8, 18)
        );
    }

    #[test]
    fn test_no_won_deals_gives_zero_totals() {
        let deals = vec![deal("1", 1000, Stage::Negotiation)];
        let snapshot = compute_snapshot(&deals).unwrap();
        assert_eq!(snapshot.total_sales, Decimal::ZERO);
        assert_eq!(snapshot.sales_data, SALES_SERIES);
    }

    #[test]
    fn test_empty_collection_keeps_previous_snapshot() {
        let mut engine = StatisticsEngine::new();
        assert_eq!(engine.snapshot(), &StatisticsSnapshot::default());

        engine.recompute(&[deal("1", 1000, Stage::Won)]);
        let before = engine.snapshot().clone();
        assert_eq!(before.total_sales, Decimal::from(1000));

        engine.recompute(&[]);
        assert_eq!(engine.snapshot(), &before);
    }

    #[tokio::test]
    async fn test_sync_follows_collection_replacements() {
        let (tx, mut rx) = watch::channel(Arc::new(Vec::new()));
        let mut engine = StatisticsEngine::new();

        assert!(!engine.sync(&mut rx));

        tx.send_replace(Arc::new(vec![deal("1", 2000, Stage::Won)]));
        assert!(engine.sync(&mut rx));
        assert_eq!(engine.snapshot().total_sales, Decimal::from(2000));
        assert!(!engine.sync(&mut rx));

        tx.send_replace(Arc::new(vec![
            deal("1", 2000, Stage::Won),
            deal("2", 500, Stage::Won),
        ]));
        let snapshot = engine.changed(&mut rx).await.unwrap();
        assert_eq!(snapshot.total_sales, Decimal::from(2500));

        drop(tx);
        assert!(engine.changed(&mut rx).await.is_none());
    }
}
