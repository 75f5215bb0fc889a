use super::{deals, ui};
use crate::core::deal::Deal;
use crate::core::repository::{DealRepository, LoadStatus};
use crate::core::stats::{REVENUE_SERIES, StatisticsEngine, StatisticsSnapshot};
use crate::core::store::User;
use anyhow::{Result, bail};
use comfy_table::{Cell, CellAlignment};
use rust_decimal::Decimal;

/// Sales, expenses and profit cards side by side.
pub fn stats_cards(snapshot: &StatisticsSnapshot, currency: &str) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Total Sales"),
        ui::header_cell("Operating Expenses"),
        ui::header_cell("Gross Profit"),
    ]);

    let cards: [(Decimal, i32, bool, &[i64]); 3] = [
        (snapshot.total_sales, snapshot.sales_change, true, &snapshot.sales_data),
        (
            snapshot.operating_expenses,
            snapshot.expenses_change,
            false,
            &snapshot.expenses_data,
        ),
        (snapshot.gross_profit, snapshot.profit_change, true, &snapshot.profit_data),
    ];

    table.add_row(
        cards
            .iter()
            .map(|(value, _, _, _)| ui::amount_cell(*value, currency))
            .collect::<Vec<_>>(),
    );
    table.add_row(
        cards
            .iter()
            .map(|(_, change, rise_is_good, series)| {
                Cell::new(format!(
                    "{}  {}",
                    ui::change_text(*change, *rise_is_good),
                    ui::sparkline(series)
                ))
                .set_alignment(CellAlignment::Right)
            })
            .collect::<Vec<_>>(),
    );
    table.to_string()
}

/// Monthly revenue as horizontal bars.
pub fn revenue_chart(currency: &str) -> String {
    const WIDTH: i64 = 30;
    let max = REVENUE_SERIES.iter().map(|(_, v)| *v).max().unwrap_or(1).max(1);

    let mut lines = vec![ui::style_text("Revenue", ui::StyleType::Title)];
    for (month, amount) in REVENUE_SERIES {
        let bar = "█".repeat((amount * WIDTH / max) as usize);
        lines.push(format!(
            "{month} {bar} {}",
            ui::style_text(
                &ui::format_amount(Decimal::from(amount), currency),
                ui::StyleType::Subtle
            )
        ));
    }
    lines.join("\n")
}

pub fn render_dashboard(
    user: Option<&User>,
    snapshot: &StatisticsSnapshot,
    deals: &[Deal],
    currency: &str,
) -> String {
    let greeting = match user {
        Some(user) => format!("Dashboard: {}", user.display_name()),
        None => "Dashboard".to_string(),
    };
    let recent: Vec<&Deal> = deals.iter().collect();

    format!(
        "{}\n\n{}\n\n{}\n\n{}\n{}",
        ui::style_text(&greeting, ui::StyleType::Title),
        stats_cards(snapshot, currency),
        revenue_chart(currency),
        ui::style_text("Recent Deals", ui::StyleType::Title),
        deals::render_deals(&recent, currency)
    )
}

pub async fn run(repo: &DealRepository, user: Option<&User>, currency: &str) -> Result<()> {
    let status = deals::wait_for_deals(repo).await;
    if status == LoadStatus::Error {
        bail!("Failed to load deals: {}", repo.error().unwrap_or_default());
    }

    let mut engine = StatisticsEngine::new();
    let current = repo.deals();
    engine.recompute(&current);

    println!(
        "{}",
        render_dashboard(user, engine.snapshot(), &current, currency)
    );
    Ok(())
}
