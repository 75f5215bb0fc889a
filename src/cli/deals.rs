use super::ui;
use crate::core::deal::{Deal, DealDraft, DealPatch};
use crate::core::repository::{DealRepository, LoadStatus};
use anyhow::{Result, anyhow, bail};
use comfy_table::{Cell, Table};
use futures::future::join_all;

/// Case-insensitive match on name, company or owner. An empty query keeps
/// everything.
pub fn filter_deals<'a>(deals: &'a [Deal], query: &str) -> Vec<&'a Deal> {
    let needle = query.trim().to_lowercase();
    deals
        .iter()
        .filter(|d| {
            needle.is_empty()
                || d.name.to_lowercase().contains(&needle)
                || d.company.to_lowercase().contains(&needle)
                || d.owner.to_lowercase().contains(&needle)
        })
        .collect()
}

pub fn deals_table(deals: &[&Deal], currency: &str) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("ID"),
        ui::header_cell("Deal"),
        ui::header_cell("Company"),
        ui::header_cell("Amount"),
        ui::header_cell("Date"),
        ui::header_cell("Owner"),
        ui::header_cell("Stage"),
    ]);

    for deal in deals {
        table.add_row(vec![
            Cell::new(&deal.id),
            Cell::new(&deal.name),
            Cell::new(&deal.company),
            ui::amount_cell(deal.amount, currency),
            Cell::new(deal.deal_date.format("%Y-%m-%d")),
            Cell::new(&deal.owner),
            ui::stage_cell(deal.stage),
        ]);
    }
    table
}

/// Renders the deal list, or a hint when there is nothing to show.
pub fn render_deals(deals: &[&Deal], currency: &str) -> String {
    if deals.is_empty() {
        return format!(
            "{}\n{}",
            ui::style_text("No deals yet", ui::StyleType::Subtle),
            ui::style_text(
                "Create your first deal with `dealboard add`",
                ui::StyleType::Subtle
            )
        );
    }
    deals_table(deals, currency).to_string()
}

/// Waits for the repository's initial load behind a spinner.
pub async fn wait_for_deals(repo: &DealRepository) -> LoadStatus {
    let pb = ui::new_spinner("Loading deals...");
    let status = repo.loaded().await;
    pb.finish_and_clear();
    status
}

pub async fn list(repo: &DealRepository, search: Option<&str>, currency: &str) -> Result<()> {
    let status = wait_for_deals(repo).await;
    let deals = repo.deals();
    let shown = filter_deals(&deals, search.unwrap_or_default());

    if status == LoadStatus::Error {
        let message = repo.error().unwrap_or_default();
        println!("{}", ui::style_text(&message, ui::StyleType::Error));
    }
    println!("{}", render_deals(&shown, currency));

    if status == LoadStatus::Error {
        bail!("Failed to load deals: {}", repo.error().unwrap_or_default());
    }
    Ok(())
}

pub async fn add(repo: &DealRepository, draft: DealDraft, currency: &str) -> Result<()> {
    let created = repo.create_deal(draft).await?;
    println!("Created deal {}", ui::style_text(&created.id, ui::StyleType::TotalLabel));
    println!("{}", deals_table(&[&created], currency));
    Ok(())
}

pub async fn edit(repo: &DealRepository, id: &str, patch: DealPatch, currency: &str) -> Result<()> {
    let updated = repo.update_deal(id, patch).await?;
    println!("Updated deal {}", ui::style_text(&updated.id, ui::StyleType::TotalLabel));
    println!("{}", deals_table(&[&updated], currency));
    Ok(())
}

/// Deletes all `ids` concurrently and reports each outcome.
pub async fn delete(repo: &DealRepository, ids: &[String]) -> Result<()> {
    let results = join_all(ids.iter().map(|id| async move {
        (id, repo.delete_deal(id).await)
    }))
    .await;

    let mut failed = 0;
    for (id, result) in results {
        match result {
            Ok(()) => println!("Deleted deal {id}"),
            Err(e) => {
                failed += 1;
                println!(
                    "{}",
                    ui::style_text(&format!("Could not delete {id}: {e}"), ui::StyleType::Error)
                );
            }
        }
    }

    if failed > 0 {
        return Err(anyhow!("{} of {} deletions failed", failed, ids.len()));
    }
    Ok(())
}
