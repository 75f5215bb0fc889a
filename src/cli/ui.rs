use crate::core::deal::Stage;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use rust_decimal::Decimal;
use std::time::Duration;

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    TotalLabel,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::TotalLabel => style(text).bold(),
        StyleType::Error => style(text).red(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Formats an amount with thousands separators, e.g. `125,000.00 USD`.
pub fn format_amount(amount: Decimal, currency: &str) -> String {
    let rounded = amount.round_dp(2);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part} {currency}")
}

pub fn amount_cell(amount: Decimal, currency: &str) -> Cell {
    Cell::new(format_amount(amount, currency))
        .add_attribute(Attribute::Bold)
        .set_alignment(CellAlignment::Right)
}

/// Stage badge: green when won, red when lost, blue while negotiating.
pub fn stage_cell(stage: Stage) -> Cell {
    let (label, color) = match stage {
        Stage::Won => ("Won", Color::Green),
        Stage::Lost => ("Lost", Color::Red),
        Stage::Negotiation => ("Negotiation", Color::Blue),
    };
    Cell::new(label).fg(color)
}

/// Percentage change, colored by whether the move is good news.
/// For costs a rise is bad, so `rise_is_good` flips the colors.
pub fn change_text(change: i32, rise_is_good: bool) -> String {
    let text = format!("{change:+}%");
    if (change > 0) == rise_is_good {
        style(text).green().to_string()
    } else {
        style(text).red().to_string()
    }
}

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// One bar per point, scaled against the largest value.
pub fn sparkline(values: &[i64]) -> String {
    let max = values.iter().copied().max().unwrap_or(0);
    if max <= 0 {
        return SPARK_LEVELS[0].to_string().repeat(values.len());
    }
    values
        .iter()
        .map(|&v| {
            let level = (v.max(0) * (SPARK_LEVELS.len() as i64 - 1)) / max;
            SPARK_LEVELS[level as usize]
        })
        .collect()
}

/// Creates a spinner shown while waiting on the backend.
pub fn new_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(Decimal::from(125000), "USD"), "125,000.00 USD");
        assert_eq!(format_amount(Decimal::new(9995, 1), "EUR"), "999.50 EUR");
        assert_eq!(format_amount(Decimal::ZERO, "USD"), "0.00 USD");
        assert_eq!(
            format_amount(Decimal::from(-1234567), "USD"),
            "-1,234,567.00 USD"
        );
    }

    #[test]
    fn test_sparkline_scales_to_max() {
        assert_eq!(sparkline(&[0, 50, 100]), "▁▄█");
        assert_eq!(sparkline(&[0, 0]), "▁▁");
        assert_eq!(sparkline(&[]), "");
        assert_eq!(sparkline(&[120, 150, 180, 160, 200, 220]).chars().count(), 6);
    }

    #[test]
    fn test_change_text_keeps_sign() {
        console::set_colors_enabled(false);
        assert_eq!(change_text(12, true), "+12%");
        assert_eq!(change_text(-8, false), "-8%");
    }
}
