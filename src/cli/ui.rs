use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

const PROGRESS_TEMPLATE: &str =
    "{spinner:.green} {msg:<12} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} tickers";

pub enum StyleType {
    Title,
    Label,
    Complete,
    Partial,
    Subtle,
}

pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::Label => style(text).bold(),
        StyleType::Complete => style(text).green().bold(),
        StyleType::Partial => style(text).yellow().bold(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Rounded UTF-8 table that wraps to the terminal width.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

pub fn count_cell(value: usize) -> Cell {
    Cell::new(value).set_alignment(CellAlignment::Right)
}

/// Green when a value was found, red "none" otherwise.
pub fn found_cell(value: Option<&str>) -> Cell {
    match value {
        Some(v) => Cell::new(v).fg(Color::Green),
        None => Cell::new("none").fg(Color::Red),
    }
}

/// Failed attempts before success; zero is dimmed.
pub fn attempts_cell(failed: usize) -> Cell {
    let color = if failed == 0 {
        Color::DarkGrey
    } else {
        Color::Yellow
    };
    count_cell(failed).fg(color)
}

/// Progress over the ticker universe; the message shows the last ticker done.
pub fn new_progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(PROGRESS_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}
