//! Terminal output helpers shared by the subcommands.
//!
//! Global flags are published through `MAPS_HARVEST_*` environment
//! variables by `main` so every module can check them.

use maps_harvest::{Listing, ListingTable, COLUMNS};

/// Widest a preview cell may get before it is truncated.
const MAX_CELL_WIDTH: usize = 40;

pub fn is_json() -> bool {
    std::env::var_os("MAPS_HARVEST_JSON").is_some()
}

pub fn is_quiet() -> bool {
    std::env::var_os("MAPS_HARVEST_QUIET").is_some()
}

fn use_color() -> bool {
    std::env::var_os("MAPS_HARVEST_NO_COLOR").is_none() && std::env::var_os("NO_COLOR").is_none()
}

/// Print a value as pretty JSON on stdout.
pub fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("  failed to encode JSON output: {e}"),
    }
}

/// Status symbols, colored unless disabled.
pub struct Styled {
    color: bool,
}

impl Styled {
    pub fn new() -> Self {
        Self { color: use_color() }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    pub fn ok_sym(&self) -> String {
        self.paint("32", "✓")
    }

    pub fn warn_sym(&self) -> String {
        self.paint("33", "!")
    }

    pub fn err_sym(&self) -> String {
        self.paint("31", "✗")
    }

    pub fn bold(&self, text: &str) -> String {
        self.paint("1", text)
    }
}

impl Default for Styled {
    fn default() -> Self {
        Self::new()
    }
}

/// Render the first `limit` rows as a fixed-width text table.
pub fn render_preview(rows: &[Listing]) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|l| l.to_row().into_iter().map(|c| truncate(&c)).collect())
        .collect();

    let mut widths: Vec<usize> = COLUMNS.iter().map(|c| c.chars().count()).collect();
    for row in &cells {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let header: Vec<String> = COLUMNS.iter().map(|c| c.to_string()).collect();
    push_line(&mut out, "", &header, &widths);
    for (i, row) in cells.iter().enumerate() {
        push_line(&mut out, &i.to_string(), row, &widths);
    }
    out
}

fn push_line(out: &mut String, index: &str, row: &[String], widths: &[usize]) {
    out.push_str(&format!("{index:>3}"));
    for (cell, width) in row.iter().zip(widths) {
        let pad = width - cell.chars().count();
        out.push_str("  ");
        out.push_str(cell);
        out.push_str(&" ".repeat(pad));
    }
    let trimmed = out.trim_end_matches(' ').len();
    out.truncate(trimmed);
    out.push('\n');
}

fn truncate(cell: &str) -> String {
    if cell.chars().count() <= MAX_CELL_WIDTH {
        return cell.to_string();
    }
    let mut short: String = cell.chars().take(MAX_CELL_WIDTH - 1).collect();
    short.push('…');
    short
}

/// Print the preview to stdout unless quiet.
pub fn print_preview(table: &ListingTable, limit: usize) {
    if is_quiet() || limit == 0 {
        return;
    }
    print!("{}", render_preview(table.head(limit)));
}
