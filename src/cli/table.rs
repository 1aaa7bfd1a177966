//! Boxed table rendering for `--output table`

use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Render rows as a rounded box table
pub fn render<T: Tabled>(rows: &[T]) -> String {
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    table.to_string()
}
