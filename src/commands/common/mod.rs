//! Text formatting shared across command modules.


/// Rendered in place of an empty value or cell.
pub const NONE_PLACEHOLDER: &str = "<none>";

/// Gap between columns in [`format_list`] output.
const COLUMN_GAP: &str = "  ";

/// Align `key|value` entries on their `=` sign.
///
/// Keys are padded to the widest key and empty values are rendered as
/// [`NONE_PLACEHOLDER`]. Lines are joined without a trailing newline.
pub fn format_kv<S: AsRef<str>>(entries: &[S]) -> String {
    let pairs: Vec<(&str, &str)> = entries
        .iter()
        .map(|entry| {
            let entry = entry.as_ref();
            entry.split_once('|').unwrap_or((entry, ""))
        })
        .collect();

    let width = pairs
        .iter()
        .map(|(key, _)| key.chars().count())
        .max()
        .unwrap_or(0);

    pairs
        .iter()
        .map(|(key, value)| format!("{key:<width$} = {}", or_placeholder(value)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Align pipe-delimited rows into columns.
///
/// Empty cells are rendered as [`NONE_PLACEHOLDER`]; columns are separated by
/// two spaces and trailing padding is trimmed from every row.
pub fn format_list<S: AsRef<str>>(rows: &[S]) -> String {
    let cells: Vec<Vec<&str>> = rows
        .iter()
        .map(|row| row.as_ref().split('|').map(or_placeholder).collect())
        .collect();

    let mut widths: Vec<usize> = Vec::new();
    for row in &cells {
        for (i, cell) in row.iter().enumerate() {
            let len = cell.chars().count();
            match widths.get_mut(i) {
                Some(width) => *width = (*width).max(len),
                None => widths.push(len),
            }
        }
    }

    cells
        .iter()
        .map(|row| {
            let line = row
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{cell:<width$}"))
                .collect::<Vec<_>>()
                .join(COLUMN_GAP);
            line.trim_end().to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn or_placeholder(value: &str) -> &str {
    if value.is_empty() {
        NONE_PLACEHOLDER
    } else {
        value
    }
}
