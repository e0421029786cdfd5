//! Plain-text tables for CLI listings.
//!
//! Cells are measured with `unicode-width` so wide characters keep columns
//! aligned. Rows can be built from JSON objects by naming dotted key paths
//! (`app.category.name`).

use std::fmt;

use serde_json::Value;
use unicode_width::UnicodeWidthStr;

use crate::date_handling::{format_timestamp, is_date_like_key};

/// Bordered table with a header row.
#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row; missing cells render empty and extra cells are dropped.
    pub fn add_row(&mut self, mut row: Vec<String>) {
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    /// Build a table from JSON objects, one row per item, reading `keys` as dotted paths.
    pub fn from_json_items<S: AsRef<str>>(headers: &[S], keys: &[S], items: &[Value]) -> Self {
        let mut table = Self::new(headers.iter().map(|header| header.as_ref().to_string()));
        for item in items {
            table.add_row(keys.iter().map(|key| json_cell(item, key.as_ref())).collect());
        }
        table
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|header| header.width()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.width());
            }
        }
        widths
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths = self.column_widths();
        let border = widths.iter().fold(String::from("+"), |mut line, width| {
            line.push_str(&"-".repeat(width + 2));
            line.push('+');
            line
        });
        let render_row = |cells: &[String]| {
            cells.iter().zip(&widths).fold(String::from("|"), |mut line, (cell, width)| {
                line.push(' ');
                line.push_str(cell);
                line.push_str(&" ".repeat(width - cell.width() + 1));
                line.push('|');
                line
            })
        };

        writeln!(f, "{border}")?;
        writeln!(f, "{}", render_row(&self.headers))?;
        writeln!(f, "{border}")?;
        for row in &self.rows {
            writeln!(f, "{}", render_row(row))?;
        }
        write!(f, "{border}")
    }
}

/// Stringify the value at a dotted `path` of a JSON object for display.
pub fn json_cell(item: &Value, path: &str) -> String {
    let value = path.split('.').try_fold(item, |current, segment| match current {
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|index| items.get(index)),
        other => other.get(segment),
    });
    let leaf = path.rsplit('.').next().unwrap_or(path);
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) if is_date_like_key(leaf) => format_timestamp(text),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}
