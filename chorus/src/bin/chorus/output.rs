use anyhow::Result;
use chorus::{
    GroupView, Listing, PostView, UserView,
    auth::{Claims, Refreshed, TokenPair},
};
use clap::ValueEnum;
use colored::{Color, Colorize};
use comfy_table::{Attribute, Cell, Color as TableColor, Table};
use serde::Serialize;
use std::io::Write;

use crate::theme::{ICONS, THEME};

/// Output format options for CLI commands
#[derive(Clone, Debug, ValueEnum, Default, PartialEq)]
pub enum OutputFormat {
    /// Formatted table output (default)
    #[default]
    Table,
    /// JSON output for scripting
    Json,
    /// Compact single-line output
    Compact,
}

#[derive(Clone, Debug, Default)]
pub struct GlobalOptions {
    pub output_format: OutputFormat,
    pub quiet: bool,
    pub verbose: bool,
    pub no_color: bool,
}

/// Data that can be rendered as a table or a single line.
pub trait TableDisplay {
    fn to_table(&self, output: &OutputManager) -> Table;
    fn to_compact(&self) -> String;
}

pub struct OutputManager {
    pub options: GlobalOptions,
}

impl OutputManager {
    pub fn new(options: GlobalOptions) -> Self {
        Self { options }
    }

    /// Display data according to the configured output format
    pub fn display<T>(&self, data: &T) -> Result<()>
    where
        T: Serialize + TableDisplay,
    {
        if self.options.quiet {
            return Ok(());
        }

        match self.options.output_format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(data)?;
                println!("{json}");
            }
            OutputFormat::Table => {
                println!("{}", data.to_table(self));
            }
            OutputFormat::Compact => {
                println!("{}", data.to_compact());
            }
        }
        Ok(())
    }

    /// Status lines go quiet under `--quiet` and `--output json`.
    fn chatty(&self) -> bool {
        !self.options.quiet && self.options.output_format != OutputFormat::Json
    }

    fn paint(&self, glyph: &str, message: &str, color: Color) -> String {
        if self.options.no_color {
            format!("{glyph} {message}")
        } else {
            format!("{} {}", glyph.color(color), message.color(color))
        }
    }

    pub fn success(&self, message: &str) {
        if self.chatty() {
            println!("{}", self.paint(ICONS.ok, message, THEME.ok));
        }
    }

    /// Errors print even under `--quiet`.
    pub fn error(&self, message: &str) {
        eprintln!("{}", self.paint(ICONS.failure, message, THEME.failure));
    }

    pub fn warning(&self, message: &str) {
        if self.chatty() {
            println!("{}", self.paint(ICONS.caution, message, THEME.caution));
        }
    }

    pub fn info(&self, message: &str) {
        if self.chatty() {
            println!("{}", self.paint(ICONS.note, message, THEME.note));
        }
    }

    /// Diagnostics for `--verbose`, written to stderr.
    pub fn verbose(&self, message: &str) {
        if self.options.verbose && !self.options.quiet {
            eprintln!("{}", self.paint(ICONS.arrow, message, THEME.faint));
        }
    }

    pub fn heading(&self, text: &str) {
        if !self.chatty() {
            return;
        }
        if self.options.no_color {
            println!("\n{text}\n{}", "=".repeat(text.chars().count()));
        } else {
            println!("\n{}", text.color(THEME.title).bold());
        }
    }

    /// Transient single-line status, overwritten by `clear_line`.
    pub fn progress(&self, message: &str) {
        if self.chatty() {
            let line = self.paint(ICONS.pending, &format!("{message}..."), THEME.accent);
            print!("\r{line}");
            std::io::stdout().flush().ok();
        }
    }

    pub fn clear_line(&self) {
        if self.chatty() {
            print!("\r{:80}\r", "");
            std::io::stdout().flush().ok();
        }
    }

    pub fn create_table(&self) -> Table {
        let mut table = Table::new();
        if self.options.no_color {
            table.load_preset(comfy_table::presets::ASCII_FULL);
        } else {
            table.load_preset(comfy_table::presets::UTF8_FULL_CONDENSED);
        }
        table
    }

    pub fn add_table_header(&self, table: &mut Table, headers: &[&str]) {
        let header_cells: Vec<Cell> = headers
            .iter()
            .map(|header| {
                let cell = Cell::new(header).add_attribute(Attribute::Bold);
                if self.options.no_color {
                    cell
                } else {
                    cell.fg(TableColor::Cyan)
                }
            })
            .collect();
        table.set_header(header_cells);
    }

    fn key_value_table(&self, rows: &[(&str, String)]) -> Table {
        let mut table = self.create_table();
        for (key, value) in rows {
            table.add_row(vec![Cell::new(key).add_attribute(Attribute::Bold), Cell::new(value)]);
        }
        table
    }
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map(|value| value.to_string()).unwrap_or_else(|| "-".to_string())
}

fn excerpt(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

impl TableDisplay for UserView {
    fn to_table(&self, output: &OutputManager) -> Table {
        output.key_value_table(&[
            ("id", self.id.to_string()),
            ("handle", self.handle.clone()),
            ("role", format!("{:?}", self.role).to_lowercase()),
            ("joined", self.joined_at.to_rfc3339()),
        ])
    }

    fn to_compact(&self) -> String {
        format!("{} {}", self.id, self.handle)
    }
}

impl TableDisplay for GroupView {
    fn to_table(&self, output: &OutputManager) -> Table {
        output.key_value_table(&[
            ("id", self.id.to_string()),
            ("slug", self.slug.clone()),
            ("title", self.title.clone()),
            ("description", self.description.clone()),
        ])
    }

    fn to_compact(&self) -> String {
        format!("{} {}", self.id, self.slug)
    }
}

impl TableDisplay for Listing<GroupView> {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table();
        output.add_table_header(&mut table, &["ID", "Slug", "Title"]);
        for group in &self.items {
            table.add_row(vec![
                Cell::new(group.id),
                Cell::new(&group.slug),
                Cell::new(&group.title),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        format!("{} of {} groups", self.items.len(), self.count)
    }
}

impl TableDisplay for PostView {
    fn to_table(&self, output: &OutputManager) -> Table {
        output.key_value_table(&[
            ("id", self.id.to_string()),
            ("author", self.author.clone()),
            ("published", self.pub_date.to_rfc3339()),
            ("group", or_dash(self.group)),
            ("image", or_dash(self.image.as_deref())),
            ("text", self.text.clone()),
        ])
    }

    fn to_compact(&self) -> String {
        format!("{} {} {}", self.id, self.author, excerpt(&self.text, 60))
    }
}

impl TableDisplay for Listing<PostView> {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table();
        output.add_table_header(&mut table, &["ID", "Author", "Published", "Group", "Text"]);
        for post in &self.items {
            table.add_row(vec![
                Cell::new(post.id),
                Cell::new(&post.author),
                Cell::new(post.pub_date.format("%Y-%m-%d %H:%M:%S UTC")),
                Cell::new(or_dash(post.group)),
                Cell::new(excerpt(&post.text, 48)),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        format!("{} of {} posts", self.items.len(), self.count)
    }
}

impl TableDisplay for TokenPair {
    fn to_table(&self, output: &OutputManager) -> Table {
        output.key_value_table(&[("access", self.access.clone()), ("refresh", self.refresh.clone())])
    }

    fn to_compact(&self) -> String {
        self.access.clone()
    }
}

impl TableDisplay for Refreshed {
    fn to_table(&self, output: &OutputManager) -> Table {
        output.key_value_table(&[("access", self.access.clone()), ("refresh", or_dash(self.refresh.as_deref()))])
    }

    fn to_compact(&self) -> String {
        self.access.clone()
    }
}

impl TableDisplay for Claims {
    fn to_table(&self, output: &OutputManager) -> Table {
        output.key_value_table(&[
            ("subject", self.sub.to_string()),
            ("role", format!("{:?}", self.role).to_lowercase()),
            ("type", format!("{:?}", self.typ).to_lowercase()),
            ("jti", self.jti.clone()),
            ("issued", or_dash(chrono::DateTime::from_timestamp(self.iat, 0))),
            ("expires", self.expires_at().to_rfc3339()),
        ])
    }

    fn to_compact(&self) -> String {
        format!("{} {:?} exp={}", self.sub, self.typ, self.exp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_truncates_on_char_boundary() {
        assert_eq!(excerpt("short", 10), "short");
        assert_eq!(excerpt("ééééé", 3), "éé…");
    }

    #[test]
    fn json_output_is_not_chatty() {
        let manager = OutputManager::new(GlobalOptions {
            output_format: OutputFormat::Json,
            ..Default::default()
        });
        assert!(!manager.chatty());
        let table = OutputManager::new(GlobalOptions::default());
        assert!(table.chatty());
    }
}
