use anyhow::Result;
use chirp::model::Post;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{Attribute, Cell, Table};
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
}

/// Global CLI options that affect output and behavior
#[derive(Clone, Debug, Default)]
pub struct GlobalOptions {
    pub output_format: OutputFormat,
    pub quiet: bool,
    pub no_color: bool,
}

/// Data that can be displayed as a table
pub trait TableDisplay {
    fn to_table(&self, options: &GlobalOptions) -> Table;
}

/// One feed snapshot as printed by `tour` and `watch`.
#[derive(Debug, Serialize)]
pub struct FeedView {
    pub title: String,
    pub posts: Vec<FeedRow>,
}

#[derive(Debug, Serialize)]
pub struct FeedRow {
    pub id: String,
    pub username: String,
    pub tweet: String,
    pub photo: Option<String>,
    pub created: String,
    pub edited: bool,
}

impl FeedView {
    pub fn new(title: impl Into<String>, posts: &[Post]) -> Self {
        Self {
            title: title.into(),
            posts: posts.iter().map(FeedRow::from).collect(),
        }
    }
}

impl From<&Post> for FeedRow {
    fn from(post: &Post) -> Self {
        let created = DateTime::<Utc>::from_timestamp_millis(post.create_at)
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| post.create_at.to_string());
        Self {
            id: post.id.clone(),
            username: post.username.clone(),
            tweet: post.tweet.clone(),
            photo: post.photo.clone(),
            created,
            edited: post.is_edited(),
        }
    }
}

impl TableDisplay for FeedView {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = themed_table(options);
        table.set_header(header_cells(&["#", "Author", "Post", "Created", ""], options));

        if self.posts.is_empty() {
            table.add_row(vec![Cell::new("-"), Cell::new("No posts yet")]);
            return table;
        }

        for (index, row) in self.posts.iter().enumerate() {
            let mut marks = String::new();
            if row.edited {
                marks.push_str(ICONS.edited);
            }
            if row.photo.is_some() {
                marks.push_str(ICONS.photo);
            }
            table.add_row(vec![
                Cell::new(index + 1),
                author_cell(&row.username, options),
                Cell::new(&row.tweet),
                Cell::new(&row.created),
                Cell::new(marks),
            ]);
        }
        table
    }
}

fn themed_table(options: &GlobalOptions) -> Table {
    let mut table = Table::new();
    if options.no_color {
        table.load_preset(comfy_table::presets::ASCII_FULL);
    } else {
        table.load_preset(comfy_table::presets::UTF8_FULL_CONDENSED);
    }
    table
}

fn author_cell(username: &str, options: &GlobalOptions) -> Cell {
    let cell = Cell::new(username);
    if options.no_color { cell } else { cell.fg(THEME.author) }
}

fn header_cells(headers: &[&str], options: &GlobalOptions) -> Vec<Cell> {
    headers
        .iter()
        .map(|header| {
            let cell = Cell::new(header).add_attribute(Attribute::Bold);
            if options.no_color { cell } else { cell.fg(THEME.table_header) }
        })
        .collect()
}

/// Output manager handles formatting and display
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
                let table = data.to_table(&self.options);
                println!("{table}");
            }
        }
        Ok(())
    }

    pub fn feed(&self, title: &str, posts: &[Post]) -> Result<()> {
        if matches!(self.options.output_format, OutputFormat::Table) {
            self.subheading(title);
        }
        self.display(&FeedView::new(title, posts))
    }

    fn line(&self, icon: &str, message: &str, color: colored::Color) -> String {
        if self.options.no_color {
            format!("{icon} {message}")
        } else {
            format!("{} {}", icon.color(color), message.color(color))
        }
    }

    /// Display a success message with color and icon
    pub fn success(&self, message: &str) {
        if !self.options.quiet {
            println!("{}", self.line(ICONS.done, message, THEME.done));
        }
    }

    /// Display an error message with color and icon
    pub fn error(&self, message: &str) {
        eprintln!("{}", self.line(ICONS.failed, message, THEME.failed));
    }

    pub fn warning(&self, message: &str) {
        if !self.options.quiet {
            println!("{}", self.line(ICONS.caution, message, THEME.caution));
        }
    }

    pub fn info(&self, message: &str) {
        if !self.options.quiet {
            println!("{}", self.line(ICONS.note, message, THEME.note));
        }
    }

    /// Display a step of a scripted session
    pub fn step(&self, message: &str) {
        if !self.options.quiet {
            println!("{}", self.line(ICONS.arrow, message, THEME.step));
        }
    }

    pub fn heading(&self, text: &str) {
        if !self.options.quiet {
            let output = if self.options.no_color {
                format!("\n{text}\n{}", "=".repeat(text.len()))
            } else {
                format!("\n{}", text.color(THEME.title).bold())
            };
            println!("{output}");
        }
    }

    pub fn subheading(&self, text: &str) {
        if !self.options.quiet {
            let output = if self.options.no_color {
                format!("\n{text}\n{}", "-".repeat(text.len()))
            } else {
                format!("\n{}", text.color(THEME.step).underline())
            };
            println!("{output}");
        }
    }

    pub fn key_value(&self, key: &str, value: &str) {
        if !self.options.quiet {
            let output = if self.options.no_color {
                format!("{key}: {value}")
            } else {
                format!("{}: {}", key.color(THEME.key).bold(), value.color(THEME.value))
            };
            println!("{output}");
        }
    }

    pub fn bullet(&self, text: &str) {
        if !self.options.quiet {
            let output = if self.options.no_color {
                format!("  {} {text}", ICONS.bullet)
            } else {
                format!("  {} {text}", ICONS.bullet.color(THEME.dim))
            };
            println!("{output}");
        }
    }

    /// Display progress indicator
    pub fn progress(&self, message: &str) {
        if self.options.quiet || matches!(self.options.output_format, OutputFormat::Json) {
            return;
        }

        let output = if self.options.no_color {
            format!("{} {message}...", ICONS.spinner)
        } else {
            format!(
                "{} {}...",
                ICONS.spinner.color(THEME.accent).bold(),
                message.color(THEME.accent)
            )
        };

        print!("\r{output}");
        std::io::stdout().flush().ok();
    }

    /// Clear the current line (useful after progress indicators)
    pub fn clear_line(&self) {
        if self.options.quiet || matches!(self.options.output_format, OutputFormat::Json) {
            return;
        }

        print!("\r{}", " ".repeat(80));
        print!("\r");
        std::io::stdout().flush().ok();
    }
}
