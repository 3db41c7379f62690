use colored::{ColoredString, Colorize};
use serde::Serialize;
use std::fmt::Write as _;

use crate::application::use_cases::repository_info::{InfoRow, InfoStatus};
use crate::common::result::MultigitResult;
use crate::domain::entities::outcome::ExecutionOutcome;
use crate::domain::entities::report::{Report, ReportEntry};
use crate::domain::entities::repository::RepositoryRecord;
use crate::presentation::cli::OutputFormat;

/// How a table cell is styled once padded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellStyle {
    Plain,
    Bold,
    Highlight,
    Alert,
    Note,
}

#[derive(Debug, Clone)]
struct Cell {
    text: String,
    style: CellStyle,
}

impl Cell {
    fn new(text: impl Into<String>, style: CellStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    fn plain(text: impl Into<String>) -> Self {
        Self::new(text, CellStyle::Plain)
    }

    fn render(&self, width: usize) -> String {
        let padded = format!("{:<width$}", self.text, width = width);
        match self.style {
            CellStyle::Plain => padded,
            CellStyle::Bold => padded.bold().to_string(),
            CellStyle::Highlight => padded.yellow().bold().to_string(),
            CellStyle::Alert => padded.red().bold().to_string(),
            CellStyle::Note => padded.yellow().to_string(),
        }
    }
}

/// Display utilities for the CLI interface
///
/// Everything renders to a `String`; the caller decides where it goes.
#[derive(Debug, Clone, Default)]
pub struct DisplayHelper {
    /// Also list repositories the filter left out
    pub verbose: bool,
}

impl DisplayHelper {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Serialize `value` for `--output json|yaml`. `None` for text.
    pub fn structured<T: Serialize>(
        &self,
        value: &T,
        format: OutputFormat,
    ) -> MultigitResult<Option<String>> {
        Ok(match format {
            OutputFormat::Text => None,
            OutputFormat::Json => Some(format!("{}\n", serde_json::to_string_pretty(value)?)),
            OutputFormat::Yaml => Some(serde_yaml::to_string(value)?),
        })
    }

    /// Text rendering of a run.
    ///
    /// One block per repository in report order: a header, the child's stdout
    /// and stderr exactly as captured, and a status line unless it succeeded.
    pub fn render_report(&self, report: &Report) -> String {
        let mut out = String::new();

        for entry in &report.entries {
            if entry.outcome.is_filtered() && !self.verbose {
                continue;
            }
            self.render_entry(&mut out, entry);
        }

        let marker = if report.is_success() {
            "✓".green().bold()
        } else {
            "✗".red().bold()
        };
        let _ = writeln!(out, "{} {}", marker, report.summary);
        out
    }

    fn render_entry(&self, out: &mut String, entry: &ReportEntry) {
        let _ = writeln!(out, "{} {}", "::".blue().bold(), self.format_repo(&entry.repository));

        match &entry.outcome {
            ExecutionOutcome::Succeeded { stdout, stderr } => {
                push_verbatim(out, stdout);
                push_verbatim(out, stderr);
            }
            ExecutionOutcome::Failed {
                stdout,
                stderr,
                exit_code,
            } => {
                push_verbatim(out, stdout);
                push_verbatim(out, stderr);
                let status = match exit_code {
                    Some(code) => format!("exited with {code}"),
                    None => "terminated by a signal".to_string(),
                };
                let _ = writeln!(out, "{} {}", "✗".red().bold(), status.red());
            }
            ExecutionOutcome::SpawnError { cause } => {
                let _ = writeln!(out, "{} {}", "✗".red().bold(), cause.red());
            }
            ExecutionOutcome::Skipped { reason } => {
                let _ = writeln!(out, "{} {}", "-".dimmed(), format!("skipped: {reason}").dimmed());
            }
            ExecutionOutcome::Cancelled => {
                let _ = writeln!(out, "{} {}", "⚠".yellow().bold(), "cancelled".yellow());
            }
        }
    }

    /// Format a repository name with appropriate styling
    pub fn format_repo(&self, repository: &RepositoryRecord) -> ColoredString {
        repository.identity.cyan().bold()
    }

    /// `list`: identity and path, one repository per line.
    pub fn render_records(&self, records: &[RepositoryRecord]) -> String {
        let rows: Vec<Vec<Cell>> = records
            .iter()
            .map(|record| {
                vec![
                    Cell::new(&record.identity, CellStyle::Bold),
                    Cell::plain(record.path.display().to_string()),
                    if record.no_push {
                        Cell::new("no push", CellStyle::Note)
                    } else {
                        Cell::plain("")
                    },
                ]
            })
            .collect();
        render_table(None, &rows)
    }

    /// `info`: one row of live state per repository.
    pub fn render_info(&self, rows: &[InfoRow]) -> String {
        let headers = ["repository", "branches", "remotes", "status", "stashes", "notes"];
        let rows: Vec<Vec<Cell>> = rows.iter().map(info_cells).collect();
        render_table(Some(&headers), &rows)
    }
}

fn info_cells(row: &InfoRow) -> Vec<Cell> {
    let notes = if row.repository.no_push {
        Cell::new("no push", CellStyle::Note)
    } else {
        Cell::plain("")
    };
    let identity = Cell::new(&row.repository.identity, CellStyle::Bold);

    let state = match &row.status {
        InfoStatus::Inspected(state) => state,
        InfoStatus::Failed { cause } => {
            return vec![
                identity,
                Cell::new(format!("error: {cause}"), CellStyle::Alert),
                Cell::plain(""),
                Cell::plain(""),
                Cell::plain(""),
                notes,
            ];
        }
    };

    let branches = row.branches().join(", ");
    let branches = if state.current_branch.is_some() {
        Cell::new(branches, CellStyle::Highlight)
    } else {
        Cell::plain(branches)
    };

    let mut status = Vec::new();
    if state.is_dirty {
        status.push("dirty".to_string());
    }
    if state.untracked_count > 0 {
        status.push(format!("{} untracked", state.untracked_count));
    }

    let stashes = match state.stash_count {
        0 => Cell::plain(""),
        n => Cell::new(format!("{n} stashes"), CellStyle::Alert),
    };

    vec![
        identity,
        branches,
        Cell::plain(state.remote_count.to_string()),
        Cell::new(status.join(", "), CellStyle::Alert),
        stashes,
        notes,
    ]
}

/// Aligned columns; widths come from the unstyled text.
fn render_table(headers: Option<&[&str]>, rows: &[Vec<Cell>]) -> String {
    let columns = headers
        .map(|h| h.len())
        .into_iter()
        .chain(rows.iter().map(Vec::len))
        .max()
        .unwrap_or(0);
    let mut widths = vec![0; columns];

    if let Some(headers) = headers {
        for (i, header) in headers.iter().enumerate() {
            widths[i] = widths[i].max(header.chars().count());
        }
    }
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.text.chars().count());
        }
    }

    let mut out = String::new();
    if let Some(headers) = headers {
        let cells: Vec<Cell> = headers
            .iter()
            .map(|h| Cell::new(*h, CellStyle::Bold))
            .collect();
        push_row(&mut out, &cells, &widths);
    }
    for row in rows {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row(out: &mut String, cells: &[Cell], widths: &[usize]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| cell.render(*width))
        .collect::<Vec<_>>()
        .join("  ");
    let _ = writeln!(out, "{}", line.trim_end());
}

fn push_verbatim(out: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }
    out.push_str(text);
    if !text.ends_with('\n') {
        out.push('\n');
    }
}
