use colored::Colorize;
use sshtrack_core::{ActivityRecord, Presenter};
use std::io::{self, Write};

const TITLE: &str = "Automatic file upload handler";
const HEADERS: [&str; 4] = ["Date", "Time", "Action", "Source"];

/// Redraws the whole activity table on every refresh.
pub struct TablePresenter<W: Write> {
    out: W,
    clear: bool,
}

impl TablePresenter<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout(), clear: true }
    }
}

impl<W: Write> TablePresenter<W> {
    pub fn new(out: W, clear: bool) -> Self {
        Self { out, clear }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn draw(&mut self, records: &[ActivityRecord]) -> io::Result<()> {
        if self.clear {
            // clear screen, cursor home
            write!(self.out, "\x1B[2J\x1B[H")?;
        }
        let text = render_table(records);
        self.out.write_all(text.as_bytes())?;
        self.out.flush()
    }
}

impl<W: Write> Presenter for TablePresenter<W> {
    fn render(&mut self, records: &[ActivityRecord]) {
        if let Err(e) = self.draw(records) {
            tracing::warn!("table redraw failed: {e}");
        }
    }
}

fn rows(records: &[ActivityRecord]) -> Vec<[String; 4]> {
    records
        .iter()
        .map(|r| {
            [
                r.date(),
                r.time(),
                r.action.label().to_string(),
                r.source.display().to_string(),
            ]
        })
        .collect()
}

fn pad(cell: &str, width: usize, center: bool) -> String {
    let len = cell.chars().count();
    let gap = width.saturating_sub(len);
    if center {
        let left = gap / 2;
        format!("{}{}{}", " ".repeat(left), cell, " ".repeat(gap - left))
    } else {
        format!("{}{}", cell, " ".repeat(gap))
    }
}

fn border(widths: &[usize; 4], left: &str, mid: &str, right: &str) -> String {
    let inner: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
    format!("{left}{}{right}", inner.join(mid)).blue().to_string()
}

/// Lay the records out as a boxed four-column table.
pub fn render_table(records: &[ActivityRecord]) -> String {
    let rows = rows(records);
    let mut widths = HEADERS.map(|h| h.len());
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let bar = "│".blue().to_string();
    let mut out = String::new();
    out.push_str(&format!("{}\n", TITLE.red().bold()));
    out.push_str(&border(&widths, "┌", "┬", "┐"));
    out.push('\n');
    let header: Vec<String> = HEADERS
        .iter()
        .zip(widths.iter())
        .enumerate()
        .map(|(i, (h, w))| format!(" {} ", pad(h, *w, i == 2).bold()))
        .collect();
    out.push_str(&format!("{bar}{}{bar}\n", header.join(bar.as_str())));
    out.push_str(&border(&widths, "├", "┼", "┤"));
    out.push('\n');

    for (row, rec) in rows.iter().zip(records) {
        let cells = [
            pad(&row[0], widths[0], false).green(),
            pad(&row[1], widths[1], false).green(),
            if rec.action.is_error() {
                pad(&row[2], widths[2], true).red()
            } else {
                pad(&row[2], widths[2], true).cyan()
            },
            pad(&row[3], widths[3], false).magenta(),
        ];
        let cells: Vec<String> = cells.iter().map(|c| format!(" {c} ")).collect();
        out.push_str(&format!("{bar}{}{bar}\n", cells.join(bar.as_str())));
    }
    out.push_str(&border(&widths, "└", "┴", "┘"));
    out.push('\n');
    out
}
