//! User-facing progress output.
//!
//! Workflows talk to a `Reporter`; the terminal implementation writes to
//! stderr so stdout stays reserved for the JSON response.

use std::io::{self, IsTerminal, Write};

pub trait Reporter {
    fn title(&self, text: &str);
    fn text(&self, text: &str);
    fn notice(&self, text: &str);
    /// Result of an in-progress action. May replace the current line.
    fn success(&self, text: &str);
    fn warning(&self, text: &str);
    /// Failure of an in-progress action. May replace the current line.
    fn error(&self, text: &str);
    fn table(&self, headers: &[&str], rows: &[Vec<String>]);
}

/// Reporter writing to stderr.
///
/// In non-verbose mode on a terminal, success/error lines overwrite the
/// preceding progress line.
pub struct TerminalReporter {
    verbose: bool,
    overwrite: bool,
}

impl TerminalReporter {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            overwrite: io::stderr().is_terminal(),
        }
    }

    fn write_line(&self, prefix: &str, text: &str, replace: bool) {
        let mut stderr = io::stderr().lock();
        if replace && self.overwrite && !self.verbose {
            // Carriage return, then erase the line
            let _ = write!(stderr, "\x0D\x1B[2K");
        }
        let _ = writeln!(stderr, "{}{}", prefix, text);
    }
}

impl Reporter for TerminalReporter {
    fn title(&self, text: &str) {
        self.write_line("", "", false);
        self.write_line("", text, false);
        self.write_line("", &"=".repeat(text.chars().count()), false);
    }

    fn text(&self, text: &str) {
        if self.overwrite && !self.verbose {
            // Left open so the result line can replace it
            let mut stderr = io::stderr().lock();
            let _ = write!(stderr, " {}", text);
            let _ = stderr.flush();
        } else {
            self.write_line(" ", text, false);
        }
    }

    fn notice(&self, text: &str) {
        self.write_line(" [notice] ", text, false);
    }

    fn success(&self, text: &str) {
        self.write_line(" [success] ", text, true);
    }

    fn warning(&self, text: &str) {
        self.write_line(" [warning] ", text, false);
    }

    fn error(&self, text: &str) {
        self.write_line(" [error] ", text, true);
    }

    fn table(&self, headers: &[&str], rows: &[Vec<String>]) {
        for line in render_table(headers, rows) {
            self.write_line(" ", &line, false);
        }
    }
}

/// Render a plain-text table with columns padded to their widest cell.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> Vec<String> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let format_row = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(format_row(headers.to_vec()));
    lines.push(format_row(separator.iter().map(String::as_str).collect()));
    for row in rows {
        lines.push(format_row(row.iter().map(String::as_str).collect()));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_pads_columns() {
        let lines = render_table(
            &["URL", "HTTP code"],
            &[vec!["/b".to_string(), "500".to_string()]],
        );
        assert_eq!(lines[0], "URL  HTTP code");
        assert_eq!(lines[1], "---  ---------");
        assert_eq!(lines[2], "/b   500");
    }
}
