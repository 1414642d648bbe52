//! Terminal I/O utilities for CLI.
//!
//! Provides TTY detection and the interactive prompter.

use std::io::{self, BufRead, IsTerminal, Write};

use sitekit::log_status;
use sitekit::prompt::{match_choice, ChoiceOption, Prompter};

pub fn is_stdin_tty() -> bool {
    io::stdin().is_terminal()
}

pub fn prompt(message: &str) -> sitekit::Result<String> {
    eprint!("{}", message);
    io::stderr().flush().ok();

    let stdin = io::stdin();
    let mut line = String::new();
    stdin.lock().read_line(&mut line).map_err(|e| {
        sitekit::Error::new(
            sitekit::ErrorCode::InternalIoError,
            format!("Failed to read input: {}", e),
            serde_json::Value::Null,
        )
    })?;

    Ok(line.trim().to_string())
}

/// Print status message to stderr if running in a terminal.
pub fn status(message: &str) {
    if io::stderr().is_terminal() {
        eprintln!("{}", message);
    }
}

/// Prompts on stderr, reads stdin. Without a TTY, choices fall back to their
/// default and confirmations are declined.
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn choice(&self, question: &str, options: &[ChoiceOption], default: Option<&str>) -> Option<String> {
        if !is_stdin_tty() {
            log_status!("prompt", "{}: no TTY, using default {:?}", question, default);
            return default.map(str::to_string);
        }

        eprintln!();
        match default.and_then(|d| options.iter().find(|o| o.value == d)) {
            Some(d) => eprintln!(" {} [{}]:", question, d.label),
            None => eprintln!(" {}:", question),
        }
        for (index, option) in options.iter().enumerate() {
            eprintln!("  [{}] {}", index, option.label);
        }

        let answer = prompt(" > ").ok()?;
        if answer.is_empty() {
            return default.map(str::to_string);
        }
        let chosen = match_choice(&answer, options);
        if chosen.is_none() {
            eprintln!(" Value \"{}\" is invalid", answer);
        }
        chosen
    }

    fn confirm(&self, question: &str) -> bool {
        if !is_stdin_tty() {
            log_status!("prompt", "{}: no TTY, declining (pass --yes to confirm)", question);
            return false;
        }

        match prompt(&format!(" {} (y/n) ", question)) {
            Ok(answer) => matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }
}
