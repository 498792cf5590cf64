// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Human and `--json` output.
//!
//! In JSON mode every command prints exactly one [`Outcome`] document on
//! stdout. Otherwise commands print plain lines, colored when stdout is a
//! terminal and `--plain` was not passed.

use std::io::IsTerminal;

use colored::Colorize;
use keyward_core::{KeywardError, Outcome};
use serde::Serialize;

pub struct Output {
    json: bool,
    color: bool,
}

impl Output {
    pub fn new(json: bool, plain: bool) -> Self {
        Self {
            json,
            color: !json && !plain && std::io::stdout().is_terminal(),
        }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    /// Print `data` as an outcome in JSON mode, or run `human` otherwise.
    pub fn emit<T: Serialize>(&self, data: &T, human: impl FnOnce(&Self)) {
        if self.json {
            println!("{}", to_json(&Outcome::ok(data)));
        } else {
            human(self);
        }
    }

    pub fn error(&self, err: &KeywardError) {
        if self.json {
            println!("{}", to_json(&Outcome::<()>::err(err)));
        } else if self.color {
            eprintln!("{} {err}", "error:".red().bold());
        } else {
            eprintln!("error: {err}");
        }
    }

    pub fn ok(&self, message: &str) {
        if self.color {
            println!("{} {message}", "✓".green());
        } else {
            println!("[OK]   {message}");
        }
    }

    pub fn warn(&self, message: &str) {
        if self.color {
            println!("{} {}", "!".yellow(), message.yellow());
        } else {
            println!("[WARN] {message}");
        }
    }

    pub fn field(&self, label: &str, value: &str) {
        if self.color {
            println!("  {:<18} {value}", label.bold());
        } else {
            println!("  {label:<18} {value}");
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}
