//! Terminal output: spinner, status icons and diagnostics.

use std::time::Duration;

use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use once_cell::sync::Lazy;
use wirenet_netlist::{Diagnostic, Severity};

static MULTI: Lazy<MultiProgress> = Lazy::new(MultiProgress::new);

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

pub mod icons {
    use colored::Colorize;

    pub fn success() -> String {
        "✓".green().to_string()
    }

    pub fn error() -> String {
        "✗".red().to_string()
    }

    pub fn warning() -> String {
        "!".yellow().to_string()
    }

    pub fn info() -> String {
        "ℹ".blue().to_string()
    }

    pub fn bullet() -> &'static str {
        "•"
    }
}

/// Spinner for a long running step.
pub struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    pub fn start(message: impl Into<String>) -> Self {
        Self::start_with(message, false)
    }

    /// Start a spinner that is never drawn, e.g. when stdout carries the result.
    pub fn hidden(message: impl Into<String>) -> Self {
        Self::start_with(message, true)
    }

    fn start_with(message: impl Into<String>, hidden: bool) -> Self {
        let bar = MULTI.add(ProgressBar::new_spinner());
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars(TICK_CHARS);
        bar.set_style(style);
        bar.set_message(message.into());
        if hidden {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        } else {
            bar.enable_steady_tick(Duration::from_millis(100));
        }
        Self { bar }
    }

    pub fn success(self, message: impl Into<String>) {
        self.bar
            .finish_with_message(format!("{} {}", icons::success(), message.into()));
    }

    pub fn warning(self, message: impl Into<String>) {
        self.bar
            .finish_with_message(format!("{} {}", icons::warning(), message.into()));
    }

    pub fn error(self, message: impl Into<String>) {
        self.bar
            .finish_with_message(format!("{} {}", icons::error(), message.into()));
    }

    /// Run `f` with the spinner hidden so it can print.
    pub fn suspend<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.bar.suspend(f)
    }
}

/// One line per diagnostic on stderr.
pub fn render_diagnostic(diagnostic: &Diagnostic) {
    let (icon, label) = match diagnostic.severity {
        Severity::Error => (icons::error(), "error".red().bold()),
        Severity::Warning => (icons::warning(), "warning".yellow().bold()),
        Severity::Info => (icons::info(), "info".blue().bold()),
    };
    eprintln!(
        "{icon} {label}: {} {}",
        diagnostic.scope.dimmed(),
        diagnostic.body
    );
}

pub fn render_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        render_diagnostic(diagnostic);
    }
}
