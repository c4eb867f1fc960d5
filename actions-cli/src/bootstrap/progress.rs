//! Terminal feedback while setup tasks are in flight
//!
//! Purely cosmetic: nothing here influences the init result.

use crate::bootstrap::platform::Platform;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

const TICK: Duration = Duration::from_millis(100);

/// Print an informational status line
pub fn info_status(msg: &str) {
    println!("ℹ️  {msg}");
}

/// Print a success status line
pub fn success_status(msg: &str) {
    println!("✅ {msg}");
}

/// Print a failure status line to stderr
pub fn failure_status(msg: &str) {
    eprintln!("❌ {msg}");
}

enum Mode {
    Hidden,
    /// Single status line, used where spinners render poorly (Windows consoles)
    Plain,
    Spinner(ProgressBar),
}

/// Spinner shown while the orchestrator waits on its tasks
pub struct Progress {
    mode: Mode,
    message: String,
}

impl Progress {
    /// Reporter that draws nothing
    pub fn hidden() -> Self {
        Self {
            mode: Mode::Hidden,
            message: String::new(),
        }
    }

    /// Reporter suited to the host terminal
    pub fn terminal(platform: &Platform, message: impl Into<String>) -> Self {
        let message = message.into();

        if platform.is_windows() {
            return Self {
                mode: Mode::Plain,
                message,
            };
        }

        let style = ProgressStyle::with_template("{spinner:.blue}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("|/-\\ ");
        let bar =
            ProgressBar::with_draw_target(None, ProgressDrawTarget::stdout()).with_style(style);

        Self {
            mode: Mode::Spinner(bar),
            message,
        }
    }

    /// Begin showing progress
    pub fn start(&self) {
        match &self.mode {
            Mode::Hidden => {}
            Mode::Plain => info_status(&self.message),
            Mode::Spinner(bar) => {
                bar.set_message(self.message.clone());
                bar.enable_steady_tick(TICK);
            }
        }
    }

    /// Stop and show the success line
    pub fn finish_success(&self) {
        if let Mode::Spinner(bar) = &self.mode {
            bar.finish_and_clear();
            success_status(&self.message);
        }
    }

    /// Stop without a status line; the caller reports the error
    pub fn abandon(&self) {
        if let Mode::Spinner(bar) = &self.mode {
            bar.finish_and_clear();
        }
    }

    #[cfg(test)]
    fn is_spinning(&self) -> bool {
        match &self.mode {
            Mode::Spinner(bar) => !bar.is_finished(),
            _ => false,
        }
    }
}
