//! Catppuccin-inspired terminal palette.
//!
//! Plain ANSI bright colors, so output stays readable on any terminal. The
//! names follow Catppuccin Frappe; only the shades the formatters use exist.

use colored::{ColoredString, Colorize};

pub trait CatppuccinExt {
    /// Healthy: up, pass
    fn ctp_green(&self) -> ColoredString;
    /// Degraded: slow, expiring soon
    fn ctp_yellow(&self) -> ColoredString;
    /// Down, failed, errors
    fn ctp_red(&self) -> ColoredString;
    /// Field labels
    fn sky(&self) -> ColoredString;
    /// Section headings
    fn lavender(&self) -> ColoredString;
    /// Measured values
    fn ctp_white(&self) -> ColoredString;
    /// Skipped and not-applicable values, rules
    fn overlay0(&self) -> ColoredString;
}

impl<S: AsRef<str>> CatppuccinExt for S {
    fn ctp_green(&self) -> ColoredString {
        self.as_ref().bright_green()
    }

    fn ctp_yellow(&self) -> ColoredString {
        self.as_ref().bright_yellow()
    }

    fn ctp_red(&self) -> ColoredString {
        self.as_ref().bright_red()
    }

    fn sky(&self) -> ColoredString {
        self.as_ref().bright_cyan()
    }

    fn lavender(&self) -> ColoredString {
        self.as_ref().bright_purple()
    }

    fn ctp_white(&self) -> ColoredString {
        self.as_ref().bright_white()
    }

    fn overlay0(&self) -> ColoredString {
        self.as_ref().bright_black()
    }
}
