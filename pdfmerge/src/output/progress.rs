//! Terminal progress indicator for the per-input merge loop.
//!
//! Draws to stderr so stdout stays usable for reports. Disabled when stderr
//! is not a terminal.
//!
//! # Examples
//!
//! ```
//! use pdfmerge::output::progress::{ProgressBar, ProgressStyle};
//!
//! let mut progress = ProgressBar::new(3, ProgressStyle::Bar);
//! for input in ["a.pdf", "b.pdf", "c.pdf"] {
//!     progress.set_message(input);
//!     progress.increment();
//! }
//! progress.finish();
//! ```

use std::io::{self, IsTerminal, Write};
use std::time::{Duration, Instant};

const BAR_WIDTH: usize = 30;

/// Style of progress indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStyle {
    /// Classic progress bar: `[=====>    ]`
    Bar,
    /// Simple counter: `3/10`
    Counter,
}

/// Progress indicator counting processed inputs.
#[derive(Debug)]
pub struct ProgressBar {
    total: usize,
    current: usize,
    style: ProgressStyle,
    message: Option<String>,
    start_time: Instant,
    last_draw: Option<Instant>,
    update_interval: Duration,
    enabled: bool,
}

impl ProgressBar {
    /// Create a new progress bar over `total` items.
    pub fn new(total: usize, style: ProgressStyle) -> Self {
        Self {
            total,
            current: 0,
            style,
            message: None,
            start_time: Instant::now(),
            last_draw: None,
            update_interval: Duration::from_millis(80),
            enabled: io::stderr().is_terminal(),
        }
    }

    /// Bar for a known total, counter when the total is unknown.
    pub fn auto(total: usize) -> Self {
        let style = if total > 0 {
            ProgressStyle::Bar
        } else {
            ProgressStyle::Counter
        };
        Self::new(total, style)
    }

    /// Create a progress bar that never draws.
    pub fn disabled() -> Self {
        let mut bar = Self::new(0, ProgressStyle::Counter);
        bar.enabled = false;
        bar
    }

    /// Whether anything will be drawn.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Set the label shown before the bar.
    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    /// Move to `current`, redrawing at most once per update interval.
    pub fn update(&mut self, current: usize) {
        self.current = current;

        let due = self
            .last_draw
            .is_none_or(|at| at.elapsed() >= self.update_interval);
        if due || current >= self.total {
            self.draw();
        }
    }

    /// Advance by one.
    pub fn increment(&mut self) {
        self.update(self.current + 1);
    }

    /// Draw the completed state and end the line.
    pub fn finish(&mut self) {
        self.current = self.total.max(self.current);
        if self.enabled {
            self.draw();
            eprintln!();
        }
    }

    /// Erase the line without finishing, e.g. before printing an error.
    pub fn clear(&self) {
        if self.enabled {
            eprint!("\r\x1b[K");
            io::stderr().flush().ok();
        }
    }

    /// Completed fraction in percent.
    pub fn percent(&self) -> f64 {
        if self.total > 0 {
            (self.current as f64 / self.total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Time since creation.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    fn draw(&mut self) {
        self.last_draw = Some(Instant::now());
        if !self.enabled {
            return;
        }
        eprint!("\r\x1b[K{}", self.line());
        io::stderr().flush().ok();
    }

    fn line(&self) -> String {
        let counter = format!("{}/{}", self.current, self.total);
        let elapsed = format_duration(self.start_time.elapsed());

        let mut parts = Vec::with_capacity(4);
        if let Some(message) = &self.message {
            parts.push(message.clone());
        }
        if self.style == ProgressStyle::Bar {
            parts.push(render_bar(self.current, self.total));
        }
        parts.push(counter);
        parts.push(elapsed);
        parts.join(" ")
    }
}

fn render_bar(current: usize, total: usize) -> String {
    let filled = (BAR_WIDTH * current.min(total)) / total.max(1);
    let head = if filled > 0 && filled < BAR_WIDTH { ">" } else { "" };
    let body = if head.is_empty() { filled } else { filled - 1 };
    format!(
        "[{}{}{}]",
        "=".repeat(body),
        head,
        " ".repeat(BAR_WIDTH - filled)
    )
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();

    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_style() {
        assert_eq!(ProgressBar::auto(5).style, ProgressStyle::Bar);
        assert_eq!(ProgressBar::auto(0).style, ProgressStyle::Counter);
    }

    #[test]
    fn test_disabled_progress_bar() {
        let mut bar = ProgressBar::disabled();
        assert!(!bar.is_enabled());
        bar.increment();
        bar.finish();
        assert_eq!(bar.current, 1);
    }

    #[test]
    fn test_increment_and_percent() {
        let mut bar = ProgressBar::new(4, ProgressStyle::Bar);
        bar.enabled = false;
        assert_eq!(bar.percent(), 0.0);

        bar.increment();
        assert_eq!(bar.percent(), 25.0);
        bar.update(4);
        assert_eq!(bar.percent(), 100.0);
    }

    #[test]
    fn test_finish_completes() {
        let mut bar = ProgressBar::new(3, ProgressStyle::Counter);
        bar.enabled = false;
        bar.update(1);
        bar.finish();
        assert_eq!(bar.current, 3);
    }

    #[test]
    fn test_line_contents() {
        let mut bar = ProgressBar::new(2, ProgressStyle::Bar);
        bar.enabled = false;
        bar.set_message("b.pdf");
        bar.update(1);

        let line = bar.line();
        assert!(line.starts_with("b.pdf ["));
        assert!(line.contains(" 1/2 "));
    }

    #[test]
    fn test_render_bar() {
        assert_eq!(render_bar(0, 3), format!("[{}]", " ".repeat(BAR_WIDTH)));
        assert_eq!(render_bar(3, 3), format!("[{}]", "=".repeat(BAR_WIDTH)));

        let half = render_bar(1, 2);
        assert_eq!(half.len(), BAR_WIDTH + 2);
        assert!(half.contains('>'));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1h 1m");
    }
}
