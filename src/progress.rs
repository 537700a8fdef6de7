// src/progress.rs

//! Progress and operator reporting for reassembly batches
//!
//! The `ProgressTracker` trait carries both the job counter and the one-line
//! per-package messages. Implementations:
//! - `CliProgress`: indicatif bar, messages printed above it
//! - `PlainProgress`: operator lines only, no bar
//! - `SilentProgress`: no-op
//! - `CallbackProgress`: forwards events to a closure

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Core trait for progress tracking
///
/// Implementations are shared by all workers of a batch and must be
/// thread-safe.
pub trait ProgressTracker: Send + Sync {
    /// Set the current status message
    fn set_message(&self, message: &str);

    /// Increment progress by the given amount
    fn increment(&self, amount: u64);

    /// Print a complete line for the operator
    fn println(&self, line: &str);

    /// Finish progress with a closing message
    fn finish_with_message(&self, message: &str);
}

/// Silent progress tracker (no-op)
#[derive(Debug, Default)]
pub struct SilentProgress {
    position: AtomicU64,
}

impl SilentProgress {
    pub const fn new() -> Self {
        Self {
            position: AtomicU64::new(0),
        }
    }

    /// Jobs counted so far
    pub fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }
}

impl ProgressTracker for SilentProgress {
    fn set_message(&self, _message: &str) {}

    fn increment(&self, amount: u64) {
        self.position.fetch_add(amount, Ordering::Relaxed);
    }

    fn println(&self, _line: &str) {}

    fn finish_with_message(&self, _message: &str) {}
}

/// Prints operator lines to stdout and nothing else
#[derive(Debug, Default)]
pub struct PlainProgress;

impl PlainProgress {
    pub fn new() -> Self {
        Self
    }
}

impl ProgressTracker for PlainProgress {
    fn set_message(&self, _message: &str) {}

    fn increment(&self, _amount: u64) {}

    fn println(&self, line: &str) {
        println!("{}", line);
    }

    fn finish_with_message(&self, _message: &str) {}
}

/// Terminal progress bar
pub struct CliProgress {
    bar: ProgressBar,
    finished: AtomicBool,
}

impl CliProgress {
    /// Bar over `length` jobs
    pub fn new(length: u64) -> Self {
        let bar = ProgressBar::new(length);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        Self {
            bar,
            finished: AtomicBool::new(false),
        }
    }
}

impl ProgressTracker for CliProgress {
    fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    fn increment(&self, amount: u64) {
        self.bar.inc(amount);
    }

    fn println(&self, line: &str) {
        // A hidden bar (stderr not a terminal) swallows println
        if self.bar.is_hidden() {
            println!("{}", line);
        } else {
            self.bar.println(line);
        }
    }

    fn finish_with_message(&self, message: &str) {
        if !self.finished.swap(true, Ordering::Relaxed) {
            self.bar.finish_with_message(message.to_string());
        }
    }
}

/// Events emitted by callback progress tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Message updated
    Message(String),
    /// Position advanced
    Increment(u64),
    /// Operator line
    Line(String),
    /// Progress finished
    Finished(String),
}

/// Callback-based progress tracker
pub struct CallbackProgress<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    callback: F,
}

impl<F> CallbackProgress<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressTracker for CallbackProgress<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn set_message(&self, message: &str) {
        (self.callback)(ProgressEvent::Message(message.to_string()));
    }

    fn increment(&self, amount: u64) {
        (self.callback)(ProgressEvent::Increment(amount));
    }

    fn println(&self, line: &str) {
        (self.callback)(ProgressEvent::Line(line.to_string()));
    }

    fn finish_with_message(&self, message: &str) {
        (self.callback)(ProgressEvent::Finished(message.to_string()));
    }
}
