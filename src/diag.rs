//! Diagnostic Sink
//!
//! Fire-and-forget trace output for the loader. The sink is an injected
//! collaborator: it may drop, buffer, or print messages, but it must never
//! panic and never affects control flow. A failing sink cannot fail a load.

use std::fmt;
use std::io::{self, Write};

/// Destination for loader diagnostics.
///
/// Implementations must be infallible from the caller's point of view:
/// swallow I/O errors internally and do not panic.
pub trait TraceSink: Send + Sync {
    /// Emit one diagnostic message.
    fn trace(&self, message: fmt::Arguments<'_>);
}

/// Sink that writes diagnostics to stderr with a `[loader]` prefix.
pub struct StderrSink;

impl TraceSink for StderrSink {
    fn trace(&self, message: fmt::Arguments<'_>) {
        // Not eprintln!: that panics when the write fails (broken pipe, full
        // disk), and a sink failure must not fail the load.
        let _ = writeln!(io::stderr().lock(), "[loader] {}", message);
    }
}

/// Sink that discards all diagnostics.
pub struct NullSink;

impl TraceSink for NullSink {
    fn trace(&self, _message: fmt::Arguments<'_>) {}
}
