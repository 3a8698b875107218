//! Levelled diagnostic output
//!
//! Drivers never talk to a global serial port. Every component that wants to
//! report something receives a [`LogSink`] and writes through it. The sink is
//! purely observational: nothing in the control path depends on what it does.
//!
//! # Sinks
//!
//! - [`NullSink`] - discards everything.
//! - [`DefmtSink`] - forwards to `defmt` (`defmt` feature, hardware builds).
//!   Filtering happens at build time through `DEFMT_LOG`.
//! - [`TracingSink`] - forwards to `tracing` (`tracing` feature, host builds).
//! - `mocks::RecordingSink` - captures lines for test assertions.

use core::fmt;

/// Severity of a diagnostic line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    /// Register traffic and other chatter
    Debug,
    /// State transitions
    Info,
    /// Unexpected but recoverable
    Warning,
    /// Failed bus transactions, failed initialisation
    Error,
}

impl Level {
    /// Short tag used when rendering a line.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Debug => "D",
            Self::Info => "I",
            Self::Warning => "W",
            Self::Error => "E",
        }
    }
}

/// Destination for levelled diagnostic output.
pub trait LogSink {
    /// Emit one line at `level`.
    fn log(&self, level: Level, args: fmt::Arguments<'_>);

    /// Emit a [`Level::Debug`] line.
    fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args);
    }

    /// Emit a [`Level::Info`] line.
    fn info(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args);
    }

    /// Emit a [`Level::Warning`] line.
    fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warning, args);
    }

    /// Emit a [`Level::Error`] line.
    fn error(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Error, args);
    }
}

impl<T: LogSink + ?Sized> LogSink for &T {
    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        (**self).log(level, args);
    }
}

/// Sink that drops every line.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl LogSink for NullSink {
    fn log(&self, _level: Level, _args: fmt::Arguments<'_>) {}
}

/// Capacity of the line buffer used by [`DefmtSink`]. Longer lines are cut.
#[cfg(feature = "defmt")]
pub const DEFMT_LINE_CAPACITY: usize = 160;

/// Sink that renders each line and hands it to `defmt`.
///
/// `defmt` cannot consume `core::fmt::Arguments` directly, so the line is
/// rendered into a fixed `heapless::String` first.
#[cfg(feature = "defmt")]
#[derive(Debug, Clone, Copy, Default)]
pub struct DefmtSink;

#[cfg(feature = "defmt")]
impl LogSink for DefmtSink {
    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        use core::fmt::Write as _;

        let mut line: heapless::String<DEFMT_LINE_CAPACITY> = heapless::String::new();
        // A full buffer only truncates the line.
        let _ = line.write_fmt(args);
        match level {
            Level::Debug => defmt::debug!("{=str}", line.as_str()),
            Level::Info => defmt::info!("{=str}", line.as_str()),
            Level::Warning => defmt::warn!("{=str}", line.as_str()),
            Level::Error => defmt::error!("{=str}", line.as_str()),
        }
    }
}

/// Sink that forwards to the `tracing` macros (desktop / host builds).
#[cfg(feature = "tracing")]
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[cfg(feature = "tracing")]
impl LogSink for TracingSink {
    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        match level {
            Level::Debug => tracing::debug!("{}", args),
            Level::Info => tracing::info!("{}", args),
            Level::Warning => tracing::warn!("{}", args),
            Level::Error => tracing::error!("{}", args),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::RecordingSink;

    #[test]
    fn test_levels_are_ordered_by_severity() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warning);
        assert!(Level::Warning < Level::Error);
    }

    #[test]
    fn test_helpers_route_to_matching_level() {
        let sink = RecordingSink::new();
        sink.debug(format_args!("a"));
        sink.info(format_args!("b"));
        sink.warn(format_args!("c"));
        sink.error(format_args!("d"));
        let levels: Vec<Level> = sink.lines().iter().map(|(l, _)| *l).collect();
        assert_eq!(
            levels,
            vec![Level::Debug, Level::Info, Level::Warning, Level::Error]
        );
    }

    #[test]
    fn test_reference_forwards_to_sink() {
        let sink = RecordingSink::new();
        let by_ref = &sink;
        by_ref.info(format_args!("hello {}", 7));
        assert!(sink.contains("hello 7"));
    }

    #[test]
    fn test_null_sink_accepts_everything() {
        NullSink.error(format_args!("ignored"));
    }
}
