//! Severity ceilings for routing events between sinks.

use log::Level;

use crate::LogEvent;

/// Admits events at or below a severity ceiling.
///
/// `log::Level` orders verbosity (`Error < Warn < Info < Debug < Trace`),
/// so "at or below `Info` in severity" means "at least as verbose as
/// `Info`". Attach the filter to a single sink to keep warnings and errors
/// off a routine stream while another sink receives them.
///
/// # Examples
///
/// ```
/// use datavirt_log::SeverityFilter;
/// use log::Level;
///
/// let routine = SeverityFilter::at_most(Level::Info);
/// assert!(routine.admits(Level::Info));
/// assert!(routine.admits(Level::Debug));
/// assert!(!routine.admits(Level::Error));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeverityFilter {
    ceiling: Level,
}

impl Default for SeverityFilter {
    fn default() -> Self {
        Self::at_most(Level::Info)
    }
}

impl SeverityFilter {
    /// Admit events no more severe than `ceiling`.
    #[must_use]
    pub const fn at_most(ceiling: Level) -> Self {
        Self { ceiling }
    }

    /// The most severe level still admitted.
    #[must_use]
    pub const fn ceiling(&self) -> Level {
        self.ceiling
    }

    /// Report whether an event at `level` passes the filter.
    #[must_use]
    pub fn admits(&self, level: Level) -> bool {
        level >= self.ceiling
    }

    /// Report whether `event` passes the filter.
    #[must_use]
    pub fn admits_event(&self, event: &LogEvent) -> bool {
        self.admits(event.level)
    }
}
