//! Value-identity change detection.
//!
//! A [`DependencyWatcher`] remembers the last observed value and reports
//! whether a newly observed one differs from it: "run this when these
//! inputs differ from last time", with nothing else attached. The
//! controller feeds request descriptors through one of these to gate
//! automatic re-execution.

use std::sync::Mutex;

/// Tracks the last observed value of a dependency and detects by-value
/// changes.
///
/// The watcher is primed with the initial value at construction, so the
/// first [`observe`](Self::observe) of an identical value reports no
/// change. The initial attempt is the constructor's job, not the
/// watcher's.
pub struct DependencyWatcher<T> {
    current: Mutex<T>,
}

impl<T> DependencyWatcher<T>
where
    T: Clone + PartialEq,
{
    /// Create a watcher primed with `initial`.
    #[must_use]
    pub const fn new(initial: T) -> Self {
        Self {
            current: Mutex::new(initial),
        }
    }

    /// Compare `next` against the last observed value.
    ///
    /// Returns true, and records `next` as the new current value, only
    /// when the two differ by value.
    pub fn observe(&self, next: &T) -> bool {
        let mut current = self
            .current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if *current == *next {
            false
        } else {
            *current = next.clone();
            true
        }
    }

    /// Clone the last observed value.
    #[must_use]
    pub fn current(&self) -> T {
        self.current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for DependencyWatcher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyWatcher")
            .field(
                "current",
                &*self
                    .current
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner),
            )
            .finish()
    }
}
