//! Cooperative cancellation and progress reporting for long-running work.

use crate::error::GraphError;

type StopCheck<'a> = Box<dyn Fn() -> bool + Send + Sync + 'a>;
type ProgressFn<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

/// Coarse-grained progress of a batch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
}

/// Caller-supplied stop check and progress callback.
///
/// Both are advisory. Operations poll [`Control::check`] between units
/// (tiers, discourses) and call [`Control::report`] after each one.
pub struct Control<'a> {
    should_stop: Option<StopCheck<'a>>,
    progress: Option<ProgressFn<'a>>,
    every: usize,
}

impl Default for Control<'_> {
    fn default() -> Self {
        Self::none()
    }
}

impl<'a> Control<'a> {
    /// Never stops, reports nothing.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            should_stop: None,
            progress: None,
            every: 1,
        }
    }

    #[must_use]
    pub fn with_stop_check(mut self, check: impl Fn() -> bool + Send + Sync + 'a) -> Self {
        self.should_stop = Some(Box::new(check));
        self
    }

    #[must_use]
    pub fn with_progress(mut self, callback: impl Fn(Progress) + Send + Sync + 'a) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Only report every `every` units (and always on the last one).
    #[must_use]
    pub fn every(mut self, every: usize) -> Self {
        self.every = every.max(1);
        self
    }

    /// # Errors
    ///
    /// Returns [`GraphError::Cancelled`] once the stop check returns true.
    pub fn check(&self) -> Result<(), GraphError> {
        match &self.should_stop {
            Some(stop) if stop() => Err(GraphError::Cancelled),
            _ => Ok(()),
        }
    }

    pub fn report(&self, done: usize, total: usize) {
        if let Some(progress) = &self.progress {
            if done % self.every == 0 || done == total {
                progress(Progress { done, total });
            }
        }
    }
}

impl std::fmt::Debug for Control<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Control")
            .field("should_stop", &self.should_stop.is_some())
            .field("progress", &self.progress.is_some())
            .field("every", &self.every)
            .finish()
    }
}
