//! Retry classification for transfer task failures.
//!
//! A task handler wraps its failure in [`TaskError`] to tell the queue
//! whether the attempt is worth repeating. Anything not explicitly marked
//! unrecoverable is retried.

use std::fmt;

/// A task failure tagged with whether retrying can help.
#[derive(Debug)]
pub struct TaskError {
    cause: anyhow::Error,
    retryable: bool,
}

impl TaskError {
    /// A failure no retry can fix, e.g. the staging file is gone or the
    /// backend rejected the credentials. The queue fails the task
    /// immediately without consuming further attempts.
    pub fn unrecoverable(cause: impl Into<anyhow::Error>) -> Self {
        Self {
            cause: cause.into(),
            retryable: false,
        }
    }

    /// A transient failure: network trouble, a busy backend, a briefly
    /// unavailable database. The queue retries with backoff until the
    /// task's attempt budget runs out.
    pub fn recoverable(cause: impl Into<anyhow::Error>) -> Self {
        Self {
            cause: cause.into(),
            retryable: true,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        self.retryable
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.cause.fmt(f)
    }
}

impl std::error::Error for TaskError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.source()
    }
}

// anyhow's blanket impl gives the reverse direction (TaskError into
// anyhow::Error) for free.
impl From<anyhow::Error> for TaskError {
    /// Untagged errors default to recoverable.
    fn from(err: anyhow::Error) -> Self {
        Self::recoverable(err)
    }
}

/// Shorthand for tagging a whole `Result` as terminal on failure.
pub trait TaskResultExt<T> {
    fn unrecoverable(self) -> Result<T, TaskError>;
}

impl<T, E: Into<anyhow::Error>> TaskResultExt<T> for Result<T, E> {
    fn unrecoverable(self) -> Result<T, TaskError> {
        self.map_err(TaskError::unrecoverable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrecoverable_keeps_message() {
        let err = TaskError::unrecoverable(anyhow::anyhow!("staging file missing"));
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("staging file missing"));
    }

    #[test]
    fn test_recoverable_keeps_message() {
        let err = TaskError::recoverable(anyhow::anyhow!("store timeout"));
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("store timeout"));
    }

    #[test]
    fn test_plain_anyhow_defaults_to_recoverable() {
        let err: TaskError = anyhow::anyhow!("some error").into();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_result_ext_tags_terminal() {
        let result: Result<(), anyhow::Error> = Err(anyhow::anyhow!("record not found"));
        let tagged = result.unrecoverable();
        assert!(!tagged.unwrap_err().is_recoverable());
    }

    #[test]
    fn test_round_trips_through_anyhow() {
        let err: anyhow::Error = TaskError::unrecoverable(anyhow::anyhow!("gone")).into();
        let recovered = err.downcast_ref::<TaskError>().unwrap();
        assert!(!recovered.is_recoverable());
    }
}
