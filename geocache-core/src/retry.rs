use crate::cancel::{Cancellation, Interrupt};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 40;
pub const DEFAULT_DELAY: Duration = Duration::from_secs(10);

/// Classifies errors that might disappear by trying again.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for crate::db::Error {
    fn is_transient(&self) -> bool {
        crate::db::Error::is_transient(self)
    }
}

/// Repeats an operation a bounded number of times with a
/// fixed delay between the attempts.
///
/// Only [transient](Transient) errors are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

#[derive(Debug, Error)]
pub enum RetryError<E> {
    #[error("giving up after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: E },
    #[error("failed permanently after {attempts} attempt(s): {error}")]
    Permanent { attempts: u32, error: E },
    #[error("{reason} after {attempts} attempt(s)")]
    Interrupted { attempts: u32, reason: Interrupt },
}

impl<E> RetryError<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. }
            | Self::Permanent { attempts, .. }
            | Self::Interrupted { attempts, .. } => *attempts,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_DELAY,
        }
    }
}

impl RetryPolicy {
    /// At least one attempt is always made.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub const fn delay(&self) -> Duration {
        self.delay
    }

    pub async fn run<T, E, F>(&self, cancel: &Cancellation, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Result<T, E>,
        E: Transient + std::fmt::Display,
    {
        let mut attempts = 0;
        loop {
            if let Err(reason) = cancel.check() {
                return Err(RetryError::Interrupted { attempts, reason });
            }
            attempts += 1;
            let err = match op() {
                Ok(res) => return Ok(res),
                Err(err) => err,
            };
            if !err.is_transient() {
                return Err(RetryError::Permanent {
                    attempts,
                    error: err,
                });
            }
            let remaining = self.max_attempts - attempts;
            if remaining == 0 {
                return Err(RetryError::Exhausted {
                    attempts,
                    last_error: err,
                });
            }
            log::warn!("Attempt {attempts} failed: {err} ({remaining} more retries)");
            tokio::select! {
                () = tokio::time::sleep(self.delay) => {}
                reason = cancel.interrupted() => {
                    return Err(RetryError::Interrupted { attempts, reason });
                }
            }
        }
    }
}
