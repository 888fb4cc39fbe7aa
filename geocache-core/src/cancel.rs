//! Cooperative cancellation of long running resolutions.
//!
//! A [`Cancellation`] combines an optional deadline with an
//! optional cancel signal that is triggered through the
//! corresponding [`CancelHandle`].

use std::future;
use thiserror::Error;
use tokio::{
    sync::watch,
    time::{self, Instant},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Interrupt {
    #[error("cancelled")]
    Cancelled,
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    deadline: Option<Instant>,
    signal: Option<watch::Receiver<bool>>,
}

/// Triggers the cancellation of all clones of the
/// associated [`Cancellation`].
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

impl Cancellation {
    /// Never interrupts.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new() -> (CancelHandle, Self) {
        let (tx, rx) = watch::channel(false);
        let cancellation = Self {
            deadline: None,
            signal: Some(rx),
        };
        (CancelHandle(tx), cancellation)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Checks the current state without waiting.
    pub fn check(&self) -> Result<(), Interrupt> {
        if self.signal.as_ref().is_some_and(|rx| *rx.borrow()) {
            return Err(Interrupt::Cancelled);
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(Interrupt::DeadlineExceeded);
        }
        Ok(())
    }

    /// Completes as soon as the cancellation has been
    /// triggered or the deadline has passed.
    ///
    /// Never completes for [`Cancellation::none`].
    pub async fn interrupted(&self) -> Interrupt {
        let cancelled = async {
            let Some(rx) = &self.signal else {
                return future::pending().await;
            };
            let mut rx = rx.clone();
            loop {
                if *rx.borrow_and_update() {
                    return;
                }
                if rx.changed().await.is_err() {
                    // The handle has been dropped without cancelling
                    return future::pending().await;
                }
            }
        };
        let deadline_passed = async {
            match self.deadline {
                Some(deadline) => time::sleep_until(deadline).await,
                None => future::pending().await,
            }
        };
        tokio::select! {
            () = cancelled => Interrupt::Cancelled,
            () = deadline_passed => Interrupt::DeadlineExceeded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn none_is_never_interrupted() {
        assert_eq!(Ok(()), Cancellation::none().check());
    }

    #[tokio::test]
    async fn cancel_all_clones() {
        let (handle, cancellation) = Cancellation::new();
        let clone = cancellation.clone();
        assert_eq!(Ok(()), clone.check());
        handle.cancel();
        assert_eq!(Err(Interrupt::Cancelled), cancellation.check());
        assert_eq!(Err(Interrupt::Cancelled), clone.check());
        assert_eq!(Interrupt::Cancelled, clone.interrupted().await);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_passes() {
        let deadline = Instant::now() + Duration::from_secs(5);
        let cancellation = Cancellation::none().with_deadline(deadline);
        assert_eq!(Ok(()), cancellation.check());
        assert_eq!(Interrupt::DeadlineExceeded, cancellation.interrupted().await);
        assert!(Instant::now() >= deadline);
        assert_eq!(Err(Interrupt::DeadlineExceeded), cancellation.check());
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_handle_does_not_cancel() {
        let (handle, cancellation) = Cancellation::new();
        drop(handle);
        let cancellation = cancellation.with_deadline(Instant::now() + Duration::from_secs(1));
        assert_eq!(Interrupt::DeadlineExceeded, cancellation.interrupted().await);
    }
}
