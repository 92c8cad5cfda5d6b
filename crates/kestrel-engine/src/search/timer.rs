//! One-shot deadline that stops a search when its hard limit passes.

use std::sync::Weak;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::search::control::SearchControl;

/// Stops the search after a delay unless dropped first.
pub(crate) struct DeadlineTimer {
    _cancel: Sender<()>,
}

impl DeadlineTimer {
    /// Arm the timer. Failing to spawn leaves the search without a hard
    /// limit, which the soft checks between iterations still bound.
    pub(crate) fn start(after: Duration, control: Weak<SearchControl>) -> Option<DeadlineTimer> {
        let (cancel, fired) = mpsc::channel::<()>();
        let spawned = thread::Builder::new()
            .name("kestrel-deadline".into())
            .spawn(move || {
                if let Err(RecvTimeoutError::Timeout) = fired.recv_timeout(after)
                    && let Some(control) = control.upgrade()
                {
                    debug!(limit_ms = after.as_millis() as u64, "hard time limit reached");
                    control.stop();
                }
            });
        match spawned {
            Ok(_) => Some(DeadlineTimer { _cancel: cancel }),
            Err(error) => {
                warn!(%error, "could not start deadline timer");
                None
            }
        }
    }
}
