//! Public-link display state.
//!
//! Only the most recently requested file's link may be displayed. Each
//! request takes a ticket; a result arriving for an older ticket is reported
//! as superseded and never shown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use pipestash_common::{ShareLink, TransferError};

/// Result of a link request that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareOutcome {
    /// The link is for the latest request and is now displayed.
    Current(ShareLink),
    /// A newer request was made while this one was pending.
    Superseded { file_name: String },
}

#[derive(Debug, Default)]
struct Display {
    pending: Option<String>,
    link: Option<ShareLink>,
}

/// Tracks the pending request and the link on display.
#[derive(Debug, Default)]
pub struct ShareState {
    latest: AtomicU64,
    display: Mutex<Display>,
}

impl ShareState {
    pub fn new() -> Self {
        Self::default()
    }

    fn display(&self) -> MutexGuard<'_, Display> {
        self.display.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a request for `file_name`, hiding any link on display.
    pub fn begin(&self, file_name: &str) -> u64 {
        let ticket = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let mut display = self.display();
        display.pending = Some(file_name.to_string());
        display.link = None;
        ticket
    }

    /// Settle the request holding `ticket`.
    ///
    /// Errors are returned to the caller either way. Display state is only
    /// touched when `ticket` is still the latest.
    pub fn complete(
        &self,
        ticket: u64,
        file_name: &str,
        result: Result<String, TransferError>,
    ) -> Result<ShareOutcome, TransferError> {
        let mut display = self.display();
        let is_latest = self.latest.load(Ordering::SeqCst) == ticket;

        match result {
            Ok(url) if is_latest => {
                let link = ShareLink {
                    file_name: file_name.to_string(),
                    url,
                };
                display.pending = None;
                display.link = Some(link.clone());
                Ok(ShareOutcome::Current(link))
            }
            Ok(_) => Ok(ShareOutcome::Superseded {
                file_name: file_name.to_string(),
            }),
            Err(e) => {
                if is_latest {
                    display.pending = None;
                    display.link = None;
                }
                Err(e)
            }
        }
    }

    /// File whose link is being requested, if any.
    pub fn pending(&self) -> Option<String> {
        self.display().pending.clone()
    }

    /// Link currently on display.
    pub fn displayed(&self) -> Option<ShareLink> {
        self.display().link.clone()
    }

    /// Hide the link and forget any pending request.
    pub fn dismiss(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
        let mut display = self.display();
        display.pending = None;
        display.link = None;
    }
}
