//! Long-poll update loop.
//!
//! The poller owns the cursor (`GetUpdates::offset`). For each fetched update whose id is at or
//! past the cursor, the cursor moves to `id + 1` and then the update is sent on the output
//! channel; older ids are skipped. An entry that fails to decode is reported to the observer and
//! stepped over. Transport and decode failures, and API rejections carrying `retry_after`, are
//! reported and retried after a fixed backoff; any other error ends the loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::Invoker;
use crate::error::{Error, Result};
use crate::methods::GetUpdates;
use crate::types::{PageEntry, Update};

pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(3);

/// Called with every error the loop recovers from, including undecodable page entries.
pub type ErrorObserver = Arc<dyn Fn(&Error) + Send + Sync>;

pub struct Poller {
    api: Arc<dyn Invoker>,
    config: GetUpdates,
    backoff: Duration,
    observer: ErrorObserver,
}

impl Poller {
    /// Poller starting from `config.offset`, with the default backoff and a `warn!` observer.
    pub fn new(api: Arc<dyn Invoker>, config: GetUpdates) -> Self {
        Self {
            api,
            config,
            backoff: DEFAULT_RETRY_BACKOFF,
            observer: Arc::new(|e: &Error| {
                warn!(error = %e, "getUpdates failed, continuing");
            }),
        }
    }

    /// Delay between a retryable failure and the next request.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Replaces the hook that sees every error the loop recovers from.
    pub fn with_observer(mut self, observer: ErrorObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Next update id the poller will ask for.
    pub fn offset(&self) -> i64 {
        self.config.offset
    }

    /// Runs the loop on a new task with an output channel of `buffer` slots.
    pub fn spawn(
        self,
        buffer: usize,
        cancel: CancellationToken,
    ) -> (mpsc::Receiver<Update>, JoinHandle<Result<()>>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let handle = tokio::spawn(self.run(tx, cancel));
        (rx, handle)
    }

    /// Polls until cancelled or a non-retryable error.
    ///
    /// Returns `Ok(())` only when the receiving side of `out` was dropped. `out` is dropped on
    /// return, which closes the channel.
    pub async fn run(mut self, out: mpsc::Sender<Update>, cancel: CancellationToken) -> Result<()> {
        self.config.validate()?;
        info!(offset = self.config.offset, "polling for updates");

        loop {
            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                r = self.api.get_updates(&self.config) => r,
            };

            let page = match fetched {
                Ok(page) => page,
                Err(e) if !e.is_retryable() => {
                    warn!(error = %e, "polling stopped");
                    return Err(e);
                }
                Err(e) => {
                    (self.observer)(&e);
                    let wait = match &e {
                        Error::Api {
                            retry_after: Some(secs),
                            ..
                        } => self.backoff.max(Duration::from_secs(*secs)),
                        _ => self.backoff,
                    };
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(Error::Cancelled),
                        _ = tokio::time::sleep(wait) => continue,
                    }
                }
            };

            debug!(count = page.len(), offset = self.config.offset, "fetched updates");
            for entry in page {
                let update = match entry {
                    PageEntry::Update(update) => update,
                    PageEntry::Invalid { update_id, error } => {
                        if let Some(id) = update_id {
                            self.config.offset = self.config.offset.max(id + 1);
                        }
                        (self.observer)(&Error::Decode(error));
                        continue;
                    }
                };
                if update.update_id < self.config.offset {
                    debug!(update_id = update.update_id, "skipping already delivered update");
                    continue;
                }
                self.config.offset = update.update_id + 1;
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(Error::Cancelled),
                    sent = out.send(update) => {
                        if sent.is_err() {
                            info!("update receiver dropped, polling stopped");
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}
