//! Move submission: hands committed slides to the authority without blocking the tick.
//!
//! Outcomes flow back as [`SubmissionEvent`]s on a channel the session drains each
//! tick. The local board is never rolled back by a failure; the session may instead
//! ask for a fresh snapshot (see [`Submitter::request_resync`]).

use crate::grid::{BlockId, BlockSpec, Board};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

/// A committed horizontal slide. Serialises with the authority's field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MoveIntent {
    #[serde(rename = "row_index")]
    pub row: usize,
    #[serde(rename = "start_index")]
    pub start_column: usize,
    #[serde(rename = "final_index")]
    pub final_column: usize,
}

impl MoveIntent {
    pub fn is_noop(&self) -> bool {
        self.start_column == self.final_column
    }
}

impl fmt::Display for MoveIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "row {}: {} -> {}",
            self.row, self.start_column, self.final_column
        )
    }
}

/// Identity the authority accepts moves from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Credential(String);

impl Credential {
    pub fn new(account: impl Into<String>) -> Self {
        Self(account.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorityError {
    #[error("move rejected: {0}")]
    Rejected(String),
    #[error("authority unavailable: {0}")]
    Unavailable(String),
    #[error("no answer from authority within {0:?}")]
    TimedOut(Duration),
}

/// The external system of record for moves.
pub trait MoveAuthority: Send + Sync + 'static {
    fn submit_move(
        &self,
        credential: &Credential,
        intent: MoveIntent,
    ) -> impl Future<Output = Result<(), AuthorityError>> + Send;

    /// Authoritative board, used to resync after a failed submission.
    fn fetch_board(
        &self,
        credential: &Credential,
    ) -> impl Future<Output = Result<Vec<BlockSpec>, AuthorityError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionEvent {
    Accepted(MoveIntent),
    Failed {
        intent: MoveIntent,
        error: AuthorityError,
    },
    Snapshot(Vec<BlockSpec>),
    SnapshotFailed(AuthorityError),
}

/// What happened to an intent offered to the submitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// No credential, or the slide ended where it started.
    Skipped,
    Dispatched,
    /// Held until the next stable tick. `replaced` is the pending move it overwrote.
    Deferred { replaced: Option<MoveIntent> },
}

/// A deferred move and the block it belongs to. The row is read back from the
/// board when the move is finally sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingMove {
    block: BlockId,
    intent: MoveIntent,
}

pub struct Submitter<A> {
    authority: Arc<A>,
    credential: Option<Credential>,
    runtime: Handle,
    timeout: Option<Duration>,
    pending: Option<PendingMove>,
    events_tx: UnboundedSender<SubmissionEvent>,
    events_rx: UnboundedReceiver<SubmissionEvent>,
}

impl<A: MoveAuthority> Submitter<A> {
    pub fn new(authority: Arc<A>, credential: Option<Credential>, runtime: Handle) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            authority,
            credential,
            runtime,
            timeout: None,
            pending: None,
            events_tx,
            events_rx,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn authority(&self) -> &Arc<A> {
        &self.authority
    }

    pub fn pending(&self) -> Option<MoveIntent> {
        self.pending.map(|p| p.intent)
    }

    /// Submit now if `stable`, otherwise hold as the single pending move for `block`.
    /// A newer intent replaces an older pending one (most recent wins).
    pub fn offer(&mut self, block: BlockId, intent: MoveIntent, stable: bool) -> Offer {
        if intent.is_noop() || self.credential.is_none() {
            debug!(%intent, "submission skipped");
            return Offer::Skipped;
        }
        if stable {
            self.dispatch(intent);
            return Offer::Dispatched;
        }
        let replaced = self
            .pending
            .replace(PendingMove { block, intent })
            .map(|p| p.intent);
        if let Some(old) = replaced {
            warn!(dropped = %old, kept = %intent, "pending move overwritten");
        } else {
            debug!(%intent, "move deferred until the board settles");
        }
        Offer::Deferred { replaced }
    }

    /// Called on a stable tick: dispatch the pending move, if any, on the row its
    /// block has come to rest on. A block cleared meanwhile drops the move.
    pub fn flush_pending(&mut self, board: &Board) -> Option<MoveIntent> {
        let PendingMove { block, intent } = self.pending.take()?;
        let Some(resting) = board.block(block) else {
            debug!(%block, %intent, "pending move dropped; block was cleared");
            return None;
        };
        let intent = MoveIntent {
            row: resting.y,
            ..intent
        };
        self.dispatch(intent);
        Some(intent)
    }

    /// Forget the pending move without sending it.
    pub fn discard_pending(&mut self) -> Option<MoveIntent> {
        self.pending.take().map(|p| p.intent)
    }

    fn dispatch(&self, intent: MoveIntent) {
        let Some(credential) = self.credential.clone() else {
            return;
        };
        let authority = Arc::clone(&self.authority);
        let events = self.events_tx.clone();
        let timeout = self.timeout;
        info!(%intent, account = %credential, "submitting move");
        self.runtime.spawn(async move {
            let outcome = with_timeout(timeout, authority.submit_move(&credential, intent)).await;
            let event = match outcome {
                Ok(()) => {
                    info!(%intent, "move accepted");
                    SubmissionEvent::Accepted(intent)
                }
                Err(error) => {
                    error!(%intent, %error, "move submission failed");
                    SubmissionEvent::Failed { intent, error }
                }
            };
            // The session may already be gone; nothing left to tell.
            let _ = events.send(event);
        });
    }

    /// Ask the authority for its board. The answer arrives as a snapshot event.
    pub fn request_resync(&self) {
        let Some(credential) = self.credential.clone() else {
            return;
        };
        let authority = Arc::clone(&self.authority);
        let events = self.events_tx.clone();
        let timeout = self.timeout;
        info!("requesting board resync from authority");
        self.runtime.spawn(async move {
            let event = match with_timeout(timeout, authority.fetch_board(&credential)).await {
                Ok(specs) => SubmissionEvent::Snapshot(specs),
                Err(error) => {
                    error!(%error, "board resync failed");
                    SubmissionEvent::SnapshotFailed(error)
                }
            };
            let _ = events.send(event);
        });
    }

    /// Drain every outcome that has arrived so far, without waiting.
    pub fn poll_events(&mut self) -> Vec<SubmissionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Wait for the next outcome.
    pub async fn next_event(&mut self) -> Option<SubmissionEvent> {
        self.events_rx.recv().await
    }
}

async fn with_timeout<T>(
    limit: Option<Duration>,
    fut: impl Future<Output = Result<T, AuthorityError>>,
) -> Result<T, AuthorityError> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .unwrap_or(Err(AuthorityError::TimedOut(limit))),
        None => fut.await,
    }
}
