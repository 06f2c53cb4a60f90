//! One simulation instance: the single owner of the board, the drag, the settle
//! tracker and the submitter. Pointer callbacks and ticks must be driven from the
//! same scheduling context.

use crate::GameConfig;
use crate::drag::{DragState, DragStep};
use crate::grid::{BlockId, Board};
use crate::line_clear::{ClearReport, SettleTracker, clear_complete_rows};
use crate::submit::{MoveAuthority, MoveIntent, Offer, SubmissionEvent, Submitter};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Counters for the status display and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub ticks: u64,
    pub moves_submitted: u32,
    pub moves_accepted: u32,
    pub moves_failed: u32,
    pub resyncs: u32,
    pub rows_cleared: u32,
    pub blocks_cleared: u32,
}

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Gravity was suspended because a drag is open.
    pub paused: bool,
    pub moving: bool,
    /// Pending move sent on this tick.
    pub dispatched: Option<MoveIntent>,
    pub cleared: Option<ClearReport>,
    /// The board was replaced by an authority snapshot.
    pub resynced: bool,
}

pub struct Session<A> {
    board: Board,
    drag: DragState,
    settle: SettleTracker,
    submitter: Submitter<A>,
    cell_size: f64,
    drag_timeout: Option<Duration>,
    resync_on_failure: bool,
    stats: SessionStats,
    last_message: Option<String>,
}

impl<A: MoveAuthority> Session<A> {
    pub fn new(board: Board, submitter: Submitter<A>, config: &GameConfig) -> Self {
        Self {
            board,
            drag: DragState::Idle,
            settle: SettleTracker::new(),
            submitter: submitter.with_timeout(config.submit_timeout()),
            cell_size: if config.cell_size > 0.0 {
                config.cell_size
            } else {
                warn!(cell_size = config.cell_size, "non-positive cell size; using the default");
                GameConfig::default().cell_size
            },
            drag_timeout: config.drag_timeout(),
            resync_on_failure: config.resync_on_failure,
            stats: SessionStats::default(),
            last_message: None,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn drag_state(&self) -> &DragState {
        &self.drag
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    /// No block moved on the most recent tick.
    pub fn is_stable(&self) -> bool {
        !self.settle.is_moving()
    }

    pub fn pending_move(&self) -> Option<MoveIntent> {
        self.submitter.pending()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn submitter(&self) -> &Submitter<A> {
        &self.submitter
    }

    /// Latest human-readable note from the authority side.
    pub fn last_message(&self) -> Option<&str> {
        self.last_message.as_deref()
    }

    /// Presentation layers with a different pointer unit (e.g. after a resize) update this.
    pub fn set_cell_size(&mut self, cell_size: f64) {
        if cell_size > 0.0 {
            self.cell_size = cell_size;
        }
    }

    /// Interaction start over `block`. A drag still open (its end event was lost)
    /// is released first.
    pub fn pointer_down(&mut self, block: BlockId, pointer_x: f64, now: Instant) -> bool {
        if self.drag.is_dragging() {
            warn!("pointer down while a drag was open; releasing the previous drag");
            self.pointer_up();
        }
        self.drag.begin(&self.board, block, pointer_x, now)
    }

    pub fn pointer_move(&mut self, pointer_x: f64, now: Instant) -> DragStep {
        self.drag.drag_to(&mut self.board, pointer_x, self.cell_size, now)
    }

    /// Interaction end: settle the block and hand any resulting move to the submitter.
    pub fn pointer_up(&mut self) -> Option<Offer> {
        let block = self.drag.session()?.block_id;
        let intent = self.drag.release(&mut self.board)?;
        let offer = self.submitter.offer(block, intent, self.is_stable());
        self.settle.mark_dirty();
        if offer == Offer::Dispatched {
            self.stats.moves_submitted += 1;
        }
        Some(offer)
    }

    /// Interaction aborted (pointer left the surface, focus lost, pause).
    pub fn pointer_cancel(&mut self) {
        self.drag.cancel(&mut self.board);
    }

    /// One scheduled step. Does nothing but expire stale drags while a drag is open.
    pub fn tick(&mut self, now: Instant) -> TickReport {
        if let Some(timeout) = self.drag_timeout {
            if self.drag.timed_out(now, timeout) {
                debug!("drag timed out; releasing");
                self.pointer_up();
            }
        }
        if self.drag.is_dragging() {
            return TickReport {
                paused: true,
                ..TickReport::default()
            };
        }

        let resynced = self.apply_submission_events();
        self.stats.ticks += 1;
        let moving = self.board.apply_gravity();
        if moving {
            debug!(tick = self.stats.ticks, "blocks fell");
        }
        let should_clear = self.settle.observe(moving);

        let dispatched = if moving {
            None
        } else {
            self.submitter.flush_pending(&self.board)
        };
        if dispatched.is_some() {
            self.stats.moves_submitted += 1;
        }

        let cleared = should_clear
            .then(|| clear_complete_rows(&mut self.board))
            .filter(|report| !report.is_empty());
        if let Some(report) = &cleared {
            self.stats.rows_cleared += report.rows.len() as u32;
            self.stats.blocks_cleared += report.removed.len() as u32;
        }

        TickReport {
            paused: false,
            moving,
            dispatched,
            cleared,
            resynced,
        }
    }

    fn apply_submission_events(&mut self) -> bool {
        let mut resynced = false;
        for event in self.submitter.poll_events() {
            match event {
                SubmissionEvent::Accepted(intent) => {
                    self.stats.moves_accepted += 1;
                    self.last_message = Some(format!("accepted {intent}"));
                }
                SubmissionEvent::Failed { intent, error } => {
                    self.stats.moves_failed += 1;
                    self.last_message = Some(format!("{intent} failed: {error}"));
                    if self.resync_on_failure {
                        self.submitter.request_resync();
                    }
                }
                SubmissionEvent::Snapshot(specs) => match Board::from_specs(&specs) {
                    Ok(board) => {
                        info!(blocks = board.len(), "board resynced from authority");
                        self.board = board;
                        self.settle.rearm();
                        if let Some(dropped) = self.submitter.discard_pending() {
                            warn!(%dropped, "pending move dropped by resync");
                        }
                        self.stats.resyncs += 1;
                        self.last_message = Some("board resynced".to_string());
                        resynced = true;
                    }
                    Err(error) => {
                        warn!(%error, "authority snapshot rejected; keeping local board");
                        self.last_message = Some(format!("resync rejected: {error}"));
                    }
                },
                SubmissionEvent::SnapshotFailed(error) => {
                    self.last_message = Some(format!("resync failed: {error}"));
                }
            }
        }
        resynced
    }
}
