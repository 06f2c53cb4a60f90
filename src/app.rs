//! App: terminal init, main loop, tick, key and mouse handling.

use crate::Args;
use crate::input::{Action, Pointer, key_to_action, mouse_to_pointer};
use crate::theme::Theme;
use crate::ui::{self, View};
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::DefaultTerminal;
use ratatui::layout::Rect;
use slidetui::GameConfig;
use slidetui::authority::LocalAuthority;
use slidetui::grid::{BlockSpec, Board};
use slidetui::session::Session;
use slidetui::submit::{Credential, Submitter};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tachyonfx::Effect;
use tokio::runtime::Handle;
use tracing::{debug, info};

/// Upper bound on the time between two frames.
const FRAME_MS: u64 = 16;

/// Session over `specs`, backed by a local authority holding its own copy of the layout.
pub fn build_session(
    specs: &[BlockSpec],
    config: &GameConfig,
    args: &Args,
    runtime: Handle,
) -> Result<Session<LocalAuthority>> {
    let board = Board::from_specs(specs).context("invalid board layout")?;
    let authority = LocalAuthority::new(board.clone())
        .with_latency(Duration::from_millis(args.authority_latency_ms));
    let credential = args.account.as_deref().map(Credential::new);
    let submitter = Submitter::new(Arc::new(authority), credential, runtime);
    Ok(Session::new(board, submitter, config))
}

pub struct App {
    args: Args,
    config: GameConfig,
    theme: Theme,
    specs: Vec<BlockSpec>,
    runtime: Handle,
    session: Session<LocalAuthority>,
    paused: bool,
    last_tick: Instant,
    /// Frame area of the last draw; mouse positions are resolved against it.
    area: Rect,
    /// Rows flashing after the most recent clear.
    cleared_rows: Vec<usize>,
    /// TachyonFX fade effect for the row clear (created when the flash starts).
    line_clear_effect: Option<Effect>,
    /// Last time we processed the row-clear effect (for delta).
    line_clear_effect_process_time: Option<Instant>,
}

impl App {
    pub fn new(
        args: Args,
        config: GameConfig,
        theme: Theme,
        specs: Vec<BlockSpec>,
        runtime: Handle,
    ) -> Result<Self> {
        let session = build_session(&specs, &config, &args, runtime.clone())?;
        Ok(Self {
            args,
            config,
            theme,
            specs,
            runtime,
            session,
            paused: false,
            last_tick: Instant::now(),
            area: Rect::default(),
            cleared_rows: Vec::new(),
            line_clear_effect: None,
            line_clear_effect_process_time: None,
        })
    }

    fn reset_game(&mut self) -> Result<()> {
        self.session = build_session(&self.specs, &self.config, &self.args, self.runtime.clone())?;
        self.paused = false;
        self.last_tick = Instant::now();
        self.clear_flash();
        info!("board restarted");
        Ok(())
    }

    fn clear_flash(&mut self) {
        self.cleared_rows.clear();
        self.line_clear_effect = None;
        self.line_clear_effect_process_time = None;
    }

    fn toggle_pause(&mut self) {
        self.paused = !self.paused;
        if self.paused {
            self.session.pointer_cancel();
        } else {
            self.last_tick = Instant::now();
        }
        debug!(paused = self.paused, "pause toggled");
    }

    fn handle_pointer(&mut self, pointer: Pointer, now: Instant) {
        if self.paused {
            return;
        }
        match pointer {
            Pointer::Down { column, row } => {
                let Some((grid_row, grid_column)) = ui::cell_at(ui::board_rect(self.area), column, row)
                else {
                    return;
                };
                if let Some(id) = self.session.board().block_at(grid_row, grid_column) {
                    self.session.pointer_down(id, f64::from(column), now);
                }
            }
            Pointer::Move { column } => {
                self.session.pointer_move(f64::from(column), now);
            }
            Pointer::Up => {
                if let Some(offer) = self.session.pointer_up() {
                    debug!(?offer, "slide committed");
                }
            }
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture},
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        // Not every terminal reports focus; drags are still ended by the timeout.
        let _ = execute!(stdout, EnableFocusChange);

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        // Restore
        let _ = execute!(std::io::stdout(), DisableFocusChange);
        execute!(std::io::stdout(), DisableMouseCapture, LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let tick_interval = self.config.tick_interval();
        loop {
            let now = Instant::now();
            let view = View {
                board: self.session.board(),
                drag: self.session.drag_state(),
                stats: self.session.stats(),
                stable: self.session.is_stable(),
                pending: self.session.pending_move(),
                account: self.args.account.as_deref(),
                last_message: self.session.last_message(),
                paused: self.paused,
                theme: &self.theme,
                cleared_rows: &self.cleared_rows,
            };
            let area = &mut self.area;
            let line_clear_effect = &mut self.line_clear_effect;
            let line_clear_process_time = &mut self.line_clear_effect_process_time;
            terminal.draw(|f| {
                *area = f.area();
                ui::draw(f, &view, *area, line_clear_effect, line_clear_process_time, now);
            })?;

            if self.line_clear_effect.as_ref().is_some_and(|e| e.done()) {
                self.clear_flash();
            }

            let timeout = Duration::from_millis(FRAME_MS).saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    match event::read()? {
                        Event::Key(key) if key.kind == KeyEventKind::Press => match key_to_action(key) {
                            Action::Quit => return Ok(()),
                            Action::Pause => self.toggle_pause(),
                            Action::Restart => self.reset_game()?,
                            Action::None => {}
                        },
                        Event::Mouse(mouse) => {
                            if let Some(pointer) = mouse_to_pointer(mouse) {
                                self.handle_pointer(pointer, Instant::now());
                            }
                        }
                        Event::FocusLost => self.session.pointer_cancel(),
                        _ => {}
                    }
                }
            }

            if !self.paused && self.last_tick.elapsed() >= tick_interval {
                self.last_tick = Instant::now();
                let report = self.session.tick(self.last_tick);
                if let Some(cleared) = report.cleared {
                    self.clear_flash();
                    self.cleared_rows = cleared.rows;
                }
            }
        }
    }
}
