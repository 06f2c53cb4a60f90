//! Layout and drawing: board, sidebar, pause overlay, row-clear flash.

use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Paragraph, Widget, Wrap};
use slidetui::drag::DragState;
use slidetui::grid::{Board, GRID_HEIGHT, GRID_WIDTH};
use slidetui::session::SessionStats;
use slidetui::submit::MoveIntent;
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Terminal cells per grid cell. Pointer columns are divided by `CELL_WIDTH`
/// to get grid columns.
pub const CELL_WIDTH: u16 = 4;
pub const CELL_HEIGHT: u16 = 2;
const SIDEBAR_WIDTH: u16 = 30;

const BOARD_WIDTH: u16 = GRID_WIDTH as u16 * CELL_WIDTH;
const BOARD_HEIGHT: u16 = GRID_HEIGHT as u16 * CELL_HEIGHT;

/// Duration of the row-clear fade (TachyonFX) in ms.
const LINE_CLEAR_FADE_MS: u32 = 400;

/// Everything one frame needs from the session and the app.
pub struct View<'a> {
    pub board: &'a Board,
    pub drag: &'a DragState,
    pub stats: SessionStats,
    pub stable: bool,
    pub pending: Option<MoveIntent>,
    pub account: Option<&'a str>,
    pub last_message: Option<&'a str>,
    pub paused: bool,
    pub theme: &'a Theme,
    /// Rows flashing after a clear (blocks already removed).
    pub cleared_rows: &'a [usize],
}

/// Playfield (with border) and sidebar, centred in `area`.
fn split_area(area: Rect) -> (Rect, Rect) {
    let (pw, ph) = (BOARD_WIDTH + 2, BOARD_HEIGHT + 2);
    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(pw + SIDEBAR_WIDTH),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(ph),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(pw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert[1]);
    (inner[0], inner[1])
}

fn inner_board(playfield: Rect) -> Rect {
    Rect {
        x: playfield.x + 1,
        y: playfield.y + 1,
        width: BOARD_WIDTH.min(playfield.width.saturating_sub(2)),
        height: BOARD_HEIGHT.min(playfield.height.saturating_sub(2)),
    }
}

/// Board cells only (inside the playfield border) for a frame of size `area`.
pub fn board_rect(area: Rect) -> Rect {
    inner_board(split_area(area).0)
}

/// Grid (row, column) under a terminal position, if it is on the board.
pub fn cell_at(board: Rect, column: u16, row: u16) -> Option<(usize, usize)> {
    board.contains(Position::new(column, row)).then(|| {
        (
            usize::from((row - board.y) / CELL_HEIGHT),
            usize::from((column - board.x) / CELL_WIDTH),
        )
    })
}

/// Terminal positions covered by the given grid rows.
fn row_buffer_positions(board_rect: Rect, rows: &[usize]) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    for &row in rows {
        let y0 = board_rect.y + row as u16 * CELL_HEIGHT;
        for by in y0..(y0 + CELL_HEIGHT).min(board_rect.bottom()) {
            for bx in board_rect.left()..board_rect.right() {
                set.insert((bx, by));
            }
        }
    }
    set
}

/// Create or update the row-clear fade and process it.
fn apply_line_clear_effect(
    frame: &mut Frame,
    view: &View<'_>,
    area: Rect,
    line_clear_effect: &mut Option<Effect>,
    line_clear_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let board_rect = board_rect(area);
    let delta = line_clear_process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u128::from(u32::MAX)) as u32;
    let tfx_delta = TfxDuration::from_millis(delta_ms);
    *line_clear_process_time = Some(now);

    if line_clear_effect.is_none() {
        let clearing_set = row_buffer_positions(board_rect, view.cleared_rows);
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            clearing_set.contains(&(pos.x, pos.y))
        }));
        let bg = view.theme.bg;
        let effect = fx::fade_to(bg, bg, (LINE_CLEAR_FADE_MS, Interpolation::Linear))
            .with_filter(filter)
            .with_area(board_rect);
        *line_clear_effect = Some(effect);
    }

    if let Some(effect) = line_clear_effect {
        frame.render_effect(effect, board_rect, tfx_delta);
    }
}

/// Draw board and sidebar, with the pause overlay and the row-clear fade when active.
pub fn draw(
    frame: &mut Frame,
    view: &View<'_>,
    area: Rect,
    line_clear_effect: &mut Option<Effect>,
    line_clear_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let (playfield, sidebar) = split_area(area);
    draw_board(frame, view, playfield);
    draw_sidebar(frame, view, sidebar);
    if !view.cleared_rows.is_empty() {
        apply_line_clear_effect(
            frame,
            view,
            area,
            line_clear_effect,
            line_clear_process_time,
            now,
        );
    }
    if view.paused {
        draw_pause_overlay(frame, view.theme, area);
    }
}

fn draw_board(frame: &mut Frame, view: &View<'_>, area: Rect) {
    let theme = view.theme;
    let title = format!(" Slidetui  | Rows: {} ", view.stats.rows_cleared);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(title, Style::default().fg(theme.title)));
    let board_rect = inner_board(area);
    block.render(area, frame.buffer_mut());

    let buf = frame.buffer_mut();
    let empty = Style::default().fg(theme.div_line).bg(theme.bg);
    for y in board_rect.top()..board_rect.bottom() {
        for x in board_rect.left()..board_rect.right() {
            let (dx, dy) = (x - board_rect.x, y - board_rect.y);
            let symbol = if dx % CELL_WIDTH == CELL_WIDTH / 2 && dy % CELL_HEIGHT == 0 {
                "·"
            } else {
                " "
            };
            buf[(x, y)].set_symbol(symbol).set_style(empty);
        }
    }

    let flash = Style::default().bg(theme.flash);
    for (x, y) in row_buffer_positions(board_rect, view.cleared_rows) {
        buf[(x, y)].set_symbol(" ").set_style(flash);
    }

    let dragged = view.drag.session().map(|s| s.block_id);
    for b in view.board.blocks() {
        let color = theme.block_color(b.width);
        let left = board_rect.x + (b.x * f64::from(CELL_WIDTH)).round() as u16;
        let top = board_rect.y + b.y as u16 * CELL_HEIGHT;
        let right = (left + b.width as u16 * CELL_WIDTH).min(board_rect.right());
        let bottom = (top + CELL_HEIGHT).min(board_rect.bottom());
        let lifted = dragged == Some(b.id);
        let (fill, style) = if lifted {
            ("▒", Style::default().fg(color).bg(theme.bg))
        } else {
            (" ", Style::default().fg(theme.bg).bg(color))
        };
        for y in top..bottom {
            for x in left..right {
                // Right edge marks where one block ends and the next starts.
                let symbol = if x + 1 == right && !lifted { "▕" } else { fill };
                buf[(x, y)].set_symbol(symbol).set_style(style);
            }
        }
        if top < bottom && left + 1 < right {
            let label_style = if lifted {
                Style::default().fg(theme.flash).bg(theme.bg)
            } else {
                style
            };
            buf.set_stringn(
                left + 1,
                top,
                b.id.to_string(),
                usize::from(right - left - 1),
                label_style.add_modifier(Modifier::BOLD),
            );
        }
    }
}

fn status_label(view: &View<'_>) -> (&'static str, Color) {
    if view.paused {
        ("Paused", Color::Yellow)
    } else if view.drag.is_dragging() {
        ("Dragging", view.theme.title)
    } else if view.stable {
        ("Stable", Color::Green)
    } else {
        ("Moving", Color::Cyan)
    }
}

fn draw_sidebar(frame: &mut Frame, view: &View<'_>, area: Rect) {
    let theme = view.theme;
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let dim_style = Style::default().fg(theme.inactive_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);
    let field = |label: &'static str, value: String| {
        Line::from(vec![
            Span::styled(label, title_style),
            Span::styled(value, fg_style),
        ])
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Status (border + state, pending, account)
            Constraint::Length(1), // gap
            Constraint::Length(9), // Stats
            Constraint::Length(1), // gap
            Constraint::Length(3), // Last authority message
            Constraint::Length(3), // Help
        ])
        .split(area);

    let (label, color) = status_label(view);
    let status_lines = vec![
        Line::from(vec![
            Span::styled("State: ", title_style),
            Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
        ]),
        field(
            "Pending: ",
            view.pending.map_or_else(|| "-".to_string(), |m| m.to_string()),
        ),
        match view.account {
            Some(account) => field("Account: ", account.to_string()),
            None => Line::from(vec![
                Span::styled("Account: ", title_style),
                Span::styled("offline", dim_style),
            ]),
        },
    ];
    let status = Block::default().borders(Borders::ALL).border_style(border_style);
    let status_inner = status.inner(chunks[0]);
    status.render(chunks[0], frame.buffer_mut());
    Paragraph::new(Text::from(status_lines)).render(status_inner, frame.buffer_mut());

    let stats = view.stats;
    let stats_lines = vec![
        field("Ticks: ", stats.ticks.to_string()),
        field("Sent: ", stats.moves_submitted.to_string()),
        field("Accepted: ", stats.moves_accepted.to_string()),
        field("Failed: ", stats.moves_failed.to_string()),
        field("Resyncs: ", stats.resyncs.to_string()),
        field("Rows cleared: ", stats.rows_cleared.to_string()),
        field("Blocks left: ", view.board.len().to_string()),
    ];
    let stats_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(Span::styled(" Stats ", title_style));
    let stats_inner = stats_block.inner(chunks[2]);
    stats_block.render(chunks[2], frame.buffer_mut());
    Paragraph::new(Text::from(stats_lines)).render(stats_inner, frame.buffer_mut());

    let message = view.last_message.unwrap_or("-");
    let message_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let message_inner = message_block.inner(chunks[4]);
    message_block.render(chunks[4], frame.buffer_mut());
    Paragraph::new(Line::from(Span::styled(message, fg_style)))
        .wrap(Wrap { trim: true })
        .render(message_inner, frame.buffer_mut());

    Paragraph::new(vec![
        Line::from(Span::styled("Mouse drag: slide a block", dim_style)),
        Line::from(Span::styled("P pause  R restart  Q quit", dim_style)),
    ])
    .render(chunks[5], frame.buffer_mut());
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup_w = 28u16;
    let popup_h = 5u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P Resume    Q Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );
    p.render(popup, frame.buffer_mut());
}
