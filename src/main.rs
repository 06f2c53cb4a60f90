//! Slidetui: sliding-block puzzle in the terminal. Drag blocks sideways with the mouse;
//! gravity pulls them down one row per tick and full rows clear.

mod app;
mod input;
mod theme;
mod ui;

use anyhow::{Context, Result, anyhow};
use app::App;
use clap::{Parser, ValueEnum};
use slidetui::grid::BlockSpec;
use slidetui::{Difficulty, GameConfig, seed};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|error| {
        warn!(%error, "theme not loaded; using One Dark");
        theme::Theme::default()
    });
    let config = GameConfig {
        tick_ms: args.tick_ms,
        cell_size: f64::from(ui::CELL_WIDTH),
        drag_timeout_ms: args.drag_timeout_ms.unwrap_or(0),
        submit_timeout_ms: args.submit_timeout_ms.unwrap_or(0),
        resync_on_failure: !args.no_resync,
    };
    let specs = load_board(&args)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    if args.headless {
        return runtime.block_on(run_headless(&args, &config, &specs));
    }
    let mut app = App::new(args, config, theme, specs, runtime.handle().clone())?;
    app.run()?;
    Ok(())
}

/// Sliding-block puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "slidetui",
    version,
    about = "Sliding-block puzzle in the terminal. Slide blocks along their row; full rows clear.",
    long_about = "Slidetui is a terminal sliding-block puzzle on an 8x10 grid.\n\n\
        Drag a block left or right with the mouse. Blocks cannot pass through each other. \
        Once the board settles, every row filled edge-to-edge is cleared and the blocks above \
        fall into the gap.\n\n\
        CONTROLS:\n  Mouse drag  Slide a block   P / Space  Pause   R  Restart   Q / Esc  Quit\n\n\
        With --account, committed slides are sent to the move authority; a rejected move \
        resyncs the board from it. Use --theme to load a btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// Difficulty: shapes the generated layout (more rows, fewer gaps at higher levels).
    #[arg(short, long, default_value = "easy")]
    pub difficulty: Difficulty,

    /// Seed for the generated layout. Same seed and difficulty give the same board.
    #[arg(short, long, default_value = "1", value_name = "N")]
    pub seed: u32,

    /// Load the starting board from a JSON list of {"id","x","y","width"} blocks instead of generating one.
    #[arg(short, long, value_name = "FILE")]
    pub board: Option<PathBuf>,

    /// Account moves are submitted as. Without it the game runs offline and nothing is submitted.
    #[arg(short, long, value_name = "NAME")]
    pub account: Option<String>,

    /// Gravity period in ms (one row per tick).
    #[arg(long, default_value_t = slidetui::DEFAULT_TICK_MS, value_name = "MS")]
    pub tick_ms: u64,

    /// End a drag that has seen no pointer input for this long.
    #[arg(long, value_name = "MS")]
    pub drag_timeout_ms: Option<u64>,

    /// Treat a submission as failed when the authority has not answered within this long.
    #[arg(long, value_name = "MS")]
    pub submit_timeout_ms: Option<u64>,

    /// Simulated round trip of the local move authority.
    #[arg(long, default_value = "150", value_name = "MS")]
    pub authority_latency_ms: u64,

    /// Keep the local board after a failed submission instead of resyncing from the authority.
    #[arg(long)]
    pub no_resync: bool,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Write logs to this file (the terminal UI owns the screen). RUST_LOG overrides the level.
    #[arg(long, value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Run without a terminal UI: simulate --ticks ticks and print the board.
    #[arg(long)]
    pub headless: bool,

    /// Ticks to simulate in headless mode.
    #[arg(long, default_value = "20", value_name = "N")]
    pub ticks: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}

/// Logs go to `--log` when given, to stderr in headless mode, and nowhere otherwise.
fn init_logging(args: &Args) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("slidetui=info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match (&args.log, args.headless) {
        (Some(path), _) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("cannot create log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .try_init()
        }
        (None, true) => builder.with_writer(std::io::stderr).try_init(),
        (None, false) => return Ok(()),
    };
    installed.map_err(|e| anyhow!("failed to install log subscriber: {e}"))
}

fn load_board(args: &Args) -> Result<Vec<BlockSpec>> {
    let Some(path) = &args.board else {
        let specs = seed::generate(args.difficulty, args.seed);
        info!(difficulty = ?args.difficulty, seed = args.seed, blocks = specs.len(), "generated layout");
        return Ok(specs);
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read board file {}", path.display()))?;
    let specs: Vec<BlockSpec> = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a JSON list of blocks", path.display()))?;
    info!(path = %path.display(), blocks = specs.len(), "loaded board");
    Ok(specs)
}

async fn run_headless(args: &Args, config: &GameConfig, specs: &[BlockSpec]) -> Result<()> {
    let mut session =
        app::build_session(specs, config, args, tokio::runtime::Handle::current())?;
    for _ in 0..args.ticks {
        tokio::time::sleep(config.tick_interval()).await;
        session.tick(std::time::Instant::now());
    }
    let stats = session.stats();
    println!("{}", session.board().occupancy());
    println!(
        "ticks: {}  blocks: {}  rows cleared: {}  {}",
        stats.ticks,
        session.board().len(),
        stats.rows_cleared,
        if session.is_stable() { "stable" } else { "moving" }
    );
    Ok(())
}
