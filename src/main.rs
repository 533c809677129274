//! ansiscreen - show what the attached terminal reports
//!
//! Puts the terminal in raw mode, asks it for the cursor position and the
//! screen size, and prints the answers next to the size the OS reports.
//!
//! # Quick Start
//!
//! ```text
//! ansiscreen          # Query and print
//! ansiscreen --alt    # Also draw a frame on the alternate screen
//! ```

use std::env;
use std::io::Write;
use std::ops::{Deref, DerefMut};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use crossterm::terminal;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use ansiscreen::core::term::UNKNOWN;
use ansiscreen::{
    Config, CursorPosition, CursorStyle, ScreenDimensions, StdioInput, TermInput, Terminal,
    TerminalSize,
};

/// Command line options
#[derive(Debug, Default)]
struct Options {
    /// Draw a frame on the alternate screen after querying
    alt_screen: bool,
    /// Milliseconds to keep the frame up
    hold_ms: u64,
}

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    eprintln!("ansiscreen {}", VERSION);
}

fn print_help() {
    eprintln!("ansiscreen {} - Query cursor position and screen size over ANSI", VERSION);
    eprintln!();
    eprintln!("Usage: ansiscreen [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -a, --alt             Draw a frame on the alternate screen");
    eprintln!("      --hold <MS>       How long to show the frame (default 1500)");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Configuration: ~/.ansiscreen/config.toml");
    eprintln!("Log file:      ~/.ansiscreen/ansiscreen.log (level via ANSISCREEN_LOG)");
}

/// Parse command line arguments
fn parse_args() -> Result<Option<Options>, String> {
    let mut options = Options {
        hold_ms: 1500,
        ..Options::default()
    };
    let mut args = env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-a" | "--alt" => options.alt_screen = true,
            "--hold" => {
                let value = args.next().ok_or("--hold requires a value")?;
                options.hold_ms = value
                    .parse()
                    .map_err(|_| format!("Invalid --hold value: {}", value))?;
            }
            "-v" | "--version" => {
                print_version();
                return Ok(None);
            }
            "-h" | "--help" => {
                print_help();
                return Ok(None);
            }
            other => return Err(format!("Unknown option: {}", other)),
        }
    }

    Ok(Some(options))
}

/// Log to ~/.ansiscreen/ansiscreen.log; stdout carries the terminal protocol
fn init_logging() {
    let log_path = Config::config_dir()
        .map(|dir| dir.join("ansiscreen.log"))
        .unwrap_or_else(|| std::path::PathBuf::from("ansiscreen.log"));

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_from_env("ANSISCREEN_LOG")
            .unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

/// Leaves raw mode when dropped, including on early return
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> anyhow::Result<Self> {
        terminal::enable_raw_mode().context("Failed to enable raw mode")?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            warn!("Failed to disable raw mode: {}", e);
        }
    }
}

/// What the terminal reported
struct Report {
    cursor: (i32, i32),
    screen: (i32, i32),
    size: TerminalSize,
    os_size: Option<(u16, u16)>,
}

fn main() -> anyhow::Result<()> {
    let options = match parse_args() {
        Ok(Some(options)) => options,
        Ok(None) => return Ok(()),
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    init_logging();
    info!("ansiscreen starting...");

    let config = Config::load();
    let mut term = Terminal::stdio(&config);
    info!("Query options: {:?}", term.options());
    info!("ANSI save/restore: {}", term.ansi_mode());

    let report = run_queries(&mut term, &options)?;
    print_report(&report);

    info!("ansiscreen done");
    Ok(())
}

fn run_queries(
    term: &mut Terminal<std::io::Stdout, StdioInput>,
    options: &Options,
) -> anyhow::Result<Report> {
    // Raw mode is only possible (and only needed) on an interactive terminal
    let _raw = if term.input().is_terminal() {
        Some(RawModeGuard::enable()?)
    } else {
        warn!("stdin is not a terminal; queries will report no reply");
        None
    };

    let cursor = term.read_cursor_position();
    let screen = term.read_screen_size();
    let size = TerminalSize::from_pair(ScreenDimensions::sentinel_pair(&screen));
    let os_size = terminal::size().ok().map(|(cols, rows)| (rows, cols));

    info!("Cursor report: {:?}", cursor);
    info!("Screen report: {:?}", screen);

    if options.alt_screen && term.input().is_terminal() {
        let frame = match os_size {
            Some((rows, cols)) => TerminalSize { rows, cols },
            None => size,
        };
        draw_frame(term, frame, Duration::from_millis(options.hold_ms))?;
    }

    Ok(Report {
        cursor: CursorPosition::sentinel_pair(&cursor),
        screen: ScreenDimensions::sentinel_pair(&screen),
        size,
        os_size,
    })
}

/// Alternate screen with a hidden cursor; the original screen and a
/// visible block cursor come back when dropped, including on early return
struct AltScreen<'a, W: Write, R: TermInput> {
    term: &'a mut Terminal<W, R>,
}

impl<'a, W: Write, R: TermInput> AltScreen<'a, W, R> {
    fn enter(term: &'a mut Terminal<W, R>) -> Self {
        term.enter_alternative_screen();
        term.cursor_off();
        term.set_cursor_style(CursorStyle::Bar, false);
        Self { term }
    }
}

impl<W: Write, R: TermInput> Deref for AltScreen<'_, W, R> {
    type Target = Terminal<W, R>;

    fn deref(&self) -> &Self::Target {
        self.term
    }
}

impl<W: Write, R: TermInput> DerefMut for AltScreen<'_, W, R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.term
    }
}

impl<W: Write, R: TermInput> Drop for AltScreen<'_, W, R> {
    fn drop(&mut self) {
        self.term.set_cursor_style(CursorStyle::Block, true);
        self.term.cursor_on();
        self.term.exit_alternative_screen();
    }
}

fn draw_frame<W: Write, R: TermInput>(
    term: &mut Terminal<W, R>,
    size: TerminalSize,
    hold: Duration,
) -> anyhow::Result<()> {
    let TerminalSize { rows, cols } = size;
    if rows < 3 || cols < 3 {
        warn!("Terminal too small for a frame: {}x{}", cols, rows);
        return Ok(());
    }

    let mut term = AltScreen::enter(term);
    term.clear_screen();

    let horizontal = "-".repeat(usize::from(cols - 2));
    term.move_to(1, 1);
    write!(term.get_mut(), "+{}+", horizontal)?;
    for row in 2..rows {
        term.move_to(row, 1);
        write!(term.get_mut(), "|")?;
        term.move_to_column(cols);
        write!(term.get_mut(), "|")?;
    }
    term.move_to(rows, 1);
    write!(term.get_mut(), "+{}+", horizontal)?;

    term.move_to(rows / 2, 3);
    write!(term.get_mut(), "{} x {}", cols, rows)?;
    term.store_cursor_position(None);
    let reported = term.read_cursor_position();
    term.restore_cursor_position(None);
    let (row, col) = CursorPosition::sentinel_pair(&reported);
    write!(term.get_mut(), "  (cursor reported at {};{})", row, col)?;
    term.get_mut().flush()?;

    thread::sleep(hold);
    Ok(())
}

fn print_report(report: &Report) {
    let show = |(a, b): (i32, i32), sep: &str| {
        if a == UNKNOWN || b == UNKNOWN {
            "unknown".to_string()
        } else {
            format!("{}{}{}", a, sep, b)
        }
    };

    println!("Cursor position:  {}", show(report.cursor, ";"));
    println!("Reported size:    {}", show(report.screen, "x"));
    println!("Effective size:   {}x{}", report.size.rows, report.size.cols);
    match report.os_size {
        Some((rows, cols)) => println!("OS window size:   {}x{}", rows, cols),
        None => println!("OS window size:   unknown"),
    }
}
