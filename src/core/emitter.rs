//! Escape sequence emitter
//!
//! Fire-and-forget output primitives. Every operation formats one fixed
//! sequence and writes it straight through, flushing so it reaches the
//! terminal before anything reads a reply. Counts and positions are passed
//! through unclamped; the terminal clamps them.
//!
//! Counts have no implicit default: pass [`ONE_STEP`] for a single line,
//! column or character. Terminals also read a count of 0 as one step.

use std::io::{self, Write};

use super::term::{CursorStyle, DisplayModes, EscapeSequence, ModeFlags};

/// Count for a single-step move, insert, delete or scroll
pub const ONE_STEP: u16 = 1;

/// Writes escape sequences to a terminal output channel
pub struct Emitter<W: Write> {
    out: W,
    modes: DisplayModes,
    /// Default form for cursor save/restore: `CSI s`/`CSI u` when true, `ESC 7`/`ESC 8` otherwise
    ansi_mode: bool,
}

impl Emitter<io::Stdout> {
    /// Emitter over stdout
    pub fn stdout(ansi_mode: bool) -> Self {
        Self::new(io::stdout(), ansi_mode)
    }
}

impl<W: Write> Emitter<W> {
    pub fn new(out: W, ansi_mode: bool) -> Self {
        Self {
            out,
            modes: DisplayModes::new(),
            ansi_mode,
        }
    }

    /// Last-commanded display modes (not confirmed by the terminal)
    pub fn modes(&self) -> &DisplayModes {
        &self.modes
    }

    pub fn ansi_mode(&self) -> bool {
        self.ansi_mode
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Write and flush raw bytes, reporting channel failures
    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.out.write_all(bytes)?;
        self.out.flush()
    }

    /// Write a sequence; failures are logged and dropped
    pub fn emit(&mut self, seq: &EscapeSequence) -> bool {
        match self.write_bytes(seq.as_bytes()) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to write escape sequence {:?}: {}", seq, e);
                false
            }
        }
    }

    fn emit_mode(&mut self, seq: EscapeSequence, flag: ModeFlags, value: bool) {
        if self.emit(&seq) {
            self.modes.set(flag, value);
        }
    }

    // Cursor movement

    /// Up `rows` lines, same column ([`ONE_STEP`] for one)
    pub fn move_up(&mut self, rows: u16) {
        self.emit(&EscapeSequence::cursor_up(rows));
    }

    /// Down `rows` lines, same column ([`ONE_STEP`] for one)
    pub fn move_down(&mut self, rows: u16) {
        self.emit(&EscapeSequence::cursor_down(rows));
    }

    /// Right `cols` columns ([`ONE_STEP`] for one)
    pub fn move_right(&mut self, cols: u16) {
        self.emit(&EscapeSequence::cursor_forward(cols));
    }

    /// Left `cols` columns ([`ONE_STEP`] for one)
    pub fn move_left(&mut self, cols: u16) {
        self.emit(&EscapeSequence::cursor_backward(cols));
    }

    /// Down `rows` lines, to column 1 ([`ONE_STEP`] for one)
    pub fn move_line_down(&mut self, rows: u16) {
        self.emit(&EscapeSequence::cursor_next_line(rows));
    }

    /// Up `rows` lines, to column 1 ([`ONE_STEP`] for one)
    pub fn move_line_up(&mut self, rows: u16) {
        self.emit(&EscapeSequence::cursor_previous_line(rows));
    }

    pub fn move_to_column(&mut self, col: u16) {
        self.emit(&EscapeSequence::cursor_column(col));
    }

    /// Absolute 1-based position
    pub fn move_to(&mut self, row: u16, col: u16) {
        self.emit(&EscapeSequence::cursor_position(row, col));
    }

    pub fn move_to_home(&mut self) {
        self.emit(&EscapeSequence::cursor_home());
    }

    // Editing

    /// Insert `rows` blank lines at the cursor ([`ONE_STEP`] for one)
    pub fn insert_line(&mut self, rows: u16) {
        self.emit(&EscapeSequence::insert_lines(rows));
    }

    /// Delete `rows` lines at the cursor ([`ONE_STEP`] for one)
    pub fn delete_line(&mut self, rows: u16) {
        self.emit(&EscapeSequence::delete_lines(rows));
    }

    /// Delete `chars` characters at the cursor ([`ONE_STEP`] for one)
    pub fn delete_char(&mut self, chars: u16) {
        self.emit(&EscapeSequence::delete_chars(chars));
    }

    // Clearing

    pub fn clear_below(&mut self) {
        self.emit(&EscapeSequence::erase_in_display(0));
    }

    pub fn clear_above(&mut self) {
        self.emit(&EscapeSequence::erase_in_display(1));
    }

    /// Clear everything and home the cursor
    pub fn clear_screen(&mut self) {
        self.emit(&EscapeSequence::erase_in_display(2).then(EscapeSequence::cursor_home()));
    }

    pub fn clear_to_end_of_line(&mut self) {
        self.emit(&EscapeSequence::erase_in_line(0));
    }

    pub fn clear_to_start_of_line(&mut self) {
        self.emit(&EscapeSequence::erase_in_line(1));
    }

    pub fn clear_line(&mut self) {
        self.emit(&EscapeSequence::erase_in_line(2));
    }

    // Modes

    pub fn enable_replace_mode(&mut self) {
        self.emit_mode(EscapeSequence::replace_mode(), ModeFlags::REPLACING, true);
    }

    pub fn disable_replace_mode(&mut self) {
        self.emit_mode(EscapeSequence::insert_mode(), ModeFlags::REPLACING, false);
    }

    pub fn cursor_on(&mut self) {
        self.emit_mode(EscapeSequence::cursor_visible(true), ModeFlags::CURSOR_VISIBLE, true);
    }

    pub fn cursor_off(&mut self) {
        self.emit_mode(EscapeSequence::cursor_visible(false), ModeFlags::CURSOR_VISIBLE, false);
    }

    pub fn set_cursor_style(&mut self, style: CursorStyle, blinking: bool) {
        self.emit(&EscapeSequence::cursor_style(style, blinking));
    }

    // Save / restore

    /// Save the cursor position; `ansi` overrides the configured form
    pub fn store_cursor_position(&mut self, ansi: Option<bool>) {
        let ansi = ansi.unwrap_or(self.ansi_mode);
        self.emit(&EscapeSequence::save_cursor(ansi));
    }

    /// Restore the cursor position; `ansi` overrides the configured form
    pub fn restore_cursor_position(&mut self, ansi: Option<bool>) {
        let ansi = ansi.unwrap_or(self.ansi_mode);
        self.emit(&EscapeSequence::restore_cursor(ansi));
    }

    /// Save cursor and rendition state (DECSC), independent of `ansi_mode`
    pub fn save_screen(&mut self) {
        self.emit(&EscapeSequence::save_cursor(false));
    }

    pub fn restore_screen(&mut self) {
        self.emit(&EscapeSequence::restore_cursor(false));
    }

    /// Save state, then start from a cleared screen with the cursor at home
    pub fn switch_to_new_screen(&mut self) {
        self.save_screen();
        self.clear_screen();
        self.move_to_home();
    }

    pub fn return_to_original_screen(&mut self) {
        self.restore_screen();
    }

    // Scrolling

    pub fn set_scroll_region(&mut self, top: u16, bottom: u16) {
        self.emit(&EscapeSequence::scroll_region(top, bottom));
    }

    /// Alias of [`set_scroll_region`](Self::set_scroll_region)
    pub fn scroll_region(&mut self, top: u16, bottom: u16) {
        self.set_scroll_region(top, bottom);
    }

    /// Scroll the region up `lines` lines ([`ONE_STEP`] for one)
    pub fn scroll_up(&mut self, lines: u16) {
        self.emit(&EscapeSequence::scroll_up(lines));
    }

    /// Scroll the region down `lines` lines ([`ONE_STEP`] for one)
    pub fn scroll_down(&mut self, lines: u16) {
        self.emit(&EscapeSequence::scroll_down(lines));
    }

    // Screen buffers

    pub fn enter_alternative_screen(&mut self) {
        self.emit(&EscapeSequence::enter_alternate_screen());
    }

    pub fn exit_alternative_screen(&mut self) {
        self.emit(&EscapeSequence::exit_alternate_screen());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn emitted(ansi_mode: bool, f: impl FnOnce(&mut Emitter<Vec<u8>>)) -> String {
        let mut emitter = Emitter::new(Vec::new(), ansi_mode);
        f(&mut emitter);
        String::from_utf8(emitter.into_inner()).unwrap()
    }

    /// Accepts nothing once `budget` bytes have been written
    struct FullSink {
        budget: usize,
    }

    impl Write for FullSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.budget == 0 {
                return Err(io::Error::new(io::ErrorKind::WriteZero, "sink full"));
            }
            let n = buf.len().min(self.budget);
            self.budget -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_movement() {
        assert_eq!(emitted(true, |e| e.move_up(1)), "\x1b[1A");
        assert_eq!(emitted(true, |e| e.move_down(4)), "\x1b[4B");
        assert_eq!(emitted(true, |e| e.move_right(2)), "\x1b[2C");
        assert_eq!(emitted(true, |e| e.move_left(7)), "\x1b[7D");
        assert_eq!(emitted(true, |e| e.move_line_down(1)), "\x1b[1E");
        assert_eq!(emitted(true, |e| e.move_line_up(3)), "\x1b[3F");
        assert_eq!(emitted(true, |e| e.move_to_column(40)), "\x1b[40G");
        assert_eq!(emitted(true, |e| e.move_to(12, 4)), "\x1b[12;4H");
        assert_eq!(emitted(true, |e| e.move_to_home()), "\x1b[H");
    }

    #[test]
    fn test_one_step_counts() {
        let out = emitted(true, |e| {
            e.move_up(ONE_STEP);
            e.move_down(ONE_STEP);
            e.move_right(ONE_STEP);
            e.move_left(ONE_STEP);
            e.move_line_down(ONE_STEP);
            e.move_line_up(ONE_STEP);
            e.insert_line(ONE_STEP);
            e.delete_line(ONE_STEP);
            e.delete_char(ONE_STEP);
            e.scroll_up(ONE_STEP);
            e.scroll_down(ONE_STEP);
        });
        assert_eq!(
            out,
            "\x1b[1A\x1b[1B\x1b[1C\x1b[1D\x1b[1E\x1b[1F\x1b[1L\x1b[1M\x1b[1P\x1b[1S\x1b[1T"
        );
    }

    #[test]
    fn test_values_pass_through_unclamped() {
        assert_eq!(emitted(true, |e| e.move_to(9999, 0)), "\x1b[9999;0H");
    }

    #[test]
    fn test_editing_and_clearing() {
        assert_eq!(emitted(true, |e| e.insert_line(2)), "\x1b[2L");
        assert_eq!(emitted(true, |e| e.delete_line(1)), "\x1b[1M");
        assert_eq!(emitted(true, |e| e.delete_char(3)), "\x1b[3P");
        assert_eq!(emitted(true, |e| e.clear_below()), "\x1b[0J");
        assert_eq!(emitted(true, |e| e.clear_above()), "\x1b[1J");
        assert_eq!(emitted(true, |e| e.clear_screen()), "\x1b[2J\x1b[H");
        assert_eq!(emitted(true, |e| e.clear_to_end_of_line()), "\x1b[0K");
        assert_eq!(emitted(true, |e| e.clear_to_start_of_line()), "\x1b[1K");
        assert_eq!(emitted(true, |e| e.clear_line()), "\x1b[2K");
    }

    #[test]
    fn test_scrolling_and_buffers() {
        assert_eq!(emitted(true, |e| e.set_scroll_region(2, 20)), "\x1b[2;20r");
        assert_eq!(emitted(true, |e| e.scroll_region(1, 5)), "\x1b[1;5r");
        assert_eq!(emitted(true, |e| e.scroll_up(1)), "\x1b[1S");
        assert_eq!(emitted(true, |e| e.scroll_down(3)), "\x1b[3T");
        assert_eq!(emitted(true, |e| e.enter_alternative_screen()), "\x1b[?1049h\x1b[H");
        assert_eq!(emitted(true, |e| e.exit_alternative_screen()), "\x1b[?1049l");
        assert_eq!(
            emitted(true, |e| e.switch_to_new_screen()),
            "\x1b7\x1b[2J\x1b[H\x1b[H"
        );
        assert_eq!(emitted(true, |e| e.return_to_original_screen()), "\x1b8");
    }

    #[test]
    fn test_cursor_style() {
        assert_eq!(emitted(true, |e| e.set_cursor_style(CursorStyle::Bar, false)), "\x1b[6 q");
        assert_eq!(emitted(true, |e| e.set_cursor_style(CursorStyle::Block, true)), "\x1b[1 q");
        assert_eq!(emitted(true, |e| e.set_cursor_style(CursorStyle::Line, true)), "\x1b[3 q");
    }

    #[test]
    fn test_store_restore_follow_ansi_mode() {
        assert_eq!(emitted(true, |e| e.store_cursor_position(None)), "\x1b[s");
        assert_eq!(emitted(true, |e| e.restore_cursor_position(None)), "\x1b[u");
        assert_eq!(emitted(false, |e| e.store_cursor_position(None)), "\x1b7");
        assert_eq!(emitted(false, |e| e.restore_cursor_position(None)), "\x1b8");
    }

    #[test]
    fn test_store_restore_override() {
        assert_eq!(emitted(false, |e| e.store_cursor_position(Some(true))), "\x1b[s");
        assert_eq!(emitted(true, |e| e.restore_cursor_position(Some(false))), "\x1b8");
    }

    #[test]
    fn test_mode_toggles_track_last_command() {
        let mut emitter = Emitter::new(Vec::new(), true);
        assert!(!emitter.modes().is_replacing_mode());
        assert!(emitter.modes().is_cursor_visible());

        emitter.enable_replace_mode();
        emitter.cursor_off();
        assert!(emitter.modes().is_replacing_mode());
        assert!(!emitter.modes().is_cursor_visible());

        emitter.disable_replace_mode();
        emitter.cursor_on();
        emitter.cursor_off();
        assert!(!emitter.modes().is_replacing_mode());
        assert!(!emitter.modes().is_cursor_visible());

        assert_eq!(
            String::from_utf8(emitter.into_inner()).unwrap(),
            "\x1b[4l\x1b[?25l\x1b[4h\x1b[?25h\x1b[?25l"
        );
    }

    #[test]
    fn test_failed_write_is_swallowed_and_keeps_flags() {
        let mut emitter = Emitter::new(FullSink { budget: 0 }, true);
        emitter.move_up(1);
        emitter.cursor_off();
        assert!(emitter.modes().is_cursor_visible());
        assert!(!emitter.emit(&EscapeSequence::cursor_home()));
    }

    #[test]
    fn test_partial_write_reports_failure() {
        // write_all keeps going until the sink runs dry mid-sequence
        let mut emitter = Emitter::new(FullSink { budget: 3 }, true);
        assert!(!emitter.emit(&EscapeSequence::cursor_position(10, 10)));
    }
}
