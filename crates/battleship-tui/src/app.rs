use crate::settings::Settings;
use crate::theme::{Theme, ThemeName};
use battleship_core::{
    import, Cell, Position, Puzzle, SolveReport, SolveStatus, Supervisor, MAX_SIZE, MIN_SIZE,
};
use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use log::{info, warn};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Width of one board cell on screen, in columns
pub const CELL_WIDTH: u16 = 3;

/// Result of handling a key press
pub enum AppAction {
    Continue,
    Quit,
}

/// Current screen state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenState {
    /// Editing the puzzle
    Editing,
    /// Browsing the solutions of the last solve
    Solutions,
    /// Last engine input and output
    EngineLog,
    /// Key reference
    Help,
}

/// Where the board was last drawn, for mapping mouse clicks back to cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardLayout {
    pub origin_x: u16,
    pub origin_y: u16,
    /// First visible row and column
    pub offset: Position,
    pub visible_rows: usize,
    pub visible_cols: usize,
}

impl BoardLayout {
    pub fn cell_at(&self, x: u16, y: u16) -> Option<Position> {
        if x < self.origin_x || y < self.origin_y {
            return None;
        }
        let col = ((x - self.origin_x) / CELL_WIDTH) as usize;
        let row = (y - self.origin_y) as usize;
        if row >= self.visible_rows || col >= self.visible_cols {
            return None;
        }
        Some(Position::new(self.offset.row + row, self.offset.col + col))
    }
}

/// The main application state
pub struct App {
    /// Puzzle being edited
    pub puzzle: Puzzle,
    /// Currently selected cell position
    pub cursor: Position,
    /// Engine runner; owns the published solutions
    pub supervisor: Supervisor,
    /// Color theme
    pub theme: Theme,
    pub settings: Settings,
    /// Message to display
    pub message: Option<String>,
    /// Message timer
    message_timer: u32,
    /// Outcome of the last solve, shown in the info panel
    pub status: String,
    /// Current screen state
    pub screen_state: ScreenState,
    /// File re-read by the import key
    pub import_path: Option<PathBuf>,
    /// Scroll offset for the engine log view
    pub log_scroll: usize,
    /// Set by the renderer
    pub layout: Option<BoardLayout>,
}

impl App {
    pub fn new(settings: Settings, import_path: Option<PathBuf>) -> Self {
        let mut app = Self {
            puzzle: Puzzle::new(settings.size, settings.max_ship_len),
            cursor: Position::default(),
            supervisor: Supervisor::new(settings.engine_config()),
            theme: Theme::from_name(settings.theme),
            settings,
            message: None,
            message_timer: 0,
            status: "Ready".to_string(),
            screen_state: ScreenState::Editing,
            import_path,
            log_scroll: 0,
            layout: None,
        };
        if app.import_path.is_some() {
            app.import_from_file();
        }
        app
    }

    /// Get the tick rate
    pub fn get_tick_rate(&self) -> Duration {
        if self.supervisor.is_running() {
            Duration::from_millis(50)
        } else {
            Duration::from_millis(100)
        }
    }

    /// Update timers and pick up finished solves (called every tick)
    pub fn tick(&mut self) {
        if self.message_timer > 0 {
            self.message_timer -= 1;
            if self.message_timer == 0 {
                self.message = None;
            }
        }

        if let Some(report) = self.supervisor.poll() {
            self.apply_report(report);
        }
    }

    pub fn apply_report(&mut self, report: SolveReport) {
        let status = report.status.to_string();
        self.show_message(&status);
        self.status = status;
        match report.status {
            SolveStatus::Solved(_) => {
                if self.screen_state == ScreenState::Editing {
                    self.screen_state = ScreenState::Solutions;
                }
            }
            SolveStatus::Failed(_) => {
                warn!("solve {} failed", report.id);
            }
            SolveStatus::NoSolution | SolveStatus::Cancelled { .. } => {}
        }
    }

    /// Show a temporary message
    pub fn show_message(&mut self, msg: &str) {
        self.message = Some(msg.to_string());
        self.message_timer = 30; // ~3 seconds at 100ms poll
    }

    /// Handle a key press
    pub fn handle_key(&mut self, key: KeyEvent) -> AppAction {
        match self.screen_state {
            ScreenState::Editing => self.handle_edit_key(key),
            ScreenState::Solutions => self.handle_solutions_key(key),
            ScreenState::EngineLog => self.handle_log_key(key),
            ScreenState::Help => {
                self.screen_state = ScreenState::Editing;
                AppAction::Continue
            }
        }
    }

    /// Left click toggles, right click cycles
    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        if self.screen_state != ScreenState::Editing {
            return;
        }
        let Some(pos) = self.layout.and_then(|l| l.cell_at(mouse.column, mouse.row)) else {
            return;
        };
        if pos.row >= self.puzzle.size() || pos.col >= self.puzzle.size() {
            return;
        }
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.cursor = pos;
                self.puzzle.toggle(pos);
            }
            MouseEventKind::Down(MouseButton::Right) => {
                self.cursor = pos;
                self.puzzle.cycle(pos);
            }
            _ => {}
        }
    }

    fn handle_edit_key(&mut self, key: KeyEvent) -> AppAction {
        match key.code {
            KeyCode::Char('q') => return AppAction::Quit,

            // Navigation
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1, 0),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1, 0),
            KeyCode::Left | KeyCode::Char('h') => self.move_cursor(0, -1),
            KeyCode::Right | KeyCode::Char('l') => self.move_cursor(0, 1),

            KeyCode::Char(' ') => {
                self.puzzle.toggle(self.cursor);
            }
            KeyCode::Enter => {
                self.puzzle.cycle(self.cursor);
            }
            KeyCode::Delete | KeyCode::Backspace => {
                self.puzzle.set_cell(self.cursor, Cell::Unknown);
            }

            // Targets
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.puzzle.adjust_row_target(self.cursor.row, 1);
            }
            KeyCode::Char('-') => {
                self.puzzle.adjust_row_target(self.cursor.row, -1);
            }
            KeyCode::Char(']') => {
                self.puzzle.adjust_col_target(self.cursor.col, 1);
            }
            KeyCode::Char('[') => {
                self.puzzle.adjust_col_target(self.cursor.col, -1);
            }
            KeyCode::Char('t') => {
                self.puzzle.recalculate_targets();
                self.show_message("Targets recalculated from ships");
            }

            // Board shape
            KeyCode::Char('>') => self.resize(1),
            KeyCode::Char('<') => self.resize(-1),
            KeyCode::Char('M') => {
                let k = self.puzzle.max_ship_len().saturating_add(1);
                self.puzzle.set_max_ship_len(k);
            }
            KeyCode::Char('m') => {
                let k = self.puzzle.max_ship_len().saturating_sub(1);
                self.puzzle.set_max_ship_len(k);
            }

            // Engine
            KeyCode::Char('x') => self.start_solve(),
            KeyCode::Char('c') | KeyCode::Esc => self.cancel_solve(),
            KeyCode::Char('v') => {
                self.screen_state = ScreenState::Solutions;
            }
            KeyCode::Char('L') => self.open_log(),
            KeyCode::Char('I') => self.import_from_file(),

            KeyCode::Char('T') => self.cycle_theme(),
            KeyCode::Char('?') => {
                self.screen_state = ScreenState::Help;
            }

            KeyCode::Char(c) => {
                if let Some(cell) = Cell::from_key(c) {
                    self.puzzle.set_cell(self.cursor, cell);
                }
            }
            _ => {}
        }
        AppAction::Continue
    }

    fn handle_solutions_key(&mut self, key: KeyEvent) -> AppAction {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc | KeyCode::Char('v') => {
                self.screen_state = ScreenState::Editing;
            }
            KeyCode::Char('n') | KeyCode::Right | KeyCode::Down => {
                self.supervisor.solutions_mut().next();
            }
            KeyCode::Char('p') | KeyCode::Left | KeyCode::Up => {
                self.supervisor.solutions_mut().prev();
            }
            KeyCode::Char('c') => self.cancel_solve(),
            KeyCode::Char('L') => self.open_log(),
            _ => {}
        }
        AppAction::Continue
    }

    fn handle_log_key(&mut self, key: KeyEvent) -> AppAction {
        let max = self.engine_log_lines().len().saturating_sub(1);
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc | KeyCode::Char('L') => {
                self.screen_state = ScreenState::Editing;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.log_scroll = self.log_scroll.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.log_scroll = (self.log_scroll + 1).min(max);
            }
            KeyCode::PageUp => {
                self.log_scroll = self.log_scroll.saturating_sub(20);
            }
            KeyCode::PageDown => {
                self.log_scroll = (self.log_scroll + 20).min(max);
            }
            KeyCode::Home => self.log_scroll = 0,
            _ => {}
        }
        AppAction::Continue
    }

    fn move_cursor(&mut self, row_delta: i32, col_delta: i32) {
        let last = self.puzzle.size() as i32 - 1;
        let new_row = (self.cursor.row as i32 + row_delta).clamp(0, last) as usize;
        let new_col = (self.cursor.col as i32 + col_delta).clamp(0, last) as usize;
        self.cursor = Position::new(new_row, new_col);
    }

    fn resize(&mut self, delta: i32) {
        let size = self.puzzle.size() as i32 + delta;
        if !(MIN_SIZE as i32..=MAX_SIZE as i32).contains(&size) {
            self.show_message(&format!("Board size must be {}-{}", MIN_SIZE, MAX_SIZE));
            return;
        }
        self.puzzle.resize(size as usize);
        self.move_cursor(0, 0);
    }

    fn start_solve(&mut self) {
        match self.supervisor.start_solve(&self.puzzle) {
            Ok(id) => {
                self.status = format!("Solving {}...", id);
                self.show_message("Solving...");
            }
            Err(err) => self.show_message(&format!("Cannot solve: {}", err)),
        }
    }

    fn cancel_solve(&mut self) {
        if self.supervisor.cancel() {
            self.status = "Cancelling...".to_string();
        }
    }

    fn open_log(&mut self) {
        self.log_scroll = 0;
        self.screen_state = ScreenState::EngineLog;
    }

    fn cycle_theme(&mut self) {
        let name: ThemeName = self.settings.theme.next();
        self.settings.theme = name;
        self.theme = Theme::from_name(name);
        match self.settings.save() {
            Ok(()) => self.show_message(&format!("Theme: {}", name)),
            Err(err) => {
                warn!("could not save settings: {}", err);
                self.show_message(&format!("Theme: {} (not saved)", name));
            }
        }
    }

    /// Replace the puzzle with the contents of the import file.
    ///
    /// The live puzzle is untouched unless the whole file validates.
    pub fn import_from_file(&mut self) {
        let Some(path) = self.import_path.clone() else {
            self.show_message("No import file (start with --import FILE)");
            return;
        };
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) => {
                warn!("cannot read {}: {}", path.display(), err);
                self.show_message(&format!("Cannot read {}: {}", path.display(), err));
                return;
            }
        };
        match import(&text) {
            Ok(puzzle) => {
                info!(
                    "imported {}x{} puzzle from {}",
                    puzzle.size(),
                    puzzle.size(),
                    path.display()
                );
                self.puzzle = puzzle;
                self.move_cursor(0, 0);
                self.show_message(&format!("Imported {}", path.display()));
            }
            Err(err) => {
                warn!("import of {} failed: {}", path.display(), err);
                self.show_message(&format!("Import failed: {}", err));
            }
        }
    }

    /// Text of the engine log screen
    pub fn engine_log_lines(&self) -> Vec<String> {
        let Some(transcript) = self.supervisor.last_transcript() else {
            return vec!["No engine run yet".to_string()];
        };
        let mut lines = vec!["-- Input --".to_string()];
        lines.extend(transcript.input.lines().map(str::to_string));
        lines.push(String::new());
        lines.push(match transcript.exit_code {
            Some(code) => format!("-- Output (exit code {}) --", code),
            None => "-- Output (no exit code) --".to_string(),
        });
        lines.extend(transcript.stdout.lines().map(str::to_string));
        if !transcript.stderr.is_empty() {
            lines.push(String::new());
            lines.push("-- Errors --".to_string());
            lines.extend(transcript.stderr.lines().map(str::to_string));
        }
        lines
    }

    /// Same row or column as the cursor
    pub fn is_highlighted(&self, pos: Position) -> bool {
        pos.row == self.cursor.row || pos.col == self.cursor.col
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn press(app: &mut App, keys: &str) {
        for c in keys.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
    }

    fn test_app() -> App {
        let settings = Settings {
            size: 4,
            ..Settings::default()
        };
        App::new(settings, None)
    }

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path =
            std::env::temp_dir().join(format!("battleship-app-{}-{}", std::process::id(), name));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_edit_keys() {
        let mut app = test_app();
        app.handle_key(key(KeyCode::Char(' ')));
        assert_eq!(app.puzzle.cell(Position::new(0, 0)), Cell::Water);
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.puzzle.cell(Position::new(0, 0)), Cell::ShipBody);

        app.handle_key(key(KeyCode::Right));
        press(&mut app, "4");
        assert_eq!(app.puzzle.cell(Position::new(0, 1)), Cell::ShipLeft);
        press(&mut app, "s");
        assert_eq!(app.puzzle.cell(Position::new(0, 1)), Cell::ShipSingle);
        app.handle_key(key(KeyCode::Backspace));
        assert_eq!(app.puzzle.cell(Position::new(0, 1)), Cell::Unknown);
    }

    #[test]
    fn test_cursor_stays_on_board() {
        let mut app = test_app();
        for _ in 0..10 {
            app.handle_key(key(KeyCode::Down));
            app.handle_key(key(KeyCode::Left));
        }
        assert_eq!(app.cursor, Position::new(3, 0));
    }

    #[test]
    fn test_target_keys() {
        let mut app = test_app();
        press(&mut app, "++-");
        press(&mut app, "]]]");
        assert_eq!(app.puzzle.row_target(0), 1);
        assert_eq!(app.puzzle.col_target(0), 3);
        press(&mut app, "--");
        assert_eq!(app.puzzle.row_target(0), 0);

        press(&mut app, "1");
        app.handle_key(key(KeyCode::Down));
        press(&mut app, "2t");
        assert_eq!(app.puzzle.row_targets(), &[1, 1, 0, 0]);
        assert_eq!(app.puzzle.col_targets(), &[2, 0, 0, 0]);
    }

    #[test]
    fn test_resize_and_max_ship_keys() {
        let mut app = test_app();
        for _ in 0..3 {
            app.handle_key(key(KeyCode::Down));
            app.handle_key(key(KeyCode::Right));
        }
        press(&mut app, "<");
        assert_eq!(app.puzzle.size(), 3);
        assert_eq!(app.cursor, Position::new(2, 2));

        press(&mut app, "<<");
        assert_eq!(app.puzzle.size(), MIN_SIZE);
        assert!(app.message.as_deref().unwrap().contains("Board size"));

        press(&mut app, ">");
        assert_eq!(app.puzzle.size(), 3);

        press(&mut app, "mmmmmm");
        assert_eq!(app.puzzle.max_ship_len(), 1);
        press(&mut app, "MM");
        assert_eq!(app.puzzle.max_ship_len(), 3);
    }

    #[test]
    fn test_mouse_toggles_and_cycles() {
        let mut app = test_app();
        app.layout = Some(BoardLayout {
            origin_x: 10,
            origin_y: 5,
            offset: Position::new(0, 0),
            visible_rows: 4,
            visible_cols: 4,
        });
        let click = |kind, column, row| MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        };

        app.handle_mouse(click(MouseEventKind::Down(MouseButton::Left), 10 + 3 * 2 + 1, 6));
        assert_eq!(app.cursor, Position::new(1, 2));
        assert_eq!(app.puzzle.cell(Position::new(1, 2)), Cell::Water);

        app.handle_mouse(click(MouseEventKind::Down(MouseButton::Right), 10, 5));
        assert_eq!(app.puzzle.cell(Position::new(0, 0)), Cell::ShipBody);

        // outside the board
        app.handle_mouse(click(MouseEventKind::Down(MouseButton::Left), 9, 5));
        app.handle_mouse(click(MouseEventKind::Down(MouseButton::Left), 10, 9));
        assert_eq!(app.cursor, Position::new(0, 0));
    }

    #[test]
    fn test_board_layout_with_offset() {
        let layout = BoardLayout {
            origin_x: 4,
            origin_y: 2,
            offset: Position::new(10, 20),
            visible_rows: 5,
            visible_cols: 5,
        };
        assert_eq!(layout.cell_at(4, 2), Some(Position::new(10, 20)));
        assert_eq!(layout.cell_at(6, 3), Some(Position::new(11, 20)));
        assert_eq!(layout.cell_at(7, 3), Some(Position::new(11, 21)));
        assert_eq!(layout.cell_at(4 + 15, 2), None);
    }

    #[test]
    fn test_import_success() {
        let path = temp_file("good.txt", "3\n-1 1 0\n1 1 0\n0 -1 0\n");
        let mut app = test_app();
        app.import_path = Some(path.clone());
        press(&mut app, "I");
        let _ = fs::remove_file(&path);

        assert_eq!(app.puzzle.size(), 2);
        assert_eq!(app.puzzle.max_ship_len(), 3);
        assert_eq!(app.puzzle.cell(Position::new(0, 0)), Cell::ShipBody);
        assert!(app.message.as_deref().unwrap().starts_with("Imported"));
    }

    #[test]
    fn test_import_failure_leaves_puzzle() {
        let path = temp_file("bad.txt", "3\n-1 1 0\n1 1 9\n0 -1 0\n");
        let mut app = test_app();
        press(&mut app, "2");
        let before = app.puzzle.clone();

        app.import_path = Some(path.clone());
        press(&mut app, "I");
        let _ = fs::remove_file(&path);

        assert_eq!(app.puzzle, before);
        let message = app.message.clone().unwrap();
        assert!(message.starts_with("Import failed"));
        assert!(message.contains("line 3"));
    }

    #[test]
    fn test_import_without_file() {
        let mut app = test_app();
        press(&mut app, "I");
        assert!(app.message.as_deref().unwrap().contains("--import"));
    }

    #[test]
    fn test_engine_log_before_any_run() {
        let app = test_app();
        assert_eq!(app.engine_log_lines(), vec!["No engine run yet".to_string()]);
    }

    #[test]
    fn test_help_returns_to_editing() {
        let mut app = test_app();
        press(&mut app, "?");
        assert_eq!(app.screen_state, ScreenState::Help);
        press(&mut app, "z");
        assert_eq!(app.screen_state, ScreenState::Editing);
    }

    #[cfg(unix)]
    mod engine {
        use super::*;
        use battleship_core::EngineConfig;

        fn with_engine(script: &str) -> App {
            let mut app = test_app();
            app.supervisor = Supervisor::new(EngineConfig::new("/bin/sh").with_args(["-c", script]));
            app
        }

        #[test]
        fn test_solved_switches_to_solutions() {
            let mut app = with_engine(
                "cat >/dev/null; echo 'SOLUTIONS: 2'; \
                 printf '1 1 0 0\\n0 0 0 0\\n0 0 0 0\\n0 0 0 1\\n'; \
                 echo '---'; \
                 printf '0 0 0 0\\n0 0 0 0\\n0 0 0 0\\n1 1 1 1\\n'",
            );
            press(&mut app, "x");
            assert!(app.supervisor.is_running());
            let report = app.supervisor.wait().unwrap();
            app.apply_report(report);

            assert_eq!(app.screen_state, ScreenState::Solutions);
            assert_eq!(app.status, "Found 2 solutions");
            assert_eq!(app.supervisor.solutions().cursor(), 0);
            press(&mut app, "n");
            assert_eq!(app.supervisor.solutions().cursor(), 1);
            press(&mut app, "n");
            assert_eq!(app.supervisor.solutions().cursor(), 0);
            press(&mut app, "p");
            assert_eq!(app.supervisor.solutions().cursor(), 1);

            press(&mut app, "L");
            assert_eq!(app.screen_state, ScreenState::EngineLog);
            let lines = app.engine_log_lines();
            assert_eq!(lines[0], "-- Input --");
            assert_eq!(lines[1], "4");
            assert!(lines.contains(&"SOLUTIONS: 2".to_string()));
        }

        #[test]
        fn test_second_solve_rejected_while_running() {
            let mut app = with_engine("exec sleep 5");
            press(&mut app, "x");
            press(&mut app, "x");
            assert!(app.message.as_deref().unwrap().contains("still running"));

            press(&mut app, "c");
            let report = app.supervisor.wait().unwrap();
            app.apply_report(report);
            assert_eq!(app.status, "Solve cancelled");
            assert_eq!(app.screen_state, ScreenState::Editing);
            assert!(!app.supervisor.is_running());
        }

        #[test]
        fn test_failed_engine_reported() {
            let mut app = with_engine("cat >/dev/null; echo 'bad board' >&2; exit 3");
            press(&mut app, "x");
            let report = app.supervisor.wait().unwrap();
            app.apply_report(report);
            assert!(app.status.starts_with("Engine failed"));
            assert_eq!(app.screen_state, ScreenState::Editing);
            assert!(app.engine_log_lines().contains(&"bad board".to_string()));
        }
    }
}
