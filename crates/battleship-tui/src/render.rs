use crate::app::{App, BoardLayout, ScreenState, CELL_WIDTH};
use battleship_core::{Cell, Position, Solution, SolutionCell};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute,
    style::{Color, Print, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};
use std::io;

/// Column where the board starts; row targets sit to its left
const BOARD_X: u16 = 6;
/// Row where the board starts; column targets sit above it
const BOARD_Y: u16 = 4;
/// Room reserved right of the board for the info panel
const INFO_WIDTH: u16 = 34;
/// Room reserved below the board for the controls
const CONTROLS_HEIGHT: u16 = 6;

pub fn render(stdout: &mut io::Stdout, app: &mut App) -> io::Result<()> {
    let (term_width, term_height) = terminal::size()?;

    execute!(
        stdout,
        Hide,
        SetBackgroundColor(app.theme.bg),
        Clear(ClearType::All)
    )?;

    match app.screen_state {
        ScreenState::Editing => render_edit_screen(stdout, app, term_width, term_height)?,
        ScreenState::Solutions => render_solutions_screen(stdout, app, term_width, term_height)?,
        ScreenState::EngineLog => render_log_screen(stdout, app, term_width, term_height)?,
        ScreenState::Help => render_help_screen(stdout, app, term_width)?,
    }

    if let Some(ref msg) = app.message {
        render_message(stdout, app, msg, term_width)?;
    }

    execute!(stdout, Show)?;
    Ok(())
}

/// Largest window of an `size`x`size` board that fits, scrolled so `focus`
/// stays visible
fn viewport(size: usize, focus: Position, term_width: u16, term_height: u16) -> BoardLayout {
    let max_cols = (term_width.saturating_sub(BOARD_X + INFO_WIDTH) / CELL_WIDTH).max(1) as usize;
    let max_rows = term_height.saturating_sub(BOARD_Y + CONTROLS_HEIGHT).max(1) as usize;
    let visible_rows = size.min(max_rows);
    let visible_cols = size.min(max_cols);

    let scroll = |focus: usize, visible: usize| {
        focus
            .saturating_sub(visible / 2)
            .min(size.saturating_sub(visible))
    };

    BoardLayout {
        origin_x: BOARD_X,
        origin_y: BOARD_Y,
        offset: Position::new(
            scroll(focus.row, visible_rows),
            scroll(focus.col, visible_cols),
        ),
        visible_rows,
        visible_cols,
    }
}

fn render_title(stdout: &mut io::Stdout, app: &App, title: &str) -> io::Result<()> {
    execute!(
        stdout,
        MoveTo(2, 1),
        SetForegroundColor(app.theme.key),
        Print(title)
    )
}

fn render_edit_screen(
    stdout: &mut io::Stdout,
    app: &mut App,
    term_width: u16,
    term_height: u16,
) -> io::Result<()> {
    let layout = viewport(app.puzzle.size(), app.cursor, term_width, term_height);
    app.layout = Some(layout);

    render_title(stdout, app, "=== BATTLESHIP ===")?;
    render_targets(stdout, app, &layout)?;
    render_board(stdout, app, &layout)?;

    let info_x = layout.origin_x + layout.visible_cols as u16 * CELL_WIDTH + 3;
    render_info_panel(stdout, app, info_x, layout.origin_y)?;

    let controls_y = layout.origin_y + layout.visible_rows as u16 + 1;
    render_controls(stdout, app, 2, controls_y)?;

    Ok(())
}

/// Target color: met, exceeded, or still open
fn target_color(app: &App, target: u32, occupied: u32) -> Color {
    if occupied == target {
        app.theme.success
    } else if occupied > target {
        app.theme.error
    } else {
        app.theme.target
    }
}

fn render_targets(stdout: &mut io::Stdout, app: &App, layout: &BoardLayout) -> io::Result<()> {
    let puzzle = &app.puzzle;

    execute!(stdout, MoveTo(layout.origin_x, layout.origin_y - 1))?;
    for col in layout.offset.col..layout.offset.col + layout.visible_cols {
        let target = puzzle.col_target(col);
        let color = target_color(app, target, puzzle.occupied_in_col(col));
        let bg = if col == app.cursor.col {
            app.theme.highlight_bg
        } else {
            app.theme.bg
        };
        execute!(
            stdout,
            SetBackgroundColor(bg),
            SetForegroundColor(color),
            Print(format!("{:^3}", target))
        )?;
    }

    for (i, row) in (layout.offset.row..layout.offset.row + layout.visible_rows).enumerate() {
        let target = puzzle.row_target(row);
        let color = target_color(app, target, puzzle.occupied_in_row(row));
        let bg = if row == app.cursor.row {
            app.theme.highlight_bg
        } else {
            app.theme.bg
        };
        execute!(
            stdout,
            MoveTo(layout.origin_x - 5, layout.origin_y + i as u16),
            SetBackgroundColor(bg),
            SetForegroundColor(color),
            Print(format!("{:>3} ", target))
        )?;
    }

    execute!(stdout, SetBackgroundColor(app.theme.bg))?;
    Ok(())
}

fn render_board(stdout: &mut io::Stdout, app: &App, layout: &BoardLayout) -> io::Result<()> {
    for i in 0..layout.visible_rows {
        execute!(stdout, MoveTo(layout.origin_x, layout.origin_y + i as u16))?;
        for j in 0..layout.visible_cols {
            let pos = Position::new(layout.offset.row + i, layout.offset.col + j);
            render_cell(stdout, app, pos)?;
        }
    }
    execute!(stdout, SetBackgroundColor(app.theme.bg))?;
    Ok(())
}

fn render_cell(stdout: &mut io::Stdout, app: &App, pos: Position) -> io::Result<()> {
    let theme = &app.theme;
    let cell = app.puzzle.cell(pos);

    let bg = if pos == app.cursor {
        theme.selected_bg
    } else if app.is_highlighted(pos) {
        theme.highlight_bg
    } else {
        theme.bg
    };
    let fg = match cell {
        Cell::Unknown => theme.unknown,
        Cell::Water => theme.water,
        _ => theme.ship,
    };

    execute!(
        stdout,
        SetBackgroundColor(bg),
        SetForegroundColor(fg),
        Print(format!(" {} ", cell.symbol()))
    )
}

fn render_info_panel(stdout: &mut io::Stdout, app: &App, x: u16, y: u16) -> io::Result<()> {
    let theme = &app.theme;
    let puzzle = &app.puzzle;

    let solutions = app.supervisor.solutions();
    let engine = app.supervisor.config().program.display().to_string();
    let import = app
        .import_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "-".to_string());

    let lines = [
        format!("Size:      {}x{}", puzzle.size(), puzzle.size()),
        format!("Max ship:  {}", puzzle.max_ship_len()),
        format!(
            "Cursor:    r{} c{}",
            app.cursor.row + 1,
            app.cursor.col + 1
        ),
        format!("Cell:      {}", puzzle.cell(app.cursor)),
        String::new(),
        format!("Engine:    {}", engine),
        format!("Import:    {}", import),
        String::new(),
        format!("Solutions: {}", solutions.len()),
    ];
    for (i, line) in lines.iter().enumerate() {
        execute!(
            stdout,
            MoveTo(x, y + i as u16),
            SetForegroundColor(theme.info),
            Print(line)
        )?;
    }

    let status_color = if app.supervisor.is_running() {
        theme.key
    } else {
        theme.fg
    };
    execute!(
        stdout,
        MoveTo(x, y + lines.len() as u16),
        SetForegroundColor(status_color),
        Print(format!("Status:    {}", app.status))
    )?;

    Ok(())
}

fn render_key_grid(
    stdout: &mut io::Stdout,
    app: &App,
    controls: &[(&str, &str)],
    x: u16,
    y: u16,
    rows: usize,
) -> io::Result<()> {
    let theme = &app.theme;
    for (i, (key, desc)) in controls.iter().enumerate() {
        let col = i / rows;
        let row = i % rows;
        let cx = x + (col as u16) * 22;
        let cy = y + row as u16;

        execute!(
            stdout,
            MoveTo(cx, cy),
            SetForegroundColor(theme.key),
            Print(format!("{:>8}", key)),
            SetForegroundColor(theme.info),
            Print(format!(" {}", desc))
        )?;
    }
    Ok(())
}

fn render_controls(stdout: &mut io::Stdout, app: &App, x: u16, y: u16) -> io::Result<()> {
    let controls = [
        ("Arrows", "Move"),
        ("Space", "Water/Unknown"),
        ("Enter", "Cycle ship"),
        ("w/u/s/0-6", "Set cell"),
        ("+/-", "Row target"),
        ("]/[", "Column target"),
        ("t", "Recalc targets"),
        ("</>", "Resize"),
        ("m/M", "Max ship"),
        ("x", "Solve"),
        ("c/Esc", "Cancel"),
        ("v", "Solutions"),
        ("L", "Engine log"),
        ("I", "Re-import"),
        ("?", "Help"),
        ("q", "Quit"),
    ];
    render_key_grid(stdout, app, &controls, x, y, 4)
}

fn render_solutions_screen(
    stdout: &mut io::Stdout,
    app: &App,
    term_width: u16,
    term_height: u16,
) -> io::Result<()> {
    let theme = &app.theme;
    let solutions = app.supervisor.solutions();

    let header = match solutions.current() {
        Some(_) => format!(
            "=== SOLUTION {} OF {} ===",
            solutions.cursor() + 1,
            solutions.len()
        ),
        None => "=== SOLUTIONS ===".to_string(),
    };
    render_title(stdout, app, &header)?;

    execute!(
        stdout,
        MoveTo(2, 2),
        SetForegroundColor(theme.info),
        Print(format!("Status: {}", app.status))
    )?;

    let Some(solution) = solutions.current() else {
        execute!(
            stdout,
            MoveTo(BOARD_X, BOARD_Y),
            SetForegroundColor(theme.fg),
            Print("No solutions to show. Press x on the editor to solve.")
        )?;
        return render_key_grid(stdout, app, &[("Esc", "Back")], 2, BOARD_Y + 2, 1);
    };

    let layout = viewport(
        solution.size(),
        Position::default(),
        term_width,
        term_height,
    );
    render_solution(stdout, app, solution, &layout)?;

    let controls_y = layout.origin_y + layout.visible_rows as u16 + 1;
    let controls = [
        ("n/Right", "Next"),
        ("p/Left", "Previous"),
        ("L", "Engine log"),
        ("Esc", "Back"),
    ];
    render_key_grid(stdout, app, &controls, 2, controls_y, 2)
}

fn render_solution(
    stdout: &mut io::Stdout,
    app: &App,
    solution: &Solution,
    layout: &BoardLayout,
) -> io::Result<()> {
    let theme = &app.theme;
    let rows = layout.offset.row..layout.offset.row + layout.visible_rows;
    let cols = layout.offset.col..layout.offset.col + layout.visible_cols;

    // column counts
    execute!(stdout, MoveTo(layout.origin_x, layout.origin_y - 1))?;
    for col in cols.clone() {
        let count = rows
            .clone()
            .filter(|&row| solution.cell(Position::new(row, col)) == SolutionCell::Occupied)
            .count();
        execute!(
            stdout,
            SetForegroundColor(theme.target),
            Print(format!("{:^3}", count))
        )?;
    }

    for (i, row) in rows.clone().enumerate() {
        let count = (0..solution.size())
            .filter(|&col| solution.cell(Position::new(row, col)) == SolutionCell::Occupied)
            .count();
        execute!(
            stdout,
            MoveTo(layout.origin_x - 5, layout.origin_y + i as u16),
            SetForegroundColor(theme.target),
            Print(format!("{:>3} ", count))
        )?;
        for col in cols.clone() {
            let cell = solution.cell(Position::new(row, col));
            let fg = match cell {
                SolutionCell::Water => theme.water,
                SolutionCell::Occupied => theme.ship,
            };
            execute!(
                stdout,
                SetForegroundColor(fg),
                Print(format!(" {} ", cell.symbol()))
            )?;
        }
    }
    Ok(())
}

fn render_log_screen(
    stdout: &mut io::Stdout,
    app: &App,
    term_width: u16,
    term_height: u16,
) -> io::Result<()> {
    let theme = &app.theme;
    render_title(stdout, app, "=== ENGINE LOG ===")?;

    let lines = app.engine_log_lines();
    let height = term_height.saturating_sub(5) as usize;
    let width = term_width.saturating_sub(4) as usize;
    for (i, line) in lines.iter().skip(app.log_scroll).take(height).enumerate() {
        let color = if line.starts_with("-- ") {
            theme.key
        } else {
            theme.fg
        };
        let shown: String = line.chars().take(width).collect();
        execute!(
            stdout,
            MoveTo(2, 3 + i as u16),
            SetForegroundColor(color),
            Print(shown)
        )?;
    }

    execute!(
        stdout,
        MoveTo(2, term_height.saturating_sub(1)),
        SetForegroundColor(theme.info),
        Print(format!(
            "Line {}/{}   Up/Down/PgUp/PgDn scroll, Esc back",
            (app.log_scroll + 1).min(lines.len()),
            lines.len()
        ))
    )?;
    Ok(())
}

fn render_help_screen(stdout: &mut io::Stdout, app: &App, term_width: u16) -> io::Result<()> {
    render_title(stdout, app, "=== HELP ===")?;

    let cells: Vec<String> = Cell::ALL
        .iter()
        .map(|cell| format!("{} {:>2} {}", cell.symbol(), cell.code(), cell))
        .collect();
    for (i, line) in cells.iter().enumerate() {
        execute!(
            stdout,
            MoveTo(4, 3 + i as u16),
            SetForegroundColor(app.theme.fg),
            Print(line)
        )?;
    }

    let controls = [
        ("hjkl", "Move"),
        ("Click", "Toggle water"),
        ("R-click", "Cycle ship"),
        ("Del", "Clear cell"),
        ("T", "Theme"),
        ("Ctrl+C", "Quit"),
    ];
    let x = (term_width / 2).max(30);
    render_key_grid(stdout, app, &controls, x, 3, controls.len())?;

    execute!(
        stdout,
        MoveTo(4, 4 + cells.len() as u16),
        SetForegroundColor(app.theme.info),
        Print("Press any key to return")
    )?;
    Ok(())
}

fn render_message(
    stdout: &mut io::Stdout,
    app: &App,
    msg: &str,
    term_width: u16,
) -> io::Result<()> {
    let theme = &app.theme;
    let padded = format!("  {}  ", msg);
    let x = term_width.saturating_sub(padded.len() as u16) / 2;

    execute!(
        stdout,
        MoveTo(x, 0),
        SetForegroundColor(theme.fg),
        SetBackgroundColor(theme.selected_bg),
        Print(&padded),
        SetBackgroundColor(theme.bg)
    )?;

    Ok(())
}
