use super::fields;
use super::row::{classify_row, RowDefect, RowOutcome, Strictness};
use crate::cell::Cell;
use crate::puzzle::{Puzzle, MAX_SIZE, MIN_SIZE};
use thiserror::Error;

/// Why a pasted engine-input document was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error("nothing to import")]
    Empty,

    #[error("line {line}: expected a single positive max ship length, found {text:?}")]
    MaxShipLen { line: usize, text: String },

    #[error("line {line}: column header must be -1 followed by non-negative targets; {defect}")]
    Header { line: usize, defect: RowDefect },

    #[error("line {line}: board size {size} outside {}..={}", MIN_SIZE, MAX_SIZE)]
    Size { line: usize, size: usize },

    #[error("line {line}: board row {row} must be a non-negative target followed by cell codes -1..=6; {defect}")]
    Row {
        line: usize,
        row: usize,
        defect: RowDefect,
    },

    #[error("expected {expected} board rows, found {found}")]
    MissingRows { expected: usize, found: usize },

    #[error("line {line}: unexpected data after the last board row")]
    TrailingData { line: usize },
}

/// Parse a full engine-input document (`K`, the column header, and `n` board
/// rows) into a fresh puzzle.
///
/// Nothing is returned unless every line validates, so callers can swap the
/// result in without risking a half-applied import.
pub fn import(text: &str) -> Result<Puzzle, ImportError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());

    let (line_no, line) = lines.next().ok_or(ImportError::Empty)?;
    let max_ship_len = parse_max_ship_len(line).ok_or_else(|| ImportError::MaxShipLen {
        line: line_no,
        text: line.to_string(),
    })?;

    let (line_no, line) = lines.next().ok_or(ImportError::MissingRows {
        expected: MIN_SIZE,
        found: 0,
    })?;
    let width = fields(line).count();
    let header = match classify_row(line, width, Strictness::Strict, |field, value| {
        if field == 0 {
            value == -1
        } else {
            valid_target(value)
        }
    }) {
        RowOutcome::Accepted(values) => values,
        RowOutcome::Skip(defect) | RowOutcome::Fail(defect) => {
            return Err(ImportError::Header {
                line: line_no,
                defect,
            })
        }
    };

    let size = header.len().saturating_sub(1);
    if !(MIN_SIZE..=MAX_SIZE).contains(&size) {
        return Err(ImportError::Size {
            line: line_no,
            size,
        });
    }
    let col_targets: Vec<u32> = header[1..].iter().map(|&v| v as u32).collect();

    let mut row_targets = Vec::with_capacity(size);
    let mut cells = Vec::with_capacity(size * size);
    for row in 0..size {
        let (line_no, line) = lines.next().ok_or(ImportError::MissingRows {
            expected: size,
            found: row,
        })?;
        let values = match classify_row(line, size + 1, Strictness::Strict, |field, value| {
            if field == 0 {
                valid_target(value)
            } else {
                Cell::from_code(value).is_some()
            }
        }) {
            RowOutcome::Accepted(values) => values,
            RowOutcome::Skip(defect) | RowOutcome::Fail(defect) => {
                return Err(ImportError::Row {
                    line: line_no,
                    row: row + 1,
                    defect,
                })
            }
        };
        row_targets.push(values[0] as u32);
        cells.extend(values[1..].iter().filter_map(|&code| Cell::from_code(code)));
    }

    if let Some((line_no, _)) = lines.next() {
        return Err(ImportError::TrailingData { line: line_no });
    }

    Ok(Puzzle::from_parts(
        size,
        max_ship_len,
        cells,
        row_targets,
        col_targets,
    ))
}

fn valid_target(value: i64) -> bool {
    (0..=u32::MAX as i64).contains(&value)
}

fn parse_max_ship_len(line: &str) -> Option<u32> {
    let mut parts = fields(line);
    let k = parts.next()?.parse::<u32>().ok()?;
    if parts.next().is_some() || k == 0 {
        return None;
    }
    Some(k)
}
