//! Plain-text protocol spoken with the solving engine.
//!
//! Engine input is `K`, then a `-1`-cornered header row of column targets,
//! then one row per board row: the row target followed by the cell codes.
//! Engine output is zero or more `n`x`n` blocks of `0`/`1` rows, optionally
//! framed by header lines, or a "no solution" sentinel.

mod decode;
mod encode;
mod import;
mod row;
mod solution;

pub use decode::decode_solutions;
pub use encode::encode;
pub use import::{import, ImportError};
pub use row::{classify_row, RowDefect, RowOutcome, Strictness};
pub use solution::{Solution, SolutionSet};

/// Split a protocol line into fields; commas and semicolons count as whitespace
pub(crate) fn fields(line: &str) -> impl Iterator<Item = &str> {
    line.split(|c: char| c.is_whitespace() || c == ',' || c == ';')
        .filter(|field| !field.is_empty())
}
