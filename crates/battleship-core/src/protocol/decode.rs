use super::row::{classify_row, RowDefect, RowOutcome, Strictness};
use super::solution::Solution;
use crate::cell::SolutionCell;
use log::debug;

const NO_SOLUTION: &str = "no solution";

/// Extract every well-formed `size`x`size` solution block from engine output.
///
/// Blank lines are ignored. Non-numeric lines (the engine's `SOLUTIONS: k`
/// and `--- Solution i ---` framing) end any partial block. Solution cells
/// are read through [`SolutionCell::from_code`], so hint codes copied into
/// the solution count as occupied.
///
/// A row with the wrong width or an out-of-domain value poisons its block:
/// the block is discarded together with the rows that would have completed
/// it, so headerless output stays aligned on block boundaries. A header line
/// ends the poisoned stretch early. A "no solution" sentinel yields an empty
/// list.
pub fn decode_solutions(text: &str, size: usize) -> Vec<Solution> {
    let mut solutions = Vec::new();
    let mut block: Vec<SolutionCell> = Vec::with_capacity(size * size);
    // rows still belonging to a rejected block
    let mut poisoned = 0;

    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.to_ascii_lowercase().contains(NO_SOLUTION) {
            debug!("engine reported no solution at line {}", idx + 1);
            return Vec::new();
        }

        match classify_row(line, size, Strictness::Tolerant, |_, value| {
            SolutionCell::from_code(value).is_some()
        }) {
            RowOutcome::Skip(RowDefect::NotNumeric { .. }) => {
                if !block.is_empty() || poisoned > 0 {
                    debug!("line {}: header cut a partial block short", idx + 1);
                }
                block.clear();
                poisoned = 0;
            }
            _ if poisoned > 0 => {
                poisoned -= 1;
            }
            RowOutcome::Accepted(values) => {
                block.extend(values.into_iter().filter_map(SolutionCell::from_code));
                if block.len() == size * size {
                    let cells = std::mem::replace(&mut block, Vec::with_capacity(size * size));
                    solutions.push(Solution::new(size, cells));
                }
            }
            RowOutcome::Skip(defect) | RowOutcome::Fail(defect) => {
                debug!("line {}: skipping solution block, {}", idx + 1, defect);
                poisoned = size - 1 - block.len() / size;
                block.clear();
            }
        }
    }

    if !block.is_empty() {
        debug!("dropping trailing partial block of {} cells", block.len());
    }
    solutions
}
