use crate::puzzle::Puzzle;
use std::fmt::Write;

/// Render the puzzle as engine input text.
///
/// Total: targets are non-negative by construction and every cell is in the
/// closed domain, so there is nothing to reject.
pub fn encode(puzzle: &Puzzle) -> String {
    let n = puzzle.size();
    let mut out = String::with_capacity(8 + (n + 1) * (n + 1) * 3);

    let _ = writeln!(out, "{}", puzzle.max_ship_len());

    out.push_str("-1");
    for target in puzzle.col_targets() {
        let _ = write!(out, " {}", target);
    }
    out.push('\n');

    for row in 0..n {
        let _ = write!(out, "{}", puzzle.row_target(row));
        for cell in puzzle.row(row) {
            let _ = write!(out, " {}", cell.code());
        }
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Cell;
    use crate::puzzle::Position;

    #[test]
    fn test_encode_blank_puzzle() {
        let puzzle = Puzzle::new(3, 2);
        assert_eq!(
            encode(&puzzle),
            "2\n-1 0 0 0\n0 -1 -1 -1\n0 -1 -1 -1\n0 -1 -1 -1\n"
        );
    }

    #[test]
    fn test_encode_cells_and_targets() {
        let mut puzzle = Puzzle::new(2, 4);
        puzzle.set_cell(Position::new(0, 0), Cell::ShipUp);
        puzzle.set_cell(Position::new(1, 0), Cell::ShipDown);
        puzzle.set_cell(Position::new(0, 1), Cell::Water);
        puzzle.set_cell(Position::new(1, 1), Cell::ShipSingle);
        puzzle.set_row_target(0, 1);
        puzzle.set_row_target(1, -3);
        puzzle.set_col_target(0, 2);

        assert_eq!(encode(&puzzle), "4\n-1 2 0\n1 2 0\n0 3 6\n");
    }
}
