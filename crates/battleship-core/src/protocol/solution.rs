use crate::cell::SolutionCell;
use crate::puzzle::Position;
use serde::{Deserialize, Serialize};

/// One full board assignment returned by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution {
    size: usize,
    cells: Vec<SolutionCell>,
}

impl Solution {
    pub(crate) fn new(size: usize, cells: Vec<SolutionCell>) -> Self {
        debug_assert_eq!(cells.len(), size * size);
        Self { size, cells }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn cell(&self, pos: Position) -> SolutionCell {
        assert!(pos.row < self.size && pos.col < self.size);
        self.cells[pos.row * self.size + pos.col]
    }

    /// Rows as protocol codes (`0` water, `1` occupied)
    pub fn rows(&self) -> Vec<Vec<u8>> {
        self.cells
            .chunks(self.size)
            .map(|row| row.iter().map(|c| c.code()).collect())
            .collect()
    }

    pub fn occupied_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| **c == SolutionCell::Occupied)
            .count()
    }
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in self.cells.chunks(self.size) {
            let line: Vec<String> = row.iter().map(|c| c.code().to_string()).collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}

/// Solutions of the last solve attempt plus a browsing cursor.
///
/// Empty means "not solved yet" or "no solution".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolutionSet {
    solutions: Vec<Solution>,
    cursor: usize,
}

impl SolutionSet {
    pub fn new(solutions: Vec<Solution>) -> Self {
        Self {
            solutions,
            cursor: 0,
        }
    }

    pub fn clear(&mut self) {
        self.solutions.clear();
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.solutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> Option<&Solution> {
        self.solutions.get(self.cursor)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Solution> {
        self.solutions.iter()
    }

    /// Move to the next solution, wrapping around
    pub fn next(&mut self) -> Option<&Solution> {
        if self.solutions.is_empty() {
            return None;
        }
        self.cursor = (self.cursor + 1) % self.solutions.len();
        self.current()
    }

    /// Move to the previous solution, wrapping around
    pub fn prev(&mut self) -> Option<&Solution> {
        if self.solutions.is_empty() {
            return None;
        }
        self.cursor = (self.cursor + self.solutions.len() - 1) % self.solutions.len();
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solution(code: u8) -> Solution {
        let cell = if code == 0 {
            SolutionCell::Water
        } else {
            SolutionCell::Occupied
        };
        Solution::new(2, vec![cell; 4])
    }

    #[test]
    fn test_browsing_wraps() {
        let mut set = SolutionSet::new(vec![solution(0), solution(1), solution(0)]);
        assert_eq!(set.cursor(), 0);
        set.prev();
        assert_eq!(set.cursor(), 2);
        set.next();
        assert_eq!(set.cursor(), 0);
        set.next();
        assert_eq!(set.current(), Some(&solution(1)));
    }

    #[test]
    fn test_empty_set_browsing() {
        let mut set = SolutionSet::default();
        assert!(set.is_empty());
        assert!(set.next().is_none());
        assert!(set.prev().is_none());
        assert!(set.current().is_none());
    }

    #[test]
    fn test_display_and_rows() {
        let s = Solution::new(
            2,
            vec![
                SolutionCell::Occupied,
                SolutionCell::Water,
                SolutionCell::Water,
                SolutionCell::Occupied,
            ],
        );
        assert_eq!(s.to_string(), "1 0\n0 1\n");
        assert_eq!(s.rows(), vec![vec![1, 0], vec![0, 1]]);
        assert_eq!(s.occupied_count(), 2);
    }
}
