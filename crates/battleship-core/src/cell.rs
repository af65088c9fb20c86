use serde::{Deserialize, Serialize};

/// State of a single puzzle cell.
///
/// Every cell holds exactly one of these states. The integer each state
/// carries on the engine protocol lives in [`Cell::code`] and
/// [`Cell::from_code`] and nowhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Cell {
    /// Undetermined
    #[default]
    Unknown,
    /// Confirmed empty
    Water,
    /// Occupied, orientation not yet refined
    ShipBody,
    /// Ship segment continuing downwards (top end)
    ShipUp,
    /// Ship segment continuing upwards (bottom end)
    ShipDown,
    /// Ship segment continuing rightwards (left end)
    ShipLeft,
    /// Ship segment continuing leftwards (right end)
    ShipRight,
    /// One-cell ship
    ShipSingle,
}

impl Cell {
    /// All states, in protocol code order
    pub const ALL: [Cell; 8] = [
        Cell::Unknown,
        Cell::Water,
        Cell::ShipBody,
        Cell::ShipUp,
        Cell::ShipDown,
        Cell::ShipLeft,
        Cell::ShipRight,
        Cell::ShipSingle,
    ];

    /// Integer code used on the engine protocol
    pub fn code(self) -> i8 {
        match self {
            Cell::Unknown => -1,
            Cell::Water => 0,
            Cell::ShipBody => 1,
            Cell::ShipUp => 2,
            Cell::ShipDown => 3,
            Cell::ShipLeft => 4,
            Cell::ShipRight => 5,
            Cell::ShipSingle => 6,
        }
    }

    /// Decode a protocol integer, `None` if it is outside the closed domain
    pub fn from_code(code: i64) -> Option<Cell> {
        match code {
            -1 => Some(Cell::Unknown),
            0 => Some(Cell::Water),
            1 => Some(Cell::ShipBody),
            2 => Some(Cell::ShipUp),
            3 => Some(Cell::ShipDown),
            4 => Some(Cell::ShipLeft),
            5 => Some(Cell::ShipRight),
            6 => Some(Cell::ShipSingle),
            _ => None,
        }
    }

    /// Any ship variant counts as occupied
    pub fn is_occupied(self) -> bool {
        !matches!(self, Cell::Unknown | Cell::Water)
    }

    /// Two-state flip between `Unknown` and `Water`; ship states are untouched
    pub fn toggled(self) -> Cell {
        match self {
            Cell::Unknown => Cell::Water,
            Cell::Water => Cell::Unknown,
            other => other,
        }
    }

    /// Next state in the ship cycle.
    ///
    /// `ShipBody -> ShipUp -> ShipDown -> ShipLeft -> ShipRight -> ShipSingle -> Unknown -> ShipBody`.
    /// `Water` is not on the cycle and re-enters it at `ShipBody`.
    pub fn cycled(self) -> Cell {
        match self {
            Cell::ShipBody => Cell::ShipUp,
            Cell::ShipUp => Cell::ShipDown,
            Cell::ShipDown => Cell::ShipLeft,
            Cell::ShipLeft => Cell::ShipRight,
            Cell::ShipRight => Cell::ShipSingle,
            Cell::ShipSingle => Cell::Unknown,
            Cell::Unknown | Cell::Water => Cell::ShipBody,
        }
    }

    /// Keyboard shortcut mapping: `w`, `u`, `s` and the digit codes `0`..`6`
    pub fn from_key(key: char) -> Option<Cell> {
        match key.to_ascii_lowercase() {
            'w' => Some(Cell::Water),
            'u' => Some(Cell::Unknown),
            's' => Some(Cell::ShipSingle),
            d @ '0'..='6' => d.to_digit(10).and_then(|code| Cell::from_code(code as i64)),
            _ => None,
        }
    }

    /// One-character glyph for text rendering
    pub fn symbol(self) -> char {
        match self {
            Cell::Unknown => '?',
            Cell::Water => '~',
            Cell::ShipBody => '#',
            Cell::ShipUp => '^',
            Cell::ShipDown => 'v',
            Cell::ShipLeft => '<',
            Cell::ShipRight => '>',
            Cell::ShipSingle => 'o',
        }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Unknown => write!(f, "Unknown"),
            Cell::Water => write!(f, "Water"),
            Cell::ShipBody => write!(f, "Ship"),
            Cell::ShipUp => write!(f, "Ship (top end)"),
            Cell::ShipDown => write!(f, "Ship (bottom end)"),
            Cell::ShipLeft => write!(f, "Ship (left end)"),
            Cell::ShipRight => write!(f, "Ship (right end)"),
            Cell::ShipSingle => write!(f, "Single ship"),
        }
    }
}

/// Cell of a solved grid as reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolutionCell {
    Water,
    Occupied,
}

impl SolutionCell {
    /// Engine output code: `0` water, `1` occupied.
    ///
    /// The engine copies fixed hints into its solutions unchanged, so the
    /// ship codes `2`..`6` also read as occupied. `Unknown` (`-1`) is never a
    /// solved state and is rejected like any code outside the cell domain.
    pub fn from_code(code: i64) -> Option<SolutionCell> {
        match Cell::from_code(code)? {
            Cell::Unknown => None,
            Cell::Water => Some(SolutionCell::Water),
            _ => Some(SolutionCell::Occupied),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            SolutionCell::Water => 0,
            SolutionCell::Occupied => 1,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            SolutionCell::Water => '~',
            SolutionCell::Occupied => '#',
        }
    }
}
