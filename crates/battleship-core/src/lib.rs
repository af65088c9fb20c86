//! Battleship puzzle core: the editable puzzle model, the plain-text protocol
//! spoken with the external solving engine, and the machinery that runs the
//! engine as a child process.

pub mod cell;
pub mod engine;
pub mod protocol;
pub mod puzzle;

pub use cell::{Cell, SolutionCell};
pub use engine::{
    CancelHandle, EngineConfig, EngineRun, EngineSession, SessionError, SessionOutcome,
    SessionState, SolveId, SolveRejected, SolveReport, SolveStatus, Supervisor, Transcript,
};
pub use protocol::{
    classify_row, decode_solutions, encode, import, ImportError, RowDefect, RowOutcome,
    Solution, SolutionSet, Strictness,
};
pub use puzzle::{
    InvalidPuzzle, Position, Puzzle, DEFAULT_MAX_SHIP_LEN, DEFAULT_SIZE, MAX_SIZE, MIN_SIZE,
};
