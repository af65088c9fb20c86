//! Running the external engine.
//!
//! [`EngineSession`] owns one child process from spawn to reaping;
//! [`Supervisor`] keeps at most one session in flight and delivers its
//! result back to the thread that owns the puzzle.

mod session;
mod supervisor;

pub use session::{
    CancelHandle, EngineConfig, EngineRun, EngineSession, SessionError, SessionOutcome,
    SessionState,
};
pub use supervisor::{SolveId, SolveRejected, SolveReport, SolveStatus, Supervisor, Transcript};
