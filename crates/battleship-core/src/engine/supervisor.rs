use super::session::{CancelHandle, EngineConfig, EngineSession, SessionOutcome};
use crate::protocol::{decode_solutions, encode, SolutionSet};
use crate::puzzle::Puzzle;
use log::{debug, info, warn};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

const WAIT_SLICE: Duration = Duration::from_millis(50);

/// Identifies one accepted solve request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SolveId(u64);

impl std::fmt::Display for SolveId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolveRejected {
    #[error("solve {0} is still running")]
    Busy(SolveId),
}

/// What a finished solve means for the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveStatus {
    /// At least one solution was decoded
    Solved(usize),
    /// Clean run, nothing decoded
    NoSolution,
    /// Launch failure or non-zero exit, with diagnostic text
    Failed(String),
    /// Stopped on request or by the timeout
    Cancelled { timed_out: bool },
}

impl std::fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolveStatus::Solved(1) => write!(f, "Found 1 solution"),
            SolveStatus::Solved(n) => write!(f, "Found {} solutions", n),
            SolveStatus::NoSolution => write!(f, "No solution"),
            SolveStatus::Failed(diagnostic) => write!(f, "Engine failed: {}", diagnostic),
            SolveStatus::Cancelled { timed_out: true } => write!(f, "Solve timed out"),
            SolveStatus::Cancelled { timed_out: false } => write!(f, "Solve cancelled"),
        }
    }
}

/// The single terminal notification for a solve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolveReport {
    pub id: SolveId,
    pub status: SolveStatus,
}

/// Input and captured output of the most recent finished solve
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    pub input: String,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

struct Completion {
    id: SolveId,
    outcome: SessionOutcome,
}

struct ActiveSolve {
    id: SolveId,
    size: usize,
    input: String,
    cancel: CancelHandle,
    worker: Option<JoinHandle<()>>,
}

/// Runs at most one engine session at a time on a worker thread and hands
/// the result back to the owning thread through a channel.
///
/// All state here belongs to the owning thread; the worker only ever sends
/// one `Completion`, which `poll` or `wait` turns into a published
/// `SolutionSet` and a `SolveReport`.
pub struct Supervisor {
    config: EngineConfig,
    next_id: u64,
    active: Option<ActiveSolve>,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
    solutions: SolutionSet,
    transcript: Option<Transcript>,
}

impl Supervisor {
    pub fn new(config: EngineConfig) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            config,
            next_id: 1,
            active: None,
            tx,
            rx,
            solutions: SolutionSet::default(),
            transcript: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Takes effect from the next solve
    pub fn set_config(&mut self, config: EngineConfig) {
        self.config = config;
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_id(&self) -> Option<SolveId> {
        self.active.as_ref().map(|a| a.id)
    }

    pub fn solutions(&self) -> &SolutionSet {
        &self.solutions
    }

    pub fn solutions_mut(&mut self) -> &mut SolutionSet {
        &mut self.solutions
    }

    pub fn last_transcript(&self) -> Option<&Transcript> {
        self.transcript.as_ref()
    }

    /// Encode `puzzle` and launch the engine on a worker thread.
    ///
    /// Rejected while another solve is in flight.
    pub fn start_solve(&mut self, puzzle: &Puzzle) -> Result<SolveId, SolveRejected> {
        if let Some(active) = &self.active {
            warn!("solve rejected, {} still running", active.id);
            return Err(SolveRejected::Busy(active.id));
        }

        let id = SolveId(self.next_id);
        self.next_id += 1;
        let input = encode(puzzle);
        self.solutions.clear();

        let session = EngineSession::new(self.config.clone());
        session.reserve();
        let cancel = session.handle();
        let tx = self.tx.clone();
        let worker_input = input.clone();
        let spawned = thread::Builder::new()
            .name(format!("engine-{}", id.0))
            .spawn(move || {
                let outcome = session.run(&worker_input);
                let _ = tx.send(Completion { id, outcome });
            });

        let worker = match spawned {
            Ok(worker) => Some(worker),
            Err(err) => {
                warn!("could not start engine worker: {}", err);
                let _ = self.tx.send(Completion {
                    id,
                    outcome: SessionOutcome::Failed {
                        diagnostic: format!("could not start engine worker: {}", err),
                        run: None,
                    },
                });
                None
            }
        };

        info!(
            "solve {} started for {}x{} board, K={}",
            id,
            puzzle.size(),
            puzzle.size(),
            puzzle.max_ship_len()
        );
        self.active = Some(ActiveSolve {
            id,
            size: puzzle.size(),
            input,
            cancel,
            worker,
        });
        Ok(id)
    }

    /// Request cancellation of the running solve without waiting for it.
    ///
    /// The report still arrives through `poll`/`wait`.
    pub fn cancel(&mut self) -> bool {
        match &self.active {
            Some(active) => active.cancel.cancel(),
            None => false,
        }
    }

    /// Non-blocking: publish and return the report if the running solve has
    /// finished.
    pub fn poll(&mut self) -> Option<SolveReport> {
        match self.rx.try_recv() {
            Ok(completion) => self.finish(completion),
            Err(TryRecvError::Empty) => {
                let active = self.active.as_ref()?;
                let worker_gone = active.worker.as_ref().map_or(true, |w| w.is_finished());
                if !worker_gone {
                    return None;
                }
                // the worker may have sent just before finishing
                let completion = self.rx.try_recv().unwrap_or_else(|_| Completion {
                    id: active.id,
                    outcome: SessionOutcome::Failed {
                        diagnostic: "engine worker stopped without reporting".to_string(),
                        run: None,
                    },
                });
                self.finish(completion)
            }
            Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Block until the running solve finishes; `None` when idle
    pub fn wait(&mut self) -> Option<SolveReport> {
        loop {
            if let Some(report) = self.poll() {
                return Some(report);
            }
            self.active.as_ref()?;
            match self.rx.recv_timeout(WAIT_SLICE) {
                Ok(completion) => return self.finish(completion),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    fn finish(&mut self, completion: Completion) -> Option<SolveReport> {
        let active = match self.active.take() {
            Some(active) if active.id == completion.id => active,
            other => {
                debug!("dropping stale completion for solve {}", completion.id);
                self.active = other;
                return None;
            }
        };
        if let Some(worker) = active.worker {
            let _ = worker.join();
        }

        let run = completion.outcome.run().cloned().unwrap_or_default();
        self.transcript = Some(Transcript {
            input: active.input,
            stdout: run.stdout,
            stderr: run.stderr,
            exit_code: run.exit_code,
        });

        let status = match completion.outcome {
            SessionOutcome::Completed(run) => {
                let solutions = decode_solutions(&run.stdout, active.size);
                let status = if solutions.is_empty() {
                    SolveStatus::NoSolution
                } else {
                    SolveStatus::Solved(solutions.len())
                };
                self.solutions = SolutionSet::new(solutions);
                status
            }
            SessionOutcome::Failed { diagnostic, .. } => {
                self.solutions.clear();
                SolveStatus::Failed(diagnostic)
            }
            SessionOutcome::Cancelled { timed_out, .. } => {
                self.solutions.clear();
                SolveStatus::Cancelled { timed_out }
            }
        };

        info!("solve {} finished: {}", completion.id, status);
        Some(SolveReport {
            id: completion.id,
            status,
        })
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        if let Some(active) = &self.active {
            if active.cancel.cancel() {
                info!("solve {} cancelled on shutdown", active.id);
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::cell::Cell;
    use crate::engine::testing::{assert_reaped, pid_file, read_pid, shell};
    use crate::puzzle::Position;
    use std::time::Instant;

    #[test]
    fn test_idle_supervisor() {
        let mut supervisor = Supervisor::new(shell("true"));
        assert!(!supervisor.is_running());
        assert!(supervisor.poll().is_none());
        assert!(supervisor.wait().is_none());
        assert!(!supervisor.cancel());
    }

    #[test]
    fn test_solutions_are_published() {
        let script = "cat >/dev/null; printf 'SOLUTIONS: 1\\n--- Solution 1 ---\\n0 1 0\\n1 0 1\\n0 1 0\\n'";
        let mut supervisor = Supervisor::new(shell(script));
        let mut puzzle = Puzzle::new(3, 2);
        puzzle.set_cell(Position::new(1, 1), Cell::Water);

        let id = supervisor.start_solve(&puzzle).unwrap();
        assert!(supervisor.is_running());
        let report = supervisor.wait().unwrap();

        assert_eq!(report.id, id);
        assert_eq!(report.status, SolveStatus::Solved(1));
        assert!(!supervisor.is_running());
        assert_eq!(
            supervisor.solutions().current().unwrap().rows(),
            vec![vec![0, 1, 0], vec![1, 0, 1], vec![0, 1, 0]]
        );
        let transcript = supervisor.last_transcript().unwrap();
        assert_eq!(transcript.input, encode(&puzzle));
        assert_eq!(transcript.exit_code, Some(0));

        // exactly one report per solve
        assert!(supervisor.poll().is_none());
    }

    #[test]
    fn test_echoed_hints_are_published() {
        // the engine copies the ShipSingle hint into its solution verbatim
        let script = "cat >/dev/null; printf 'SOLUTIONS: 1\\n--- Solution 1 ---\\n6 0\\n0 0\\n'";
        let mut supervisor = Supervisor::new(shell(script));
        let mut puzzle = Puzzle::new(2, 1);
        puzzle.set_cell(Position::new(0, 0), Cell::ShipSingle);
        puzzle.set_row_target(0, 1);
        puzzle.set_col_target(0, 1);

        supervisor.start_solve(&puzzle).unwrap();
        assert_eq!(supervisor.wait().unwrap().status, SolveStatus::Solved(1));
        assert_eq!(
            supervisor.solutions().current().unwrap().rows(),
            vec![vec![1, 0], vec![0, 0]]
        );
    }

    #[test]
    fn test_no_solution() {
        let mut supervisor = Supervisor::new(shell("echo 'No solution'"));
        supervisor.start_solve(&Puzzle::new(3, 2)).unwrap();
        assert_eq!(supervisor.wait().unwrap().status, SolveStatus::NoSolution);
        assert!(supervisor.solutions().is_empty());
    }

    #[test]
    fn test_failure_reports_stderr() {
        let mut supervisor = Supervisor::new(shell("echo 'bad input' >&2; exit 2"));
        supervisor.start_solve(&Puzzle::new(3, 2)).unwrap();
        match supervisor.wait().unwrap().status {
            SolveStatus::Failed(diagnostic) => assert!(diagnostic.contains("bad input")),
            other => panic!("unexpected status {:?}", other),
        }
        assert!(!supervisor.is_running());
        assert_eq!(supervisor.last_transcript().unwrap().stderr, "bad input\n");
    }

    #[test]
    fn test_missing_engine_fails() {
        let mut supervisor = Supervisor::new(EngineConfig::new("/nonexistent/engine"));
        supervisor.start_solve(&Puzzle::new(3, 2)).unwrap();
        assert!(matches!(
            supervisor.wait().unwrap().status,
            SolveStatus::Failed(_)
        ));
        assert!(!supervisor.is_running());
    }

    #[test]
    fn test_single_flight_and_cancel() {
        let mut supervisor = Supervisor::new(shell("exec sleep 5"));
        let puzzle = Puzzle::new(3, 2);
        let first = supervisor.start_solve(&puzzle).unwrap();
        assert_eq!(
            supervisor.start_solve(&puzzle),
            Err(SolveRejected::Busy(first))
        );

        // give the worker time to spawn the child
        thread::sleep(Duration::from_millis(100));
        let started = Instant::now();
        assert!(supervisor.cancel());
        assert!(started.elapsed() < Duration::from_secs(1), "cancel must not block");

        let report = supervisor.wait().unwrap();
        assert_eq!(report.id, first);
        assert_eq!(report.status, SolveStatus::Cancelled { timed_out: false });
        assert!(supervisor.solutions().is_empty());

        let second = supervisor.start_solve(&puzzle).unwrap();
        assert_ne!(first, second);
        supervisor.cancel();
        assert!(supervisor.wait().is_some());
    }

    #[test]
    fn test_new_solve_clears_previous_solutions() {
        let mut supervisor = Supervisor::new(shell("printf '1 0\\n0 0\\n'"));
        let puzzle = Puzzle::new(2, 1);
        supervisor.start_solve(&puzzle).unwrap();
        supervisor.wait().unwrap();
        assert_eq!(supervisor.solutions().len(), 1);

        supervisor.set_config(shell("exec sleep 5"));
        supervisor.start_solve(&puzzle).unwrap();
        assert!(supervisor.solutions().is_empty());
        supervisor.cancel();
        supervisor.wait();
    }

    #[test]
    fn test_drop_tears_down_running_solve() {
        let path = pid_file("supervisor-drop");
        let script = format!("echo $$ > '{}'; exec sleep 30", path.display());
        let mut supervisor = Supervisor::new(shell(&script));
        supervisor.start_solve(&Puzzle::new(3, 2)).unwrap();
        let pid = read_pid(&path);

        let started = Instant::now();
        drop(supervisor);
        assert!(started.elapsed() < Duration::from_secs(1), "drop must not block");
        // the detached worker reaps the killed engine
        assert_reaped(pid);
    }

    #[test]
    fn test_drop_reaches_forked_children() {
        let path = pid_file("supervisor-drop-fork");
        // sleep runs as a forked child of the shell, not the shell itself
        let script = format!("sleep 30 & echo $! > '{}'; wait", path.display());
        let mut supervisor = Supervisor::new(shell(&script));
        supervisor.start_solve(&Puzzle::new(3, 2)).unwrap();
        let pid = read_pid(&path);

        drop(supervisor);
        let deadline = Instant::now() + Duration::from_secs(5);
        // the orphan goes to init; it is gone once kill(0) fails or it is a zombie
        while unsafe { libc::kill(pid, 0) } == 0 && !is_zombie(pid) {
            assert!(Instant::now() < deadline, "forked pid {} survived", pid);
            thread::sleep(Duration::from_millis(20));
        }
    }

    fn is_zombie(pid: libc::pid_t) -> bool {
        std::fs::read_to_string(format!("/proc/{}/stat", pid))
            .ok()
            .and_then(|stat| {
                let state = stat.rsplit(')').next()?.trim_start().chars().next()?;
                Some(state == 'Z')
            })
            .unwrap_or(false)
    }
}
