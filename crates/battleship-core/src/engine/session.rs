use log::{debug, info, warn};
use std::ffi::OsString;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

/// How often a running session checks the child for exit
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How to launch the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Engine executable
    pub program: PathBuf,
    /// Extra arguments; the real engine takes none
    pub args: Vec<OsString>,
    /// Cancel the run automatically after this long
    pub timeout: Option<Duration>,
}

impl EngineConfig {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Lifecycle of one engine invocation.
///
/// `Idle -> Spawning -> Running -> {Completed | Failed | Cancelled}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Spawning,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl SessionState {
    /// A process is being launched or is live
    pub fn is_active(self) -> bool {
        matches!(self, SessionState::Spawning | SessionState::Running)
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Failed | SessionState::Cancelled
        )
    }
}

/// Everything captured from a process that was actually launched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineRun {
    /// `None` when the process was ended by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Terminal outcome of a session; exactly one per session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Exit code zero
    Completed(EngineRun),
    /// Launch failure, I/O failure, or non-zero exit
    Failed {
        diagnostic: String,
        run: Option<EngineRun>,
    },
    /// Cancellation was requested before the exit was observed
    Cancelled {
        timed_out: bool,
        run: Option<EngineRun>,
    },
}

impl SessionOutcome {
    pub fn state(&self) -> SessionState {
        match self {
            SessionOutcome::Completed(_) => SessionState::Completed,
            SessionOutcome::Failed { .. } => SessionState::Failed,
            SessionOutcome::Cancelled { .. } => SessionState::Cancelled,
        }
    }

    pub fn run(&self) -> Option<&EngineRun> {
        match self {
            SessionOutcome::Completed(run) => Some(run),
            SessionOutcome::Failed { run, .. } | SessionOutcome::Cancelled { run, .. } => {
                run.as_ref()
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session already started")]
    AlreadyStarted,

    #[error("failed to launch engine {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to send input to engine: {0}")]
    Input(#[source] io::Error),

    #[error("failed to wait for engine: {0}")]
    Wait(#[source] io::Error),

    #[error("session was never started")]
    NotStarted,

    #[error("cancelled before the engine was launched")]
    CancelledBeforeLaunch,
}

/// State shared between the session and its cancel handles
struct Slot {
    state: SessionState,
    child: Option<Child>,
    /// Process group led by the child, outliving it until torn down
    group: Option<u32>,
    cancel_requested: bool,
    timed_out: bool,
}

impl Slot {
    /// Ask the live child and everything it forked to terminate; no wait
    fn signal(&mut self) {
        if let Some(child) = self.child.as_mut() {
            let pid = child.id();
            match child.kill() {
                Ok(()) => debug!("sent kill to engine pid {}", pid),
                Err(err) => debug!("kill of engine pid {} failed: {}", pid, err),
            }
        }
        if let Some(group) = self.group {
            kill_group(group);
        }
    }

    /// Kill whatever is left of the group once the leader is gone.
    ///
    /// Stray descendants would otherwise keep the output pipes open.
    fn end_group(&mut self) {
        if let Some(group) = self.group.take() {
            kill_group(group);
        }
    }

    fn request_cancel(&mut self) {
        if !self.cancel_requested {
            self.cancel_requested = true;
            self.signal();
        }
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            warn!("engine pid {} outlived its session, killing", child.id());
            let _ = child.kill();
            let _ = child.try_wait();
        }
        self.end_group();
    }
}

#[cfg(unix)]
fn kill_group(group: u32) {
    // a negative pid addresses the whole group
    let rc = unsafe { libc::kill(-(group as libc::pid_t), libc::SIGKILL) };
    if rc == 0 {
        debug!("sent kill to engine group {}", group);
    } else {
        debug!(
            "kill of engine group {} failed: {}",
            group,
            io::Error::last_os_error()
        );
    }
}

#[cfg(not(unix))]
fn kill_group(_group: u32) {}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Cloneable, thread-safe handle for cancelling a session
#[derive(Clone)]
pub struct CancelHandle {
    slot: Arc<Mutex<Slot>>,
}

impl CancelHandle {
    /// Request cancellation and signal the child if there is one.
    ///
    /// Idempotent. Returns `false` (and does nothing) when the session is not
    /// spawning or running.
    pub fn cancel(&self) -> bool {
        let mut slot = lock(&self.slot);
        if !slot.state.is_active() {
            return false;
        }
        if !slot.cancel_requested {
            info!("cancelling engine session");
        }
        slot.request_cancel();
        true
    }

    pub fn is_cancel_requested(&self) -> bool {
        lock(&self.slot).cancel_requested
    }

    pub fn state(&self) -> SessionState {
        lock(&self.slot).state
    }
}

struct SessionIo {
    writer: JoinHandle<io::Result<()>>,
    stdout: JoinHandle<String>,
    stderr: JoinHandle<String>,
}

/// One invocation of the external engine.
///
/// The child is spawned with all three standard streams piped; the input is
/// written on a helper thread and the pipe closed, while two more threads
/// drain stdout and stderr so the child never blocks on a full pipe.
pub struct EngineSession {
    config: EngineConfig,
    slot: Arc<Mutex<Slot>>,
    io: Option<SessionIo>,
}

impl EngineSession {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            slot: Arc::new(Mutex::new(Slot {
                state: SessionState::Idle,
                child: None,
                group: None,
                cancel_requested: false,
                timed_out: false,
            })),
            io: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        lock(&self.slot).state
    }

    pub fn handle(&self) -> CancelHandle {
        CancelHandle {
            slot: Arc::clone(&self.slot),
        }
    }

    fn set_state(&self, state: SessionState) {
        let mut slot = lock(&self.slot);
        debug!("engine session {:?} -> {:?}", slot.state, state);
        slot.state = state;
    }

    /// Commit to launching (`Idle -> Spawning`) ahead of `start`, so a
    /// cancel issued before the process exists is not lost.
    pub fn reserve(&self) {
        let mut slot = lock(&self.slot);
        if slot.state == SessionState::Idle {
            slot.state = SessionState::Spawning;
        }
    }

    /// Launch the engine and feed it `input`
    pub fn start(&mut self, input: &str) -> Result<(), SessionError> {
        {
            let mut slot = lock(&self.slot);
            match slot.state {
                SessionState::Idle => slot.state = SessionState::Spawning,
                SessionState::Spawning if self.io.is_none() => {}
                _ => return Err(SessionError::AlreadyStarted),
            }
            if slot.cancel_requested {
                return Err(SessionError::CancelledBeforeLaunch);
            }
        }

        let program = self.config.program.display().to_string();
        debug!("spawning engine {} ({} bytes of input)", program, input.len());
        let mut command = Command::new(&self.config.program);
        command
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // own group, so a kill also reaches anything the engine forks
            command.process_group(0);
        }
        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(source) => {
                self.set_state(SessionState::Failed);
                return Err(SessionError::Spawn { program, source });
            }
        };
        info!("engine {} started, pid {}", program, child.id());

        let stdin = child.stdin.take();
        let input = input.to_owned();
        let writer = thread::spawn(move || -> io::Result<()> {
            if let Some(mut stdin) = stdin {
                stdin.write_all(input.as_bytes())?;
                stdin.flush()?;
            }
            Ok(())
        });
        let stdout = spawn_reader("stdout", child.stdout.take());
        let stderr = spawn_reader("stderr", child.stderr.take());

        self.io = Some(SessionIo {
            writer,
            stdout,
            stderr,
        });

        let mut slot = lock(&self.slot);
        if cfg!(unix) {
            slot.group = Some(child.id());
        }
        slot.child = Some(child);
        slot.state = SessionState::Running;
        if slot.cancel_requested {
            // cancelled while spawning
            slot.signal();
        }
        Ok(())
    }

    /// Block until the child exits and report the terminal outcome
    pub fn wait(&mut self) -> SessionOutcome {
        let Some(io) = self.io.take() else {
            let outcome = SessionOutcome::Failed {
                diagnostic: SessionError::NotStarted.to_string(),
                run: None,
            };
            self.set_state(outcome.state());
            return outcome;
        };

        let started = Instant::now();
        let waited = loop {
            {
                let mut slot = lock(&self.slot);
                if let Some(timeout) = self.config.timeout {
                    if !slot.cancel_requested && started.elapsed() >= timeout {
                        warn!("engine exceeded {:?}, cancelling", timeout);
                        slot.timed_out = true;
                        slot.request_cancel();
                    }
                }

                let cancelled = slot.cancel_requested;
                let polled = match slot.child.as_mut() {
                    Some(child) => child.try_wait(),
                    None => Err(io::Error::new(
                        io::ErrorKind::Other,
                        "engine process handle missing",
                    )),
                };
                match polled {
                    Ok(Some(status)) => {
                        slot.child = None;
                        slot.end_group();
                        break Ok((status, cancelled, slot.timed_out));
                    }
                    Ok(None) => {}
                    Err(err) => {
                        slot.signal();
                        if let Some(mut child) = slot.child.take() {
                            let _ = child.wait();
                        }
                        slot.end_group();
                        break Err((err, cancelled, slot.timed_out));
                    }
                }
            }
            thread::sleep(POLL_INTERVAL);
        };

        let input_error = match io.writer.join() {
            Ok(Ok(())) => None,
            Ok(Err(err)) if err.kind() == io::ErrorKind::BrokenPipe => {
                debug!("engine closed its input early");
                None
            }
            Ok(Err(err)) => Some(err),
            Err(_) => Some(io::Error::new(
                io::ErrorKind::Other,
                "input writer thread panicked",
            )),
        };
        let stdout = io.stdout.join().unwrap_or_default();
        let stderr = io.stderr.join().unwrap_or_default();

        let outcome = match waited {
            Ok((status, cancelled, timed_out)) => {
                let run = EngineRun {
                    exit_code: status.code(),
                    stdout,
                    stderr,
                };
                if cancelled {
                    SessionOutcome::Cancelled {
                        timed_out,
                        run: Some(run),
                    }
                } else if let Some(err) = input_error {
                    SessionOutcome::Failed {
                        diagnostic: SessionError::Input(err).to_string(),
                        run: Some(run),
                    }
                } else if status.success() {
                    SessionOutcome::Completed(run)
                } else {
                    SessionOutcome::Failed {
                        diagnostic: exit_diagnostic(status, &run.stderr),
                        run: Some(run),
                    }
                }
            }
            Err((err, cancelled, timed_out)) => {
                let run = Some(EngineRun {
                    exit_code: None,
                    stdout,
                    stderr,
                });
                if cancelled {
                    SessionOutcome::Cancelled { timed_out, run }
                } else {
                    SessionOutcome::Failed {
                        diagnostic: SessionError::Wait(err).to_string(),
                        run,
                    }
                }
            }
        };

        info!(
            "engine session finished: {:?} after {:?}",
            outcome.state(),
            started.elapsed()
        );
        self.set_state(outcome.state());
        outcome
    }

    /// Start and wait; launch failures become a `Failed` outcome
    pub fn run(mut self, input: &str) -> SessionOutcome {
        match self.start(input) {
            Ok(()) => self.wait(),
            Err(err) => {
                warn!("{}", err);
                let cancelled = lock(&self.slot).cancel_requested;
                let outcome = if cancelled {
                    SessionOutcome::Cancelled {
                        timed_out: false,
                        run: None,
                    }
                } else {
                    SessionOutcome::Failed {
                        diagnostic: err.to_string(),
                        run: None,
                    }
                };
                self.set_state(outcome.state());
                outcome
            }
        }
    }
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        let mut slot = lock(&self.slot);
        if let Some(mut child) = slot.child.take() {
            warn!("dropping live engine session, killing pid {}", child.id());
            let _ = child.kill();
            // SIGKILL cannot be ignored, so this returns promptly
            let _ = child.wait();
            slot.state = SessionState::Cancelled;
        }
        slot.end_group();
    }
}

fn spawn_reader<R>(name: &'static str, pipe: Option<R>) -> JoinHandle<String>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            if let Err(err) = pipe.read_to_end(&mut buf) {
                warn!("reading engine {} failed: {}", name, err);
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn exit_diagnostic(status: ExitStatus, stderr: &str) -> String {
    let head = match status.code() {
        Some(code) => format!("engine exited with code {}", code),
        None => "engine was terminated by a signal".to_string(),
    };
    let stderr = stderr.trim();
    if stderr.is_empty() {
        head
    } else {
        format!("{}: {}", head, stderr)
    }
}
