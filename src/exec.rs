//! Spawns compiled pipelines and waits for them.

use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::os::fd::OwnedFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::process::{self, Stdio};

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::unistd::pipe2;
use tracing::{debug, warn};

use crate::ast::{Command, OutputMode, OutputRedirect, Pipeline};
use crate::builtin::{try_builtin, BuiltIn, BuiltinContext};
use crate::error::SpawnError;
use crate::eval_result::ExecResult;
use crate::history::History;
use crate::job::{Finished, Job, JobTable, Process};

/// Status of a stage whose redirection could not be opened.
const REDIRECT_FAILED: i32 = 1;

/// Status of a stage whose program exists but cannot be executed.
const CANNOT_EXECUTE: i32 = 126;

/// Status of a stage whose program cannot be found.
const COMMAND_NOT_FOUND: i32 = 127;

/// Permissions of files created by `>` and `>>`.
const CREATE_MODE: u32 = 0o644;

/// Runs pipelines, one at a time, on behalf of the read-execute loop.
pub struct Executor {
    jobs: JobTable,
    last_status: i32,
}

impl Executor {
    pub fn new() -> Executor {
        Executor {
            jobs: JobTable::new(),
            last_status: 0,
        }
    }

    /// Status of the last foreground pipeline or built-in.
    pub fn last_status(&self) -> i32 {
        self.last_status
    }

    pub fn jobs(&mut self) -> &mut JobTable {
        &mut self.jobs
    }

    /// Background jobs that terminated since the last call.
    pub fn finished_jobs(&mut self) -> Vec<Finished> {
        self.jobs.finished()
    }

    /// Runs a pipeline.
    ///
    /// A lone built-in runs in this process. Anything else is spawned; a
    /// foreground pipeline is waited for, a background one is handed to the
    /// job table. Failures are reported and never end the shell; only the
    /// `exit` built-in does.
    pub fn run(&mut self, pipeline: Pipeline, history: &History) -> ExecResult {
        if let [command] = pipeline.commands.as_slice() {
            if BuiltIn::from_name(command.program()).is_some() {
                return self.run_builtin(command, history);
            }
        }

        let mut job = match spawn_pipeline(&pipeline) {
            Ok(job) => job,
            Err(e) => {
                warn!("pipeline abandoned: {e}");
                eprintln!("fcit: {e}");
                self.last_status = 1;
                return ExecResult::Continue;
            }
        };

        if pipeline.background {
            let pids: Vec<String> = job.pids().iter().map(u32::to_string).collect();
            let number = self.jobs.register(job);
            let mut stdout = io::stdout();
            let _ = writeln!(stdout, "[{number}] {}", pids.join(" "));
            let _ = stdout.flush();
        } else {
            if let Err(e) = job.wait() {
                warn!("wait failed: {e}");
                eprintln!("fcit: {e}");
            }
            self.last_status = job.status().unwrap_or(1);
            debug!(status = self.last_status, "foreground pipeline done");
        }
        ExecResult::Continue
    }

    /// Runs a single built-in with its redirections applied.
    fn run_builtin(&mut self, command: &Command, history: &History) -> ExecResult {
        if let Some(path) = &command.input {
            if let Err(e) = File::open(path) {
                report_redirect(path, &e);
                self.last_status = REDIRECT_FAILED;
                return ExecResult::Continue;
            }
        }
        let mut stdout: Box<dyn Write> = match &command.output {
            None => Box::new(io::stdout()),
            Some(redirect) => match open_output(redirect) {
                Ok(file) => Box::new(file),
                Err(e) => {
                    report_redirect(&redirect.path, &e);
                    self.last_status = REDIRECT_FAILED;
                    return ExecResult::Continue;
                }
            },
        };
        let mut stderr = io::stderr();
        let mut ctx = BuiltinContext {
            stdout: &mut stdout,
            stderr: &mut stderr,
            history,
            status: 0,
        };
        let outcome = try_builtin(command, &mut ctx);
        self.last_status = ctx.status;
        outcome.into()
    }
}

impl Default for Executor {
    fn default() -> Self {
        Executor::new()
    }
}

/// The pipes joining consecutive stages. Pipe `i` carries stage `i`'s output
/// to stage `i + 1`. Ends not handed to a stage are closed on drop.
struct Pipes {
    reads: Vec<Option<OwnedFd>>,
    writes: Vec<Option<OwnedFd>>,
}

impl Pipes {
    /// Creates `count` pipes. Both ends are close-on-exec, so a child only
    /// keeps the ends that were bound to its standard streams.
    fn open(count: usize) -> nix::Result<Pipes> {
        let mut reads = Vec::with_capacity(count);
        let mut writes = Vec::with_capacity(count);
        for _ in 0..count {
            let (read, write) = pipe2(OFlag::O_CLOEXEC)?;
            reads.push(Some(read));
            writes.push(Some(write));
        }
        Ok(Pipes { reads, writes })
    }

    fn take_read(&mut self, index: usize) -> Option<OwnedFd> {
        self.reads.get_mut(index).and_then(Option::take)
    }

    fn take_write(&mut self, index: usize) -> Option<OwnedFd> {
        self.writes.get_mut(index).and_then(Option::take)
    }
}

/// Starts one process per stage, wired through pipes.
///
/// A stage whose redirection cannot be opened or whose program cannot be
/// loaded is reported and recorded with a failed status; the other stages
/// still run. If process creation itself fails, the stages started so far are
/// killed and reaped and the error is returned. Every pipe end held by this
/// process is closed before returning.
pub fn spawn_pipeline(pipeline: &Pipeline) -> Result<Job, SpawnError> {
    spawn_pipeline_with(pipeline, spawn_stage)
}

/// [`spawn_pipeline`] with the per-stage start-up supplied by the caller.
pub fn spawn_pipeline_with<F>(pipeline: &Pipeline, mut spawn: F) -> Result<Job, SpawnError>
where
    F: FnMut(&Command, Option<OwnedFd>, Option<OwnedFd>) -> Result<Process, SpawnError>,
{
    let stages = pipeline.commands.len();
    let mut pipes = Pipes::open(stages.saturating_sub(1))?;
    let mut job = Job::new(pipeline.to_string(), pipeline.background);

    // Children share our stdout; anything still buffered must come first.
    let _ = io::stdout().flush();

    for (i, command) in pipeline.commands.iter().enumerate() {
        let pipe_in = if i > 0 { pipes.take_read(i - 1) } else { None };
        let pipe_out = if i + 1 < stages { pipes.take_write(i) } else { None };
        match spawn(command, pipe_in, pipe_out) {
            Ok(process) => job.stages.push(process),
            Err(e) => {
                drop(pipes);
                job.abandon();
                return Err(e);
            }
        }
    }
    Ok(job)
}

/// Starts a single stage. An explicit redirection takes precedence over the
/// pipe end offered for the same stream; the unused pipe end is closed.
pub fn spawn_stage(
    command: &Command,
    pipe_in: Option<OwnedFd>,
    pipe_out: Option<OwnedFd>,
) -> Result<Process, SpawnError> {
    let stdin = match &command.input {
        Some(path) => match File::open(path) {
            Ok(file) => Stdio::from(file),
            Err(e) => {
                report_redirect(path, &e);
                return Ok(Process::failed(REDIRECT_FAILED));
            }
        },
        None => pipe_in.map_or_else(Stdio::inherit, Stdio::from),
    };
    let stdout = match &command.output {
        Some(redirect) => match open_output(redirect) {
            Ok(file) => Stdio::from(file),
            Err(e) => {
                report_redirect(&redirect.path, &e);
                return Ok(Process::failed(REDIRECT_FAILED));
            }
        },
        None => pipe_out.map_or_else(Stdio::inherit, Stdio::from),
    };

    let program = command.program();
    let spawned = process::Command::new(program)
        .args(&command.args[1..])
        .stdin(stdin)
        .stdout(stdout)
        .stderr(Stdio::inherit())
        .spawn();
    match spawned {
        Ok(child) => {
            debug!(pid = child.id(), stage = command.index, "spawned `{command}`");
            Ok(Process::running(child))
        }
        Err(e) => match load_failure_status(&e) {
            Some(status) => {
                if status == COMMAND_NOT_FOUND {
                    eprintln!("{program}: command not found");
                } else {
                    eprintln!("{program}: {e}");
                }
                Ok(Process::failed(status))
            }
            None => Err(SpawnError::Spawn {
                program: program.to_string(),
                source: e,
            }),
        },
    }
}

/// The status for errors that mean the program image could not be loaded.
/// `None` for the few errors where the process itself could not be created.
fn load_failure_status(e: &io::Error) -> Option<i32> {
    if let Some(errno) = e.raw_os_error().map(Errno::from_raw) {
        if matches!(errno, Errno::EAGAIN | Errno::ENOMEM) {
            return None;
        }
    }
    match e.kind() {
        ErrorKind::WouldBlock | ErrorKind::OutOfMemory => None,
        ErrorKind::NotFound | ErrorKind::InvalidInput => Some(COMMAND_NOT_FOUND),
        _ => Some(CANNOT_EXECUTE),
    }
}

fn open_output(redirect: &OutputRedirect) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).mode(CREATE_MODE);
    match redirect.mode {
        OutputMode::Truncate => options.truncate(true),
        OutputMode::Append => options.append(true),
    };
    options.open(&redirect.path)
}

fn report_redirect(path: &Path, e: &io::Error) {
    eprintln!("fcit: {}: {e}", path.display());
}
