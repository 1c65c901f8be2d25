//! Runtime records of spawned pipelines and background reaping.

use std::collections::BTreeSet;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::process::{Child, ExitStatus};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

/// Shell-style status code: the exit code, or 128 plus the signal number.
pub fn status_code(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(1)
}

/// One stage of a job.
#[derive(Debug)]
pub struct Process {
    child: Option<Child>,
    pid: Option<u32>,
    status: Option<i32>,
}

impl Process {
    pub fn running(child: Child) -> Process {
        let pid = child.id();
        Process {
            child: Some(child),
            pid: Some(pid),
            status: None,
        }
    }

    /// A stage that never started, e.g. because its program was not found.
    pub fn failed(status: i32) -> Process {
        Process {
            child: None,
            pid: None,
            status: Some(status),
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn status(&self) -> Option<i32> {
        self.status
    }

    fn wait(&mut self) -> io::Result<()> {
        if let Some(child) = self.child.as_mut() {
            let status = status_code(child.wait()?);
            debug!(pid = child.id(), status, "reaped");
            self.status = Some(status);
            self.child = None;
        }
        Ok(())
    }

    fn kill(&mut self) {
        if let Some(child) = self.child.as_mut() {
            if let Err(e) = child.kill() {
                warn!(pid = child.id(), "cannot kill abandoned stage: {e}");
            }
        }
    }
}

/// The processes of one spawned pipeline, in stage order.
#[derive(Debug)]
pub struct Job {
    pub stages: Vec<Process>,
    pub background: bool,
    pub description: String,
}

impl Job {
    pub fn new(description: String, background: bool) -> Job {
        Job {
            stages: Vec::new(),
            background,
            description,
        }
    }

    /// Process ids of the stages that were started.
    pub fn pids(&self) -> Vec<u32> {
        self.stages.iter().filter_map(Process::pid).collect()
    }

    /// Waits for every started stage to terminate. A failed wait does not stop
    /// the later stages from being waited for; the first error is returned.
    pub fn wait(&mut self) -> io::Result<()> {
        let mut first_error = None;
        for stage in &mut self.stages {
            if let Err(e) = stage.wait() {
                warn!(pid = ?stage.pid(), "wait failed: {e}");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Kills every started stage and reaps it.
    pub fn abandon(&mut self) {
        for stage in &mut self.stages {
            stage.kill();
        }
        if let Err(e) = self.wait() {
            warn!("cannot reap abandoned pipeline: {e}");
        }
    }

    /// Status of the last stage, once known.
    pub fn status(&self) -> Option<i32> {
        self.stages.last().and_then(Process::status)
    }
}

/// A background job that has terminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finished {
    pub number: usize,
    pub description: String,
    pub status: i32,
}

/// Background jobs still running.
///
/// Each job is handed to its own collector thread, which waits for all of its
/// stages so no terminated child stays a zombie.
pub struct JobTable {
    active: BTreeSet<usize>,
    sender: Sender<Finished>,
    receiver: Receiver<Finished>,
}

impl JobTable {
    pub fn new() -> JobTable {
        let (sender, receiver) = mpsc::channel();
        JobTable {
            active: BTreeSet::new(),
            sender,
            receiver,
        }
    }

    /// Takes ownership of a background job and returns its job number.
    pub fn register(&mut self, mut job: Job) -> usize {
        let number = (1..)
            .find(|n| !self.active.contains(n))
            .unwrap_or(self.active.len() + 1);
        self.active.insert(number);

        let sender = self.sender.clone();
        thread::spawn(move || {
            if let Err(e) = job.wait() {
                warn!(job = number, "cannot wait for background job: {e}");
            }
            let status = job.status().unwrap_or(1);
            let finished = Finished {
                number,
                description: job.description,
                status,
            };
            // The table may already be gone when the shell is exiting.
            let _ = sender.send(finished);
        });
        number
    }

    /// Background jobs that terminated since the last call.
    pub fn finished(&mut self) -> Vec<Finished> {
        let finished: Vec<Finished> = self.receiver.try_iter().collect();
        for job in &finished {
            self.active.remove(&job.number);
        }
        finished
    }

    /// Blocks until at least one job finishes or `timeout` passes.
    pub fn wait_finished(&mut self, timeout: Duration) -> Vec<Finished> {
        let mut finished = Vec::new();
        if let Ok(job) = self.receiver.recv_timeout(timeout) {
            self.active.remove(&job.number);
            finished.push(job);
        }
        finished.extend(self.finished());
        finished
    }

    /// Number of background jobs not yet reported as finished.
    pub fn active(&self) -> usize {
        self.active.len()
    }
}

impl Default for JobTable {
    fn default() -> Self {
        JobTable::new()
    }
}
