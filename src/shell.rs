//! The read-execute loop.

use std::io::{self, BufRead, Write};

use rustyline::error::ReadlineError;
use rustyline::history::FileHistory;
use rustyline::Editor;
use tracing::debug;

use crate::config::Config;
use crate::editing::{create_editor, ShellHelper};
use crate::eval_result::ExecResult;
use crate::exec::Executor;
use crate::history::History;
use crate::parser::parse;
use crate::system::get_path;

/// Somewhere command lines come from.
pub trait LineSource {
    /// Reads one line, showing `prompt` if the source is interactive.
    /// Returns `None` at end of input.
    fn read_line(&mut self, prompt: &str) -> anyhow::Result<Option<String>>;

    /// Offers an executed line to the source's own recall mechanism.
    fn add_history(&mut self, _line: &str) {}

    /// Whether a person is typing the lines.
    fn is_interactive(&self) -> bool {
        false
    }
}

/// Interactive line editing on the terminal.
pub struct EditorSource {
    editor: Editor<ShellHelper, FileHistory>,
}

impl EditorSource {
    pub fn new() -> anyhow::Result<EditorSource> {
        let editor = create_editor(get_path())?;
        Ok(EditorSource { editor })
    }
}

impl LineSource for EditorSource {
    fn read_line(&mut self, prompt: &str) -> anyhow::Result<Option<String>> {
        loop {
            match self.editor.readline(prompt) {
                Ok(line) => return Ok(Some(line)),
                // ^C discards the line being typed.
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => return Ok(None),
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn add_history(&mut self, line: &str) {
        let _ = self.editor.add_history_entry(line);
    }

    fn is_interactive(&self) -> bool {
        true
    }
}

/// Lines from a script or pipe, without prompts.
pub struct ReaderSource<R> {
    reader: R,
}

impl<R: BufRead> ReaderSource<R> {
    pub fn new(reader: R) -> ReaderSource<R> {
        ReaderSource { reader }
    }
}

impl<R: BufRead> LineSource for ReaderSource<R> {
    fn read_line(&mut self, _prompt: &str) -> anyhow::Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}

/// One shell session.
pub struct Shell {
    config: Config,
    history: History,
    executor: Executor,
}

impl Shell {
    pub fn new(config: Config) -> Shell {
        let history = History::new(config.history_size);
        Shell {
            config,
            history,
            executor: Executor::new(),
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Status of the last foreground command.
    pub fn last_status(&self) -> i32 {
        self.executor.last_status()
    }

    /// Reads and runs lines until `exit` or end of input.
    pub fn run(&mut self, source: &mut dyn LineSource) -> anyhow::Result<()> {
        loop {
            self.report_finished_jobs();
            let Some(line) = source.read_line(&self.config.prompt)? else {
                if source.is_interactive() {
                    let mut stdout = io::stdout();
                    let _ = writeln!(stdout, "\nShell exited.");
                    let _ = stdout.flush();
                }
                return Ok(());
            };
            let result = self.execute_line_with(&line, source);
            if result == ExecResult::Exit {
                return Ok(());
            }
        }
    }

    /// Runs one command line.
    pub fn execute_line(&mut self, line: &str) -> ExecResult {
        self.execute_line_with(line, &mut NoRecall)
    }

    fn execute_line_with(&mut self, line: &str, source: &mut dyn LineSource) -> ExecResult {
        if line.trim().is_empty() {
            return ExecResult::Continue;
        }
        let line = match self.history.expand(line) {
            Ok(line) => line,
            Err(e) => {
                eprintln!("{e}");
                return ExecResult::Continue;
            }
        };
        let line = line.trim();
        self.history.add(line);
        source.add_history(line);

        let pipeline = match parse(line) {
            Ok(Some(pipeline)) => pipeline,
            Ok(None) => return ExecResult::Continue,
            Err(e) => {
                debug!("rejected `{line}`: {e}");
                eprintln!("fcit: {e}");
                return ExecResult::Continue;
            }
        };
        self.executor.run(pipeline, &self.history)
    }

    /// Prints a notice for every background job that has terminated.
    fn report_finished_jobs(&mut self) {
        let mut stdout = io::stdout();
        for job in self.executor.finished_jobs() {
            let _ = writeln!(
                stdout,
                "[{}] Done ({}) {}",
                job.number, job.status, job.description
            );
        }
        let _ = stdout.flush();
    }
}

/// Stand-in source for lines that did not come from a reader.
struct NoRecall;

impl LineSource for NoRecall {
    fn read_line(&mut self, _prompt: &str) -> anyhow::Result<Option<String>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;

    #[test]
    fn reader_source_yields_lines() {
        let mut source = ReaderSource::new(Cursor::new("a\nb"));
        assert_eq!(source.read_line("> ").unwrap().as_deref(), Some("a\n"));
        assert_eq!(source.read_line("> ").unwrap().as_deref(), Some("b"));
        assert_eq!(source.read_line("> ").unwrap(), None);
        assert!(!source.is_interactive());
    }

    #[test]
    fn blank_lines_are_not_recorded() {
        let mut shell = Shell::new(Config::default());
        assert_eq!(shell.execute_line("   \n"), ExecResult::Continue);
        assert!(shell.history().is_empty());
    }

    #[test]
    fn recall_records_the_expanded_line() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let mut shell = Shell::new(Config::default());
        shell.execute_line(&format!("echo recalled >> {}\n", out.display()));
        shell.execute_line("!1");
        assert_eq!(fs::read_to_string(&out).unwrap(), "recalled\nrecalled\n");
        assert_eq!(shell.history().len(), 2);
        assert_eq!(shell.history().get(1), shell.history().get(2));
    }

    #[test]
    fn bad_recall_is_not_recorded() {
        let mut shell = Shell::new(Config::default());
        assert_eq!(shell.execute_line("!3"), ExecResult::Continue);
        assert!(shell.history().is_empty());
    }

    #[test]
    fn syntax_errors_are_recorded_but_not_run() {
        let mut shell = Shell::new(Config::default());
        assert_eq!(shell.execute_line("ls |"), ExecResult::Continue);
        assert_eq!(shell.history().get(1), Some("ls |"));
    }

    #[test]
    fn history_is_bounded_by_config() {
        let config = Config {
            history_size: 2,
            ..Config::default()
        };
        let mut shell = Shell::new(config);
        for line in ["true", "false", "true x"] {
            shell.execute_line(line);
        }
        assert_eq!(shell.history().len(), 2);
        assert_eq!(shell.history().get(1), Some("false"));
    }

    #[test]
    fn run_stops_at_exit() {
        let mut shell = Shell::new(Config::default());
        let mut source = ReaderSource::new(Cursor::new("false\nexit\ntrue\n"));
        shell.run(&mut source).unwrap();
        assert_eq!(shell.history().len(), 2);
        assert_eq!(shell.last_status(), 0);
    }
}
