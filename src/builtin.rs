//! Commands that run inside the shell process.

use std::io::Write;
use std::path::PathBuf;

use crate::ast::Command;
use crate::error::BuiltinError;
use crate::eval_result::BuiltinOutcome;
use crate::history::History;
use crate::system::{change_directory, home_directory};

const HELP: &str = "\
FCIT Shell built-ins:
  cd [dir]   change directory (HOME when omitted)
  pwd        print the working directory
  echo args  print the arguments
  history    list recent commands; `!n` re-runs entry n
  help       show this message
  exit       exit the shell
Operators: `a | b` pipe, `< file` input, `> file` output, `>> file` append,
           trailing `&` runs in the background.
";

/// Where a built-in writes and what it can see.
pub struct BuiltinContext<'a> {
    pub stdout: &'a mut dyn Write,
    pub stderr: &'a mut dyn Write,
    pub history: &'a History,

    /// Exit status of the last built-in run with this context.
    pub status: i32,
}

/// A shell built-in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuiltIn {
    /// Changes the working directory to a given path.
    Cd,

    /// Echos back user input.
    Echo,

    /// Exits the shell.
    Exit,

    /// Prints a usage summary.
    Help,

    /// Prints the command history.
    History,

    /// Prints the working directory.
    Pwd,
}

impl BuiltIn {
    pub const ALL: [BuiltIn; 6] = [
        BuiltIn::Cd,
        BuiltIn::Echo,
        BuiltIn::Exit,
        BuiltIn::Help,
        BuiltIn::History,
        BuiltIn::Pwd,
    ];

    pub fn from_name(name: &str) -> Option<BuiltIn> {
        BuiltIn::ALL.into_iter().find(|b| b.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            BuiltIn::Cd => "cd",
            BuiltIn::Echo => "echo",
            BuiltIn::Exit => "exit",
            BuiltIn::Help => "help",
            BuiltIn::History => "history",
            BuiltIn::Pwd => "pwd",
        }
    }

    /// Runs the built-in with `args` (program name excluded).
    pub fn execute(
        self,
        args: &[String],
        ctx: &mut BuiltinContext<'_>,
    ) -> Result<BuiltinOutcome, BuiltinError> {
        let io_error = |source| BuiltinError::Io {
            name: self.name(),
            source,
        };
        match self {
            BuiltIn::Cd => {
                let target = match args {
                    [] => home_directory().ok_or(BuiltinError::HomeNotSet)?,
                    [path] if path == "~" => home_directory().ok_or(BuiltinError::HomeNotSet)?,
                    [path] => PathBuf::from(path),
                    _ => return Err(BuiltinError::TooManyArguments),
                };
                change_directory(&target)?;
            }
            BuiltIn::Echo => {
                writeln!(ctx.stdout, "{}", args.join(" ")).map_err(io_error)?;
            }
            BuiltIn::Exit => {
                writeln!(ctx.stdout, "Shell exited.").map_err(io_error)?;
                return Ok(BuiltinOutcome::Exit);
            }
            BuiltIn::Help => {
                write!(ctx.stdout, "{HELP}").map_err(io_error)?;
            }
            BuiltIn::History => {
                ctx.history.print(ctx.stdout).map_err(io_error)?;
            }
            BuiltIn::Pwd => {
                let current_dir = std::env::current_dir().map_err(io_error)?;
                writeln!(ctx.stdout, "{}", current_dir.display()).map_err(io_error)?;
            }
        }
        ctx.stdout.flush().map_err(io_error)?;
        Ok(BuiltinOutcome::Handled)
    }
}

/// Runs `command` in-process if it names a built-in.
///
/// A failing built-in reports on the context's error stream and still counts
/// as handled.
pub fn try_builtin(command: &Command, ctx: &mut BuiltinContext<'_>) -> BuiltinOutcome {
    let Some(builtin) = BuiltIn::from_name(command.program()) else {
        return BuiltinOutcome::NotBuiltin;
    };
    match builtin.execute(&command.args[1..], ctx) {
        Ok(outcome) => {
            ctx.status = 0;
            outcome
        }
        Err(e) => {
            let _ = writeln!(ctx.stderr, "{e}");
            ctx.status = 1;
            BuiltinOutcome::Handled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(args: &[&str]) -> Command {
        Command {
            args: args.iter().map(|s| s.to_string()).collect(),
            input: None,
            output: None,
            index: 0,
        }
    }

    /// Runs a command against a fresh history and returns (outcome, stdout, stderr).
    fn run(args: &[&str], history: &History) -> (BuiltinOutcome, String, String) {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let outcome = {
            let mut ctx = BuiltinContext {
                stdout: &mut stdout,
                stderr: &mut stderr,
                history,
                status: 0,
            };
            try_builtin(&command(args), &mut ctx)
        };
        (
            outcome,
            String::from_utf8(stdout).unwrap(),
            String::from_utf8(stderr).unwrap(),
        )
    }

    #[test]
    fn names_round_trip() {
        for builtin in BuiltIn::ALL {
            assert_eq!(BuiltIn::from_name(builtin.name()), Some(builtin));
        }
        assert_eq!(BuiltIn::from_name("ls"), None);
    }

    #[test]
    fn unknown_is_not_builtin() {
        let (outcome, out, err) = run(&["ls", "-l"], &History::default());
        assert_eq!(outcome, BuiltinOutcome::NotBuiltin);
        assert!(out.is_empty() && err.is_empty());
    }

    #[test]
    fn echo_joins_arguments() {
        let (outcome, out, _) = run(&["echo", "hello", "big", "world"], &History::default());
        assert_eq!(outcome, BuiltinOutcome::Handled);
        assert_eq!(out, "hello big world\n");

        let (_, out, _) = run(&["echo"], &History::default());
        assert_eq!(out, "\n");
    }

    #[test]
    fn exit_requests_exit() {
        let (outcome, out, _) = run(&["exit"], &History::default());
        assert_eq!(outcome, BuiltinOutcome::Exit);
        assert_eq!(out, "Shell exited.\n");
    }

    #[test]
    fn help_lists_builtins() {
        let (outcome, out, _) = run(&["help"], &History::default());
        assert_eq!(outcome, BuiltinOutcome::Handled);
        for builtin in BuiltIn::ALL {
            assert!(out.contains(builtin.name()), "help misses {}", builtin.name());
        }
    }

    #[test]
    fn history_prints_entries() {
        let mut history = History::default();
        history.add("echo one");
        history.add("history");
        let (_, out, _) = run(&["history"], &history);
        assert_eq!(out, "1 echo one\n2 history\n");
    }

    #[test]
    fn pwd_prints_a_directory() {
        let (outcome, out, _) = run(&["pwd"], &History::default());
        assert_eq!(outcome, BuiltinOutcome::Handled);
        assert!(out.starts_with('/'));
        assert!(out.ends_with('\n'));
    }

    #[test]
    fn cd_errors_keep_the_shell_running() {
        let (outcome, _, err) = run(&["cd", "/definitely/not/here"], &History::default());
        assert_eq!(outcome, BuiltinOutcome::Handled);
        assert_eq!(err, "cd: /definitely/not/here: No such file or directory\n");

        let (outcome, _, err) = run(&["cd", "a", "b"], &History::default());
        assert_eq!(outcome, BuiltinOutcome::Handled);
        assert_eq!(err, "cd: too many arguments\n");
    }
}
