//! Abstract syntax tree types for a command line.

use std::fmt;
use std::path::PathBuf;

/// A chain of commands connected by pipes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pipeline {
    /// The stages, in order. Never empty.
    pub commands: Vec<Command>,

    /// Whether the line ended with `&`.
    pub background: bool,
}

/// One stage of a pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    /// Program name followed by its arguments. Never empty.
    pub args: Vec<String>,

    /// File bound to standard input by `<`.
    pub input: Option<PathBuf>,

    /// File bound to standard output by `>` or `>>`.
    pub output: Option<OutputRedirect>,

    /// Position of this stage in its pipeline.
    pub index: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputRedirect {
    pub path: PathBuf,
    pub mode: OutputMode,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputMode {
    /// `>`
    Truncate,

    /// `>>`
    Append,
}

impl Command {
    /// The program name.
    pub fn program(&self) -> &str {
        self.args.first().map(String::as_str).unwrap_or_default()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.args.join(" "))?;
        if let Some(input) = &self.input {
            write!(f, " < {}", input.display())?;
        }
        if let Some(output) = &self.output {
            let operator = match output.mode {
                OutputMode::Truncate => ">",
                OutputMode::Append => ">>",
            };
            write!(f, " {operator} {}", output.path.display())?;
        }
        Ok(())
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, command) in self.commands.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{command}")?;
        }
        if self.background {
            write!(f, " &")?;
        }
        Ok(())
    }
}
