//! Error types for each stage of reading, compiling and running a command
//! line.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// An error while splitting a command line into tokens.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScanError {
    #[error("unclosed {quote} quote")]
    UnclosedQuote { quote: &'static str },
}

/// An error while turning tokens into a pipeline.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompileError {
    /// A `<`, `>` or `>>` operator was not followed by a path.
    #[error("syntax error: `{operator}` needs a file name")]
    MissingRedirectTarget { operator: &'static str },

    /// A pipeline stage has no program name.
    #[error("syntax error: empty command in pipeline stage {stage}")]
    EmptyStage { stage: usize },

    /// `&` was used anywhere but at the end of the line.
    #[error("syntax error: `&` is only allowed at the end of a line")]
    MisplacedBackground,
}

/// An error raised by a built-in command. The shell keeps running.
#[derive(Debug, Error)]
pub enum BuiltinError {
    #[error("cd: HOME not set")]
    HomeNotSet,

    #[error("cd: too many arguments")]
    TooManyArguments,

    #[error("cd: {}: No such file or directory", path.display())]
    NoSuchDirectory { path: PathBuf },

    #[error("{name}: {source}")]
    Io {
        name: &'static str,
        #[source]
        source: io::Error,
    },
}

/// The process-creation primitive itself failed; the pipeline is abandoned.
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("cannot create pipe: {0}")]
    Pipe(#[from] nix::Error),

    #[error("cannot start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// An error while loading the shell configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {message}")]
    Invalid { message: String },
}
