//! An interactive command interpreter.
//!
//! A line is split into tokens by the [`scanner`], compiled into a
//! [`ast::Pipeline`] by the [`parser`], and run by the [`exec::Executor`]:
//! a lone built-in runs in-process, everything else becomes one child process
//! per stage, connected by pipes, with optional `<`, `>`, `>>` redirections
//! and a trailing `&` for background jobs.

pub mod ast;
pub mod builtin;
pub mod config;
pub mod editing;
pub mod error;
pub mod eval_result;
pub mod exec;
pub mod history;
pub mod job;
pub mod logging;
pub mod parser;
pub mod scanner;
pub mod shell;
pub mod system;

pub use eval_result::{BuiltinOutcome, ExecResult};
pub use shell::Shell;
