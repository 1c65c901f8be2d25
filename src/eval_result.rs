//! Result types handed back from built-ins and the orchestrator.

/// What a built-in lookup did with a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuiltinOutcome {
    /// The command is not a built-in and must be spawned.
    NotBuiltin,

    /// The built-in ran (successfully or not); the shell keeps going.
    Handled,

    /// The built-in asked the shell to terminate.
    Exit,
}

/// Whether the read-execute loop should keep reading lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecResult {
    Continue,
    Exit,
}

impl From<BuiltinOutcome> for ExecResult {
    fn from(outcome: BuiltinOutcome) -> Self {
        match outcome {
            BuiltinOutcome::Exit => ExecResult::Exit,
            BuiltinOutcome::Handled | BuiltinOutcome::NotBuiltin => ExecResult::Continue,
        }
    }
}
