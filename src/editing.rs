//! Module used to handle rustyline library.

use rustyline::completion::Candidate;
use rustyline::history::FileHistory;
use rustyline::{
    Completer, CompletionType, Config, Context, Editor, Helper, Highlighter, Hinter, Validator,
};
use std::path::PathBuf;

use crate::builtin::BuiltIn;
use crate::scanner::is_whitespace;
use crate::system::*;

pub fn create_editor(paths: Vec<PathBuf>) -> anyhow::Result<Editor<ShellHelper, FileHistory>> {
    let completer = ShellCompleter::new(paths);
    let helper = ShellHelper::new(completer);
    let config = Config::builder()
        .completion_type(CompletionType::List)
        .auto_add_history(false)
        .build();
    let mut editor = Editor::with_config(config)?;
    editor.set_helper(Some(helper));
    Ok(editor)
}

#[derive(Helper, Completer, Hinter, Highlighter, Validator)]
pub struct ShellHelper {
    #[rustyline(Completer)]
    completer: ShellCompleter,
}

impl ShellHelper {
    fn new(completer: ShellCompleter) -> Self {
        Self { completer }
    }
}

/// Completes program names: built-ins and executables on `PATH`.
pub struct ShellCompleter {
    paths: Vec<PathBuf>,
}

impl ShellCompleter {
    fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }
}

/// The partial program name under the cursor, if the cursor is in the first
/// word of a pipeline stage. Words are split the way the scanner splits
/// them, on ASCII separators only.
fn program_prefix(line: &str) -> Option<&str> {
    let start = line
        .rfind(|c: char| is_whitespace(c) || c == '|')
        .map_or(0, |i| i + 1);
    let before = line[..start].trim_end();
    if before.is_empty() || before.ends_with('|') {
        Some(&line[start..])
    } else {
        None
    }
}

impl rustyline::completion::Completer for ShellCompleter {
    type Candidate = ShellCompletionCandidate;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<ShellCompletionCandidate>)> {
        let Some(prefix) = program_prefix(&line[..pos]) else {
            return Ok((pos, Vec::new()));
        };

        let trie = {
            let mut trie_builder = trie_builder_with_path_executables(&self.paths);

            for builtin in BuiltIn::ALL {
                trie_builder.push(builtin.name());
            }

            trie_builder.build()
        };

        let mut completions: Vec<ShellCompletionCandidate> = trie
            .postfix_search(prefix)
            .map(|completion: String| ShellCompletionCandidate::new(prefix, completion))
            .collect();
        completions.sort_by(|a, b| a.display.cmp(&b.display));
        completions.dedup_by(|a, b| a.display == b.display);

        Ok((pos, completions))
    }
}

pub struct ShellCompletionCandidate {
    display: String,
    replacement: String,
}

impl ShellCompletionCandidate {
    fn new(prefix: &str, completion: String) -> Self {
        let mut display = String::new();
        display.push_str(prefix);
        display.push_str(&completion);

        let mut replacement = completion;
        replacement.push(' ');

        Self {
            display,
            replacement,
        }
    }
}

impl Candidate for ShellCompletionCandidate {
    fn display(&self) -> &str {
        &self.display
    }

    fn replacement(&self) -> &str {
        &self.replacement
    }
}
