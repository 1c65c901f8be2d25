//! Compiles a token stream into a [`Pipeline`].

use std::path::PathBuf;
use std::slice::Iter;

use tracing::debug;

use crate::{
    ast::{Command, OutputMode, OutputRedirect, Pipeline},
    error::CompileError,
    scanner::*,
};

/// Tracks and changes the state of the parser while it walks one stage.
struct ParserState<'a> {
    /// The tokens of the stage.
    tokens: Iter<'a, Token>,

    /// The stage being built.
    command: Command,
}

impl<'a> ParserState<'a> {
    /// Creates a parser for the tokens between two pipes.
    fn new(tokens: &'a [Token], index: usize) -> ParserState<'a> {
        let command = Command {
            args: Vec::new(),
            input: None,
            output: None,
            index,
        };
        ParserState {
            tokens: tokens.iter(),
            command,
        }
    }

    /// Consumes the path following a redirection operator. Operators are not
    /// valid paths.
    fn expect_target(&mut self, operator: TokenTag) -> Result<PathBuf, CompileError> {
        match self.tokens.next() {
            Some(token) if token.tag == TokenTag::Word => Ok(PathBuf::from(&token.lexeme)),
            _ => Err(CompileError::MissingRedirectTarget {
                operator: operator.operator().unwrap_or_default(),
            }),
        }
    }

    /// Walks every token of the stage and returns the finished command.
    fn stage(mut self) -> Result<Command, CompileError> {
        while let Some(token) = self.tokens.next() {
            match token.tag {
                TokenTag::Word => self.command.args.push(token.lexeme.clone()),
                TokenTag::RedirectIn => {
                    let path = self.expect_target(token.tag)?;
                    self.command.input = Some(path);
                }
                TokenTag::RedirectOut => {
                    let path = self.expect_target(token.tag)?;
                    self.command.output = Some(OutputRedirect {
                        path,
                        mode: OutputMode::Truncate,
                    });
                }
                TokenTag::RedirectAppend => {
                    let path = self.expect_target(token.tag)?;
                    self.command.output = Some(OutputRedirect {
                        path,
                        mode: OutputMode::Append,
                    });
                }
                TokenTag::Background => return Err(CompileError::MisplacedBackground),
                // Stages are already split on pipes, and the end marker is
                // never part of a token list.
                TokenTag::Pipe | TokenTag::EndOfCommand => {}
            }
        }

        if self.command.args.is_empty() {
            return Err(CompileError::EmptyStage {
                stage: self.command.index,
            });
        }
        Ok(self.command)
    }
}

/// Compiles tokens into a pipeline.
///
/// A trailing `&` marks the pipeline as background and is dropped. The rest
/// is split on `|`; each stage takes its `<`, `>` and `>>` operators (with
/// their paths) out of the argument vector. When a stage redirects the same
/// stream twice the later operator wins.
pub fn compile(tokens: &[Token]) -> Result<Pipeline, CompileError> {
    let (tokens, background) = match tokens.split_last() {
        Some((last, rest)) if last.tag == TokenTag::Background => (rest, true),
        _ => (tokens, false),
    };

    let commands = tokens
        .split(|token| token.tag == TokenTag::Pipe)
        .enumerate()
        .map(|(index, stage)| ParserState::new(stage, index).stage())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Pipeline {
        commands,
        background,
    })
}

/// Parses a given command text. Blank lines yield `None`.
pub fn parse(command_text: &str) -> anyhow::Result<Option<Pipeline>> {
    let tokens = tokenize(command_text)?;
    if tokens.is_empty() {
        return Ok(None);
    }
    let pipeline = compile(&tokens)?;
    debug!(stages = pipeline.commands.len(), background = pipeline.background, "compiled `{pipeline}`");
    Ok(Some(pipeline))
}
