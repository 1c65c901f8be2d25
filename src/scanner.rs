//! Scanner for the command line parser.

use std::str::Chars;

use crate::error::ScanError;

/// A token type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenTag {
    /// The end of the command text.
    EndOfCommand,

    /// A bare or quoted word.
    Word,

    /// `|`
    Pipe,

    /// `<`
    RedirectIn,

    /// `>`
    RedirectOut,

    /// `>>`
    RedirectAppend,

    /// `&`
    Background,
}

impl TokenTag {
    /// The operator text for an operator tag.
    pub fn operator(self) -> Option<&'static str> {
        match self {
            TokenTag::Pipe => Some("|"),
            TokenTag::RedirectIn => Some("<"),
            TokenTag::RedirectOut => Some(">"),
            TokenTag::RedirectAppend => Some(">>"),
            TokenTag::Background => Some("&"),
            TokenTag::Word | TokenTag::EndOfCommand => None,
        }
    }
}

/// A token in a command text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    /// Tags what kind of token this is.
    pub tag: TokenTag,

    /// The token's text.
    pub lexeme: String,
}

impl Token {
    fn new(tag: TokenTag, lexeme: String) -> Token {
        Token { tag, lexeme }
    }

    /// Creates a word token, even if its text looks like an operator.
    pub fn word(lexeme: impl Into<String>) -> Token {
        Token::new(TokenTag::Word, lexeme.into())
    }

    fn operator(tag: TokenTag) -> Token {
        let lexeme = tag.operator().unwrap_or_default();
        Token::new(tag, String::from(lexeme))
    }
}

/// Classifies a bare string the way an unquoted token is classified.
impl From<&str> for Token {
    fn from(text: &str) -> Token {
        match text {
            "|" => Token::operator(TokenTag::Pipe),
            "<" => Token::operator(TokenTag::RedirectIn),
            ">" => Token::operator(TokenTag::RedirectOut),
            ">>" => Token::operator(TokenTag::RedirectAppend),
            "&" => Token::operator(TokenTag::Background),
            _ => Token::word(text),
        }
    }
}

/// Possible states when scanning a word token.
#[derive(Clone, Copy)]
enum WordState {
    /// Normal state.
    Normal,

    /// Inside single quoted text.
    InSingleQuote,

    /// Inside double quoted text.
    InDoubleQuote,
}

/// Converts a command's text into a stream of tokens.
pub struct Scanner<'a> {
    /// An iterator over the command text.
    chars: Chars<'a>,

    /// Current value from command text being considered.
    current: Option<char>,
}

impl<'a> Scanner<'a> {
    /// Creates a scanner for a given command text.
    pub fn new(command_text: &'a str) -> Scanner<'a> {
        let mut scanner = Scanner {
            chars: command_text.chars(),
            current: None,
        };
        scanner.advance();
        scanner
    }

    /// Returns the next token in the command text.
    pub fn next_token(&mut self) -> Result<Token, ScanError> {
        self.skip_whitespace();

        let token = match self.current {
            None => Token::new(TokenTag::EndOfCommand, String::new()),
            Some('|') => {
                self.advance();
                Token::operator(TokenTag::Pipe)
            }
            Some('<') => {
                self.advance();
                Token::operator(TokenTag::RedirectIn)
            }
            Some('>') => {
                self.advance();
                if self.current == Some('>') {
                    self.advance();
                    Token::operator(TokenTag::RedirectAppend)
                } else {
                    Token::operator(TokenTag::RedirectOut)
                }
            }
            Some('&') => {
                self.advance();
                Token::operator(TokenTag::Background)
            }
            Some(_) => {
                let lexeme = self.word()?;
                Token::word(lexeme)
            }
        };

        Ok(token)
    }

    /// Scans a possibly quoted word.
    fn word(&mut self) -> Result<String, ScanError> {
        use WordState::*;

        let mut state = Normal;
        let mut s = String::new();

        loop {
            match (self.current, state) {
                (Some('\''), Normal) => {
                    state = InSingleQuote;
                    self.advance();
                }

                (Some('\''), InSingleQuote) => {
                    state = Normal;
                    self.advance();
                }

                (Some('"'), Normal) => {
                    state = InDoubleQuote;
                    self.advance();
                }

                (Some('"'), InDoubleQuote) => {
                    state = Normal;
                    self.advance();
                }

                (Some(c), Normal) if is_whitespace(c) || is_operator(c) => {
                    break;
                }

                (Some(c), _) => {
                    s.push(c);
                    self.advance();
                }

                (None, Normal) => break,

                (None, InSingleQuote) => {
                    return Err(ScanError::UnclosedQuote { quote: "single" });
                }

                (None, InDoubleQuote) => {
                    return Err(ScanError::UnclosedQuote { quote: "double" });
                }
            }
        }

        Ok(s)
    }

    /// Advances the scanner past any whitespace.
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current {
            if !is_whitespace(c) {
                break;
            }
            self.advance();
        }
    }

    /// Advances `current` to the next character in command text.
    fn advance(&mut self) {
        self.current = self.chars.next();
    }
}

/// Splits a whole command line into tokens, without the end marker.
pub fn tokenize(command_text: &str) -> Result<Vec<Token>, ScanError> {
    let mut scanner = Scanner::new(command_text);
    let mut tokens = Vec::new();
    loop {
        let token = scanner.next_token()?;
        if token.tag == TokenTag::EndOfCommand {
            return Ok(tokens);
        }
        tokens.push(token);
    }
}

/// Determines if the given character is whitespace.
pub(crate) fn is_whitespace(c: char) -> bool {
    c == ' ' || c == '\t' || c == '\r' || c == '\n'
}

/// Determines if the given character starts an operator token.
fn is_operator(c: char) -> bool {
    matches!(c, '|' | '<' | '>' | '&')
}
