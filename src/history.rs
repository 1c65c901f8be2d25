//! Bounded, numbered command history with `!n` recall.

use std::collections::VecDeque;
use std::io::{self, Write};

use thiserror::Error;

/// Default number of remembered commands.
pub const DEFAULT_CAPACITY: usize = 20;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecallError {
    #[error("Invalid history reference: {0}")]
    InvalidReference(String),

    #[error("No such history entry: {0}")]
    NoSuchEntry(usize),
}

/// The most recent commands, numbered from 1 (the oldest kept entry).
#[derive(Debug)]
pub struct History {
    entries: VecDeque<String>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> History {
        History {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Records a command line. Blank lines are ignored; the oldest entry is
    /// dropped once the history is full.
    pub fn add(&mut self, line: &str) {
        if line.trim().is_empty() || self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(line.to_string());
    }

    /// Returns entry `n`, counting from 1.
    pub fn get(&self, n: usize) -> Option<&str> {
        let index = n.checked_sub(1)?;
        self.entries.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes every entry as `<n> <line>`.
    pub fn print(&self, out: &mut dyn Write) -> io::Result<()> {
        for (i, line) in self.entries.iter().enumerate() {
            writeln!(out, "{} {}", i + 1, line)?;
        }
        Ok(())
    }

    /// Replaces a `!n` line with history entry `n`; other lines are returned
    /// unchanged.
    pub fn expand(&self, line: &str) -> Result<String, RecallError> {
        let trimmed = line.trim();
        let Some(reference) = trimmed.strip_prefix('!') else {
            return Ok(line.to_string());
        };
        let n = match reference.trim().parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => return Err(RecallError::InvalidReference(trimmed.to_string())),
        };
        self.get(n)
            .map(str::to_string)
            .ok_or(RecallError::NoSuchEntry(n))
    }
}

impl Default for History {
    fn default() -> Self {
        History::new(DEFAULT_CAPACITY)
    }
}
