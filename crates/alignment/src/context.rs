//! Align context and provider traits
//!
//! These traits keep the engine free of any terminal, logging or
//! notification implementation. The CLI supplies real ones; tests use
//! the scripted and recording implementations below.

use anyhow::Result;
use std::collections::VecDeque;

/// Source of operator answers
pub trait Prompt {
    /// Ask a free-form question, returning the raw answer.
    ///
    /// An empty answer means "take the default".
    fn ask(&mut self, question: &str, default: &str) -> Result<String>;

    /// Ask a yes/no question
    fn confirm(&mut self, question: &str, default: bool) -> Result<bool>;
}

/// Sink for progress lines shown to the operator
pub trait Reporter {
    /// A section heading ("== Roles ==")
    fn heading(&mut self, text: &str);

    /// A regular progress line
    fn item(&mut self, text: &str);

    fn warn(&mut self, text: &str);

    fn error(&mut self, text: &str);

    /// Extra output only shown in verbose mode (diffs, key counts)
    fn detail(&mut self, text: &str);
}

/// A cookbook pin that was moved on the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bump {
    pub cookbook: String,
    pub version: String,
    pub environment: String,
}

/// Audit trail of committed actions
pub trait Journal {
    /// Record one action in the audit log
    fn record(&mut self, message: &str);

    /// Announce a cookbook bump on the notification channels
    fn bumped(&mut self, bump: &Bump);
}

// ============================================================================
// No-op and test implementations
// ============================================================================

/// Prompt that approves everything
pub struct AutoApprove;

impl Prompt for AutoApprove {
    fn ask(&mut self, _question: &str, _default: &str) -> Result<String> {
        Ok("Y".to_string())
    }

    fn confirm(&mut self, _question: &str, _default: bool) -> Result<bool> {
        Ok(true)
    }
}

/// Prompt that declines everything
pub struct AutoDecline;

impl Prompt for AutoDecline {
    fn ask(&mut self, _question: &str, _default: &str) -> Result<String> {
        Ok("N".to_string())
    }

    fn confirm(&mut self, _question: &str, _default: bool) -> Result<bool> {
        Ok(false)
    }
}

/// Prompt replaying a fixed answer sequence.
///
/// Once the script runs out every question gets its default.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<String>,
    /// Every question asked, in order
    pub asked: Vec<String>,
}

impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        }
    }
}

impl Prompt for ScriptedPrompt {
    fn ask(&mut self, question: &str, default: &str) -> Result<String> {
        self.asked.push(question.to_string());
        Ok(self
            .answers
            .pop_front()
            .unwrap_or_else(|| default.to_string()))
    }

    fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
        self.asked.push(question.to_string());
        Ok(match self.answers.pop_front() {
            Some(answer) => answer.trim().eq_ignore_ascii_case("y"),
            None => default,
        })
    }
}

/// Reporter that discards everything
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn heading(&mut self, _text: &str) {}
    fn item(&mut self, _text: &str) {}
    fn warn(&mut self, _text: &str) {}
    fn error(&mut self, _text: &str) {}
    fn detail(&mut self, _text: &str) {}
}

/// Severity of a recorded line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Heading,
    Item,
    Warn,
    Error,
    Detail,
}

/// Reporter that keeps every line for later assertions
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub lines: Vec<(Level, String)>,
}

impl RecordingReporter {
    /// Text of every line at the given level
    pub fn at(&self, level: Level) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, text)| text.as_str())
            .collect()
    }

    /// Whether any line contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|(_, text)| text.contains(needle))
    }
}

impl Reporter for RecordingReporter {
    fn heading(&mut self, text: &str) {
        self.lines.push((Level::Heading, text.to_string()));
    }
    fn item(&mut self, text: &str) {
        self.lines.push((Level::Item, text.to_string()));
    }
    fn warn(&mut self, text: &str) {
        self.lines.push((Level::Warn, text.to_string()));
    }
    fn error(&mut self, text: &str) {
        self.lines.push((Level::Error, text.to_string()));
    }
    fn detail(&mut self, text: &str) {
        self.lines.push((Level::Detail, text.to_string()));
    }
}

/// Journal that records nothing
pub struct NoJournal;

impl Journal for NoJournal {
    fn record(&mut self, _message: &str) {}
    fn bumped(&mut self, _bump: &Bump) {}
}

/// Journal that keeps entries in memory
#[derive(Debug, Default)]
pub struct RecordingJournal {
    pub entries: Vec<String>,
    pub bumps: Vec<Bump>,
}

impl Journal for RecordingJournal {
    fn record(&mut self, message: &str) {
        self.entries.push(message.to_string());
    }

    fn bumped(&mut self, bump: &Bump) {
        self.bumps.push(bump.clone());
    }
}

/// Context passed to every check and commit
pub struct AlignContext<'a> {
    pub prompt: &'a mut dyn Prompt,
    pub reporter: &'a mut dyn Reporter,
    pub journal: &'a mut dyn Journal,
}

impl<'a> AlignContext<'a> {
    /// Create a new align context
    pub fn new(
        prompt: &'a mut dyn Prompt,
        reporter: &'a mut dyn Reporter,
        journal: &'a mut dyn Journal,
    ) -> Self {
        Self {
            prompt,
            reporter,
            journal,
        }
    }
}
