//! Operator answers read from the terminal.

use alignment::Prompt;
use anyhow::{Context, Result};
use colored::Colorize;
use dialoguer::{Confirm, Input};

/// Prompt backed by dialoguer
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn ask(&mut self, question: &str, default: &str) -> Result<String> {
        let answer: String = Input::new()
            .with_prompt(question.trim_end())
            .default(default.to_string())
            .show_default(false)
            .allow_empty(true)
            .interact_text()
            .context("Failed to read answer")?;
        Ok(answer)
    }

    fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
        Confirm::new()
            .with_prompt(question.trim_end().bold().to_string())
            .default(default)
            .interact()
            .context("Failed to read confirmation")
    }
}
