//! Operator interaction.
//!
//! The resolution logic never touches the terminal directly; it talks to a
//! [`Prompter`]. [`TerminalPrompter`] is the interactive implementation and
//! [`ScriptedPrompter`] replays canned answers for tests and automation.

use parking_lot::Mutex;
use std::collections::VecDeque;
use thiserror::Error;

/// Error type for prompting.
#[derive(Debug, Error)]
pub enum PromptError {
    /// Reading from the terminal failed.
    #[error("failed to read input: {message}")]
    Input { message: String },

    /// A scripted prompter ran out of answers.
    #[error("no scripted answer for prompt: {prompt}")]
    Exhausted { prompt: String },
}

/// Source of interactive input and sink for operator notices.
pub trait Prompter: Send + Sync {
    /// Ask for a line of text. Empty input is allowed.
    fn read_line(&self, prompt: &str) -> Result<String, PromptError>;

    /// Ask for a masked value. Empty input is allowed.
    fn read_password(&self, prompt: &str) -> Result<String, PromptError>;

    /// Show an informational message that needs no answer.
    fn notify(&self, message: &str);
}

/// Prompter backed by the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    pub fn new() -> Self {
        Self
    }
}

impl Prompter for TerminalPrompter {
    fn read_line(&self, prompt: &str) -> Result<String, PromptError> {
        dialoguer::Input::<String>::new()
            .with_prompt(prompt.trim_end_matches([':', ' ']))
            .allow_empty(true)
            .interact_text()
            .map_err(|e| PromptError::Input {
                message: e.to_string(),
            })
    }

    fn read_password(&self, prompt: &str) -> Result<String, PromptError> {
        dialoguer::Password::new()
            .with_prompt(prompt.trim_end_matches([':', ' ']))
            .allow_empty_password(true)
            .interact()
            .map_err(|e| PromptError::Input {
                message: e.to_string(),
            })
    }

    fn notify(&self, message: &str) {
        println!("{}", message);
    }
}

/// Prompter that answers from a queue and records what it was shown.
///
/// Text and password prompts draw from the same queue, in order.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<String>>,
    transcript: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    /// Create a prompter that will give `answers` in order.
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            transcript: Mutex::new(Vec::new()),
        }
    }

    /// Every prompt and notice shown so far.
    pub fn transcript(&self) -> Vec<String> {
        self.transcript.lock().clone()
    }

    /// Number of prompts (not notices) that were answered.
    pub fn prompts_answered(&self) -> usize {
        self.transcript
            .lock()
            .iter()
            .filter(|line| !line.starts_with("notice: "))
            .count()
    }

    /// Answers that were never consumed.
    pub fn remaining(&self) -> usize {
        self.answers.lock().len()
    }

    fn answer(&self, prompt: &str) -> Result<String, PromptError> {
        self.transcript.lock().push(prompt.to_string());
        self.answers
            .lock()
            .pop_front()
            .ok_or_else(|| PromptError::Exhausted {
                prompt: prompt.to_string(),
            })
    }
}

impl Prompter for ScriptedPrompter {
    fn read_line(&self, prompt: &str) -> Result<String, PromptError> {
        self.answer(prompt)
    }

    fn read_password(&self, prompt: &str) -> Result<String, PromptError> {
        self.answer(prompt)
    }

    fn notify(&self, message: &str) {
        self.transcript.lock().push(format!("notice: {}", message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_answers_in_order() {
        let prompter = ScriptedPrompter::new(["first", ""]);
        assert_eq!(prompter.read_line("Enter Username: ").unwrap(), "first");
        assert_eq!(prompter.read_password("Enter Password: ").unwrap(), "");
        assert_eq!(prompter.prompts_answered(), 2);
        assert_eq!(prompter.remaining(), 0);
    }

    #[test]
    fn test_scripted_exhausted() {
        let prompter = ScriptedPrompter::new(Vec::<String>::new());
        let result = prompter.read_line("Enter Username: ");
        assert!(matches!(result, Err(PromptError::Exhausted { .. })));
    }

    #[test]
    fn test_notices_are_recorded_but_not_counted() {
        let prompter = ScriptedPrompter::new(Vec::<String>::new());
        prompter.notify("You are using REST version - v0.14");
        assert_eq!(prompter.prompts_answered(), 0);
        assert_eq!(
            prompter.transcript(),
            vec!["notice: You are using REST version - v0.14".to_string()]
        );
    }
}
