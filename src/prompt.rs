// ============================================================================
// Line Prompts
// ============================================================================

use std::io::{self, BufRead};

use colored::*;

use crate::console::Console;
use crate::error::{AppError, Result};

/// Line-oriented user input: category numbers, config values, yes/no.
pub trait Prompter {
    /// Show `message` and return the trimmed line the user typed.
    fn ask(&mut self, message: &str) -> Result<String>;

    /// Ask a yes/no question. An empty answer takes `default`.
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool> {
        loop {
            let hint = if default { "[Y/n]" } else { "[y/N]" };
            let answer = self.ask(&format!("{} {}", message, hint))?.to_lowercase();
            match answer.as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => continue,
            }
        }
    }

    /// Ask for a whole number. An empty answer takes `default`; anything that
    /// does not parse or is below `min` asks again.
    fn ask_number(&mut self, message: &str, default: usize, min: usize) -> Result<usize> {
        loop {
            let answer = self.ask(&format!("{} ({})", message, default))?;
            if answer.is_empty() {
                return Ok(default);
            }
            match answer.parse::<usize>() {
                Ok(n) if n >= min => return Ok(n),
                _ => continue,
            }
        }
    }
}

/// Reads answers from stdin.
pub struct StdinPrompter {
    console: Console,
}

impl StdinPrompter {
    pub fn new(console: Console) -> Self {
        StdinPrompter { console }
    }
}

impl Prompter for StdinPrompter {
    fn ask(&mut self, message: &str) -> Result<String> {
        self.console.line(message.bold());
        self.console.inline("> ".cyan());

        let mut input = String::new();
        let read = io::stdin().lock().read_line(&mut input)?;
        // EOF means the terminal went away (Ctrl+Z / Ctrl+D or closed pipe)
        if read == 0 {
            return Err(AppError::Interrupted);
        }
        Ok(input.trim().to_string())
    }
}

// ============================================================================
// Scripted prompter for tests
// ============================================================================
#[cfg(test)]
pub struct ScriptedPrompter {
    answers: std::collections::VecDeque<String>,
    pub asked: Vec<String>,
}

#[cfg(test)]
impl ScriptedPrompter {
    pub fn new(answers: &[&str]) -> Self {
        ScriptedPrompter {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            asked: Vec::new(),
        }
    }
}

#[cfg(test)]
impl Prompter for ScriptedPrompter {
    fn ask(&mut self, message: &str) -> Result<String> {
        self.asked.push(message.to_string());
        self.answers.pop_front().ok_or(AppError::Interrupted)
    }
}
