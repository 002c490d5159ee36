//! Line-based questions with regex validation
//!
//! A question re-asks until the answer matches its pattern. An empty
//! answer takes the default, when there is one. Retrying is a loop, so
//! an arbitrary number of invalid answers does not grow the stack.

use anyhow::{Context, Result, bail};
use regex::Regex;
use std::io::{self, BufRead, IsTerminal, Write};

/// Question validated against a regex
pub struct Question {
    prompt: String,
    error_message: String,
    pattern: Regex,
    default: Option<String>,
}

impl Question {
    /// `pattern` must match the whole answer
    pub fn new(
        prompt: &str,
        error_message: &str,
        pattern: &str,
        default: Option<&str>,
    ) -> Result<Self> {
        let pattern = Regex::new(&format!("^(?:{pattern})$"))
            .with_context(|| format!("Invalid answer pattern: {pattern}"))?;
        Ok(Self {
            prompt: prompt.to_string(),
            error_message: error_message.to_string(),
            pattern,
            default: default.filter(|d| !d.is_empty()).map(str::to_string),
        })
    }

    /// The accepted value for a raw answer, if valid
    pub fn accept(&self, raw: &str) -> Option<String> {
        let value = match (raw.is_empty(), &self.default) {
            (true, Some(default)) => default.as_str(),
            _ => raw,
        };
        self.pattern.is_match(value).then(|| value.to_string())
    }

    fn prompt_line(&self) -> String {
        match &self.default {
            Some(default) => format!("{} [{}]: ", self.prompt, default),
            None => format!("{}: ", self.prompt),
        }
    }

    /// Ask on `output`, reading answers from `input`
    pub fn ask_with<R: BufRead, W: Write>(&self, mut input: R, mut output: W) -> Result<String> {
        let mut line = String::new();
        loop {
            write!(output, "{}", self.prompt_line())?;
            output.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                bail!("No answer: input closed");
            }
            let raw = line.trim_end_matches(['\r', '\n']);
            if let Some(value) = self.accept(raw) {
                return Ok(value);
            }
            writeln!(output, "{}.", self.error_message)?;
        }
    }

    /// Ask interactively on the terminal, or on plain stdin when piped
    pub fn ask(&self) -> Result<String> {
        if !io::stdin().is_terminal() || !console::user_attended_stderr() {
            return self.ask_with(io::stdin().lock(), io::stderr());
        }

        let mut input = dialoguer::Input::<String>::new()
            .with_prompt(&self.prompt)
            .allow_empty(true);
        if let Some(default) = &self.default {
            input = input.default(default.clone());
        }
        let answer = input
            .validate_with(|value: &String| -> std::result::Result<(), String> {
                match self.accept(value) {
                    Some(_) => Ok(()),
                    None => Err(self.error_message.clone()),
                }
            })
            .interact_text()
            .context("Failed to read answer")?;

        self.accept(&answer)
            .with_context(|| format!("Invalid answer: {answer}"))
    }
}

/// Yes/no question (`Y`, `y`, `N` or `n`)
pub struct BinaryQuestion {
    question: Question,
}

const BINARY_PATTERN: &str = "Y|y|N|n";

impl BinaryQuestion {
    /// A default outside `Y|y|N|n` is dropped
    pub fn new(prompt: &str, error_message: &str, default: Option<&str>) -> Result<Self> {
        let default = default.filter(|d| matches!(*d, "Y" | "y" | "N" | "n"));
        let question = Question::new(
            &format!("{prompt} Y/N"),
            error_message,
            BINARY_PATTERN,
            default,
        )?;
        Ok(Self { question })
    }

    pub fn ask_with<R: BufRead, W: Write>(&self, input: R, output: W) -> Result<bool> {
        let value = self.question.ask_with(input, output)?;
        Ok(is_yes(&value))
    }

    pub fn ask(&self) -> Result<bool> {
        let value = self.question.ask()?;
        Ok(is_yes(&value))
    }
}

fn is_yes(value: &str) -> bool {
    matches!(value, "Y" | "y")
}
