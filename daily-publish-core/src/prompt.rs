use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

use crate::contract::Prompt;
use crate::error::PromptError;

/// Reads answers line by line from the process's stdin.
pub struct StdinPrompt {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl StdinPrompt {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }
}

impl Default for StdinPrompt {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Prompt for StdinPrompt {
    async fn ask(&self, question: &str) -> Result<String, PromptError> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(question.as_bytes()).await?;
        stdout.flush().await?;

        let mut lines = self.lines.lock().await;
        match lines.next_line().await? {
            Some(line) => Ok(line),
            None => Err(PromptError::Closed),
        }
    }
}

/// Answers questions from a fixed script, in order. Runs out with [`PromptError::Closed`].
///
/// Used to drive review and whole-pipeline runs without a terminal.
#[cfg(any(test, feature = "test-export-mocks"))]
pub struct ScriptedPrompt {
    answers: std::sync::Mutex<std::collections::VecDeque<String>>,
    asked: std::sync::Mutex<Vec<String>>,
}

#[cfg(any(test, feature = "test-export-mocks"))]
impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: std::sync::Mutex::new(answers.into_iter().map(Into::into).collect()),
            asked: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.answers.lock().map(|a| a.is_empty()).unwrap_or(true)
    }

    /// Every question asked so far.
    pub fn questions(&self) -> Vec<String> {
        self.asked.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[cfg(any(test, feature = "test-export-mocks"))]
#[async_trait]
impl Prompt for ScriptedPrompt {
    async fn ask(&self, question: &str) -> Result<String, PromptError> {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push(question.to_string());
        }
        let mut answers = self.answers.lock().map_err(|_| PromptError::Closed)?;
        answers.pop_front().ok_or(PromptError::Closed)
    }
}
