//! Consent prompts shown before a report is dispatched

use std::io::{self, BufRead, Write};
use std::sync::{Mutex, PoisonError};

use tracing::warn;

/// Leading text of every prompt
pub const PROMPT_PREFIX: &str = "An unexpected error occurred - ";

/// Text of the Ask prompt for a top-level message
pub fn ask_text(message: &str) -> String {
    format!("{PROMPT_PREFIX}{message}. Do you wish to log the error?")
}

/// Text of the Inform prompt for a top-level message
pub fn inform_text(message: &str) -> String {
    format!("{PROMPT_PREFIX}{message}")
}

/// User-facing decision surface.
///
/// Called synchronously on the thread that raised the error.
pub trait ConsentPrompt: Send + Sync {
    /// Blocking yes/no question. `true` means the report may be sent.
    fn ask(&self, text: &str) -> bool;

    /// Acknowledgement-only message
    fn inform(&self, text: &str);
}

/// Prompt on stderr, answer read from stdin.
///
/// A closed or unreadable stdin counts as "no".
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl TerminalPrompt {
    pub fn new() -> Self {
        Self
    }

    /// `y` / `yes`, case-insensitive
    pub fn parse_answer(line: &str) -> bool {
        matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

impl ConsentPrompt for TerminalPrompt {
    fn ask(&self, text: &str) -> bool {
        let mut stderr = io::stderr().lock();
        if write!(stderr, "{text} [y/N] ").and_then(|_| stderr.flush()).is_err() {
            return false;
        }

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) => false,
            Ok(_) => Self::parse_answer(&line),
            Err(e) => {
                warn!(error = %e, "Could not read prompt answer");
                false
            }
        }
    }

    fn inform(&self, text: &str) {
        let _ = writeln!(io::stderr().lock(), "{text}");
    }
}

/// Prompt with a fixed answer, for headless hosts.
///
/// Keeps every text it was shown.
#[derive(Debug)]
pub struct FixedPrompt {
    answer: bool,
    shown: Mutex<Vec<String>>,
}

impl FixedPrompt {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            shown: Mutex::new(Vec::new()),
        }
    }

    /// Always consents
    pub fn accept() -> Self {
        Self::new(true)
    }

    /// Always declines
    pub fn decline() -> Self {
        Self::new(false)
    }

    /// Texts shown so far, in order
    pub fn shown(&self) -> Vec<String> {
        self.shown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, text: &str) {
        self.shown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_string());
    }
}

impl ConsentPrompt for FixedPrompt {
    fn ask(&self, text: &str) -> bool {
        self.record(text);
        self.answer
    }

    fn inform(&self, text: &str) {
        self.record(text);
    }
}

impl<P: ConsentPrompt + ?Sized> ConsentPrompt for std::sync::Arc<P> {
    fn ask(&self, text: &str) -> bool {
        (**self).ask(text)
    }

    fn inform(&self, text: &str) {
        (**self).inform(text)
    }
}

/// Native message box
#[cfg(feature = "native-dialog")]
#[derive(Debug, Clone)]
pub struct DialogPrompt {
    title: String,
}

#[cfg(feature = "native-dialog")]
impl DialogPrompt {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

#[cfg(feature = "native-dialog")]
impl ConsentPrompt for DialogPrompt {
    fn ask(&self, text: &str) -> bool {
        use rfd::{MessageButtons, MessageDialog, MessageDialogResult, MessageLevel};

        MessageDialog::new()
            .set_level(MessageLevel::Error)
            .set_title(self.title.as_str())
            .set_description(text)
            .set_buttons(MessageButtons::YesNo)
            .show()
            == MessageDialogResult::Yes
    }

    fn inform(&self, text: &str) {
        use rfd::{MessageButtons, MessageDialog, MessageLevel};

        MessageDialog::new()
            .set_level(MessageLevel::Error)
            .set_title(self.title.as_str())
            .set_description(text)
            .set_buttons(MessageButtons::Ok)
            .show();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_texts() {
        assert_eq!(
            ask_text("disk full"),
            "An unexpected error occurred - disk full. Do you wish to log the error?"
        );
        assert_eq!(inform_text("disk full"), "An unexpected error occurred - disk full");
    }

    #[test]
    fn test_parse_answer() {
        assert!(TerminalPrompt::parse_answer("y\n"));
        assert!(TerminalPrompt::parse_answer(" YES "));
        assert!(!TerminalPrompt::parse_answer("n"));
        assert!(!TerminalPrompt::parse_answer(""));
        assert!(!TerminalPrompt::parse_answer("yep"));
    }

    #[test]
    fn test_fixed_prompt_records_texts() {
        let prompt = FixedPrompt::decline();
        assert!(!prompt.ask("first"));
        prompt.inform("second");
        assert_eq!(prompt.shown(), vec!["first", "second"]);
        assert!(FixedPrompt::accept().ask("x"));
    }
}
