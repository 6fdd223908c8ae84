//! Report - the formatted text handed to every sink

use std::fmt;

/// One rendered bug report.
///
/// Immutable once built; sinks receive it by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report(String);

impl Report {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Report {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl AsRef<str> for Report {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
