//! CapturedError - the causal chain handed from the capture layer to the report builder
//!
//! A chain is a strict sequence: each node owns at most one boxed cause, so
//! traversal always terminates and no node is shared.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;

/// Where a capture came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureChannel {
    /// Reported explicitly by application code
    #[default]
    Manual,
    /// A panic nobody caught
    Unhandled,
    /// A failure escaping a UI callback run under the UI guard
    UiThread,
}

impl CaptureChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Unhandled => "unhandled",
            Self::UiThread => "ui_thread",
        }
    }
}

/// One layer of a causal chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorFrame {
    /// Type/kind identifier
    pub kind: String,
    /// Human readable message
    pub message: String,
    /// Stack trace text, absent when the source did not provide one
    pub trace: Option<String>,
}

impl ErrorFrame {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            trace: None,
        }
    }
}

/// An error record and its chain of causes (outermost wraps inner)
#[derive(Debug, Clone)]
pub struct CapturedError {
    frame: ErrorFrame,
    cause: Option<Box<CapturedError>>,
    channel: CaptureChannel,
    thread: Option<String>,
}

impl CapturedError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::from_frame(ErrorFrame::new(kind, message))
    }

    pub fn from_frame(frame: ErrorFrame) -> Self {
        Self {
            frame,
            cause: None,
            channel: CaptureChannel::default(),
            thread: None,
        }
    }

    /// Attach a stack trace to this layer
    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.frame.trace = Some(trace.into());
        self
    }

    /// Set the direct inner cause of this layer
    pub fn caused_by(mut self, cause: CapturedError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn on_channel(mut self, channel: CaptureChannel) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_thread(mut self, thread: impl Into<String>) -> Self {
        self.thread = Some(thread.into());
        self
    }

    /// Capture a typed error and its `source()` chain.
    ///
    /// The outermost layer is named after `E`; inner layers only expose
    /// `dyn Error`, so their kind is read from their `Debug` output.
    pub fn from_error<E>(error: &E) -> Self
    where
        E: std::error::Error + 'static,
    {
        let outer = ErrorFrame::new(std::any::type_name::<E>(), error.to_string());
        Self::from_frames(outer, error.source())
    }

    /// Capture a type-erased error and its `source()` chain
    pub fn from_dyn_error(error: &(dyn std::error::Error + 'static)) -> Self {
        let outer = ErrorFrame::new(debug_kind(error), error.to_string());
        Self::from_frames(outer, error.source())
    }

    /// Capture a panic payload.
    ///
    /// A payload that already is a `CapturedError` (raised with
    /// `std::panic::panic_any`) is taken verbatim.
    pub fn from_panic(
        payload: &(dyn Any + Send),
        location: Option<String>,
        backtrace: Option<String>,
    ) -> Self {
        if let Some(captured) = payload.downcast_ref::<CapturedError>() {
            return captured.clone();
        }

        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Box<dyn Any>".to_string()
        };

        let trace = match (location, backtrace) {
            (Some(loc), Some(bt)) => Some(format!("at {loc}\n{bt}")),
            (Some(loc), None) => Some(format!("at {loc}")),
            (None, Some(bt)) => Some(bt),
            (None, None) => None,
        };

        let mut frame = ErrorFrame::new("panic", message);
        frame.trace = trace;
        Self::from_frame(frame)
    }

    fn from_frames(
        outer: ErrorFrame,
        mut source: Option<&(dyn std::error::Error + 'static)>,
    ) -> Self {
        let mut frames = vec![outer];
        while let Some(err) = source {
            frames.push(ErrorFrame::new(debug_kind(err), err.to_string()));
            source = err.source();
        }

        // Fold from the innermost cause outward
        let mut chain: Option<CapturedError> = None;
        for frame in frames.into_iter().rev() {
            let mut node = Self::from_frame(frame);
            node.cause = chain.map(Box::new);
            chain = Some(node);
        }
        chain.unwrap_or_else(|| Self::new("error", ""))
    }

    pub fn frame(&self) -> &ErrorFrame {
        &self.frame
    }

    pub fn kind(&self) -> &str {
        &self.frame.kind
    }

    pub fn message(&self) -> &str {
        &self.frame.message
    }

    pub fn trace(&self) -> Option<&str> {
        self.frame.trace.as_deref()
    }

    pub fn cause(&self) -> Option<&CapturedError> {
        self.cause.as_deref()
    }

    pub fn channel(&self) -> CaptureChannel {
        self.channel
    }

    pub fn thread(&self) -> Option<&str> {
        self.thread.as_deref()
    }

    /// Iterate the layers, outermost first
    pub fn chain(&self) -> Chain<'_> {
        Chain { next: Some(self) }
    }

    /// Number of layers in the chain
    pub fn depth(&self) -> usize {
        self.chain().count()
    }

    /// The innermost cause
    pub fn root_cause(&self) -> &CapturedError {
        self.chain().last().unwrap_or(self)
    }
}

impl fmt::Display for CapturedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.frame.kind, self.frame.message)
    }
}

impl std::error::Error for CapturedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

/// Iterator over a causal chain, outermost first
pub struct Chain<'a> {
    next: Option<&'a CapturedError>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a CapturedError;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.cause.as_deref();
        Some(current)
    }
}

/// Leading identifier of an error's `Debug` output (`ParseIntError { .. }` -> `ParseIntError`)
fn debug_kind(error: &(dyn std::error::Error + 'static)) -> String {
    let debug = format!("{error:?}");
    let ident: String = debug
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == ':')
        .collect();
    if ident.is_empty() {
        "error".to_string()
    } else {
        ident
    }
}
