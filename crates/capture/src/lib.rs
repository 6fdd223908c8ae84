//! # Capture
//!
//! 错误捕获控制器。
//!
//! 负责：
//! - 订阅两个错误通道：panic hook（未处理错误）与 `guard_ui`（UI 回调）
//! - 按通知策略 (Silent / Inform / Ask) 决定是否上报
//! - 在后台线程池上构建报告并分发到所有 sink，不阻塞出错线程
//!
//! ## 使用示例
//!
//! ```ignore
//! use capture::{ErrorReporter, FixedPrompt};
//! use contracts::NotificationPolicy;
//!
//! let reporter = ErrorReporter::builder()
//!     .notification(NotificationPolicy::Silent)
//!     .prompt(FixedPrompt::accept())
//!     .sink(file_sink)
//!     .build()?;
//! let _hook = reporter.install_panic_hook();
//! ```

mod error;
mod executor;
mod hook;
mod prompt;
mod reporter;

pub use error::CaptureError;
pub use hook::PanicHookGuard;
#[cfg(feature = "native-dialog")]
pub use prompt::DialogPrompt;
pub use prompt::{ask_text, inform_text, ConsentPrompt, FixedPrompt, TerminalPrompt, PROMPT_PREFIX};
pub use reporter::{CaptureOutcome, DispatchHandle, ErrorReporter, ReporterBuilder};
