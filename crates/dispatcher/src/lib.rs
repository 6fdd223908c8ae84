//! # Dispatcher
//!
//! 报告分发模块。
//!
//! 负责：
//! - 按注册顺序把一份 `Report` 交给每个 sink
//! - 隔离失败的 sink，不影响其后的 sink
//! - 提供 File / EventLog / Mail / Http 四种 sink

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod sinks;

pub use contracts::{Report, ReportSink};
pub use dispatcher::{create_dispatcher, create_sink, DispatchSummary, Dispatcher};
pub use error::DispatcherError;
pub use handle::SinkHandle;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sinks::{
    EventLogSink, EventLogSinkConfig, FileSink, FileSinkConfig, HttpSink, HttpSinkConfig,
    MailSink, MailSinkConfig,
};
