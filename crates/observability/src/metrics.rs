//! 捕获与投递指标模块
//!
//! 记录错误捕获、用户拒绝、各 sink 投递结果以及分发耗时。

use contracts::{CaptureChannel, NotificationPolicy};
use metrics::{counter, histogram};

/// 记录一次错误捕获
pub fn record_capture(channel: CaptureChannel, policy: NotificationPolicy) {
    counter!(
        "bug_reporter_captures_total",
        "channel" => channel.as_str(),
        "policy" => policy.as_str()
    )
    .increment(1);
}

/// 记录用户拒绝上报
pub fn record_declined(channel: CaptureChannel) {
    counter!(
        "bug_reporter_declined_total",
        "channel" => channel.as_str()
    )
    .increment(1);
}

/// 记录单个 sink 的投递结果
pub fn record_delivery(sink_name: &str, success: bool) {
    counter!(
        "bug_reporter_deliveries_total",
        "sink" => sink_name.to_string()
    )
    .increment(1);

    if !success {
        counter!(
            "bug_reporter_delivery_failures_total",
            "sink" => sink_name.to_string()
        )
        .increment(1);
    }
}

/// 记录一次完整分发 (构建报告 + 全部 sink) 的耗时
pub fn record_dispatch_duration_ms(duration_ms: f64) {
    histogram!("bug_reporter_dispatch_duration_ms").record(duration_ms);
}

/// 分发统计聚合器
///
/// 在内存中聚合，便于进程退出前输出摘要。
#[derive(Debug, Clone, Default)]
pub struct DispatchStats {
    /// 分发次数
    pub dispatches: u64,

    /// 成功投递总数
    pub delivered: u64,

    /// 失败投递总数
    pub failed: u64,

    /// 分发耗时统计 (毫秒)
    pub duration_ms: RunningStats,
}

impl DispatchStats {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, delivered: usize, failed: usize, duration_ms: f64) {
        self.dispatches += 1;
        self.delivered += delivered as u64;
        self.failed += failed as u64;
        self.duration_ms.push(duration_ms);
    }

    /// 失败率 (%)
    pub fn failure_rate(&self) -> f64 {
        let total = self.delivered + self.failed;
        if total == 0 {
            0.0
        } else {
            self.failed as f64 / total as f64 * 100.0
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl std::fmt::Display for DispatchStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dispatch Summary ===")?;
        writeln!(f, "Reports dispatched: {}", self.dispatches)?;
        writeln!(f, "Deliveries: {}", self.delivered)?;
        writeln!(
            f,
            "Failed deliveries: {} ({:.2}%)",
            self.failed,
            self.failure_rate()
        )?;
        writeln!(
            f,
            "Dispatch time (ms): {}",
            StatsSummary::from(&self.duration_ms)
        )
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (value - self.mean);
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}
