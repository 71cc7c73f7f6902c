//! Parking Syncer 指标收集模块
//!
//! 记录发现、采集、上传各阶段的运行指标，并在内存中聚合单次运行的统计。

use contracts::SyncReport;
use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};

/// 向已安装的导出器注册指标说明
pub fn describe_metrics() {
    // 发现 / 采集
    describe_counter!(
        "parking_syncer_spots_skipped_total",
        "Spots dropped during discovery, by reason"
    );
    describe_counter!(
        "parking_syncer_spots_collected_total",
        "Spots whose events were fetched"
    );
    describe_counter!(
        "parking_syncer_spots_without_events_total",
        "Spots with no event since their watermark"
    );
    describe_counter!(
        "parking_syncer_events_collected_total",
        "Occupancy events turned into updates"
    );
    describe_histogram!(
        "parking_syncer_events_per_spot",
        Unit::Count,
        "Events fetched per spot"
    );
    describe_histogram!(
        "parking_syncer_watermark_lag_seconds",
        Unit::Seconds,
        "Distance between a spot watermark and the run instant"
    );

    // 传感器 API
    describe_counter!(
        "parking_syncer_sensor_api_requests_total",
        "Requests sent to the sensor API"
    );
    describe_counter!(
        "parking_syncer_events_fetched_total",
        "Events returned by the sensor API"
    );
    describe_counter!(
        "parking_syncer_event_fetch_retries_total",
        "Event fetches repeated after a failure"
    );
    describe_counter!(
        "parking_syncer_event_fetch_failures_total",
        "Event fetches abandoned after the retry"
    );
    describe_histogram!(
        "parking_syncer_throttle_wait_seconds",
        Unit::Seconds,
        "Time spent waiting for a rate limiter token"
    );

    // 上下文存储
    describe_counter!(
        "parking_syncer_batches_uploaded_total",
        "Batches accepted by the store, by kind"
    );
    describe_histogram!(
        "parking_syncer_batch_entities",
        Unit::Count,
        "Entities per uploaded batch"
    );
    describe_counter!(
        "parking_syncer_batches_sent_total",
        "Successful batch writes"
    );
    describe_counter!(
        "parking_syncer_batch_retries_total",
        "Batch writes repeated after a failure"
    );
    describe_counter!(
        "parking_syncer_token_renewals_total",
        "Keystone token renewals"
    );

    // 运行汇总
    describe_counter!("parking_syncer_runs_total", "Completed synchronization runs");
    describe_gauge!("parking_syncer_last_run_projects", "Projects in the last run");
    describe_gauge!("parking_syncer_last_run_zones", "Zones in the last run");
    describe_gauge!(
        "parking_syncer_last_run_spots_discovered",
        "Spots listed in the last run"
    );
    describe_gauge!(
        "parking_syncer_last_run_spots_skipped",
        "Spots skipped in the last run"
    );
    describe_gauge!(
        "parking_syncer_last_run_spots_synced",
        "Spots with at least one update in the last run"
    );
    describe_gauge!(
        "parking_syncer_last_run_updates_sent",
        "Spot updates written in the last run"
    );
    describe_gauge!(
        "parking_syncer_last_run_batches_sent",
        "Batches written in the last run"
    );
}

/// 记录被跳过的车位
pub fn record_spot_skipped(reason: &str) {
    counter!(
        "parking_syncer_spots_skipped_total",
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// 记录单个车位的采集结果
///
/// `lag_secs` 为水位线距本次运行时间的秒数。
pub fn record_spot_collected(events: usize, lag_secs: f64) {
    counter!("parking_syncer_spots_collected_total").increment(1);
    counter!("parking_syncer_events_collected_total").increment(events as u64);
    histogram!("parking_syncer_events_per_spot").record(events as f64);
    histogram!("parking_syncer_watermark_lag_seconds").record(lag_secs);
    if events == 0 {
        counter!("parking_syncer_spots_without_events_total").increment(1);
    }
}

/// 记录批次上传
pub fn record_batch_uploaded(kind: &str, entities: usize) {
    counter!(
        "parking_syncer_batches_uploaded_total",
        "kind" => kind.to_string()
    )
    .increment(1);
    histogram!(
        "parking_syncer_batch_entities",
        "kind" => kind.to_string()
    )
    .record(entities as f64);
}

/// 记录一次完整运行的汇总
pub fn record_run_report(report: &SyncReport) {
    counter!("parking_syncer_runs_total").increment(1);
    gauge!("parking_syncer_last_run_projects").set(report.projects as f64);
    gauge!("parking_syncer_last_run_zones").set(report.zones as f64);
    gauge!("parking_syncer_last_run_spots_discovered").set(report.spots_discovered as f64);
    gauge!("parking_syncer_last_run_spots_skipped").set(report.spots_skipped as f64);
    gauge!("parking_syncer_last_run_spots_synced").set(report.spots_synced as f64);
    gauge!("parking_syncer_last_run_updates_sent").set(report.updates_sent as f64);
    gauge!("parking_syncer_last_run_batches_sent").set(report.batches_sent as f64);
}

/// 单次运行指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct RunMetricsAggregator {
    /// 已采集车位数
    pub spots_collected: u64,

    /// 无事件的车位数
    pub spots_without_events: u64,

    /// 事件总数
    pub total_events: u64,

    /// 水位线滞后 (小时)
    pub lag_stats: RunningStats,

    /// 每车位事件数
    pub events_per_spot: RunningStats,

    /// 批次大小
    pub batch_sizes: RunningStats,
}

impl RunMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一个车位
    pub fn observe_spot(&mut self, events: usize, lag_secs: f64) {
        self.spots_collected += 1;
        self.total_events += events as u64;
        if events == 0 {
            self.spots_without_events += 1;
        }
        self.lag_stats.push(lag_secs / 3600.0);
        self.events_per_spot.push(events as f64);
    }

    /// 记录一个批次
    pub fn observe_batch(&mut self, entities: usize) {
        self.batch_sizes.push(entities as f64);
    }

    /// 生成摘要报告
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            spots_collected: self.spots_collected,
            spots_without_events: self.spots_without_events,
            total_events: self.total_events,
            watermark_lag_hours: StatsSummary::from(&self.lag_stats),
            events_per_spot: StatsSummary::from(&self.events_per_spot),
            batch_size: StatsSummary::from(&self.batch_sizes),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 运行摘要
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub spots_collected: u64,
    pub spots_without_events: u64,
    pub total_events: u64,
    pub watermark_lag_hours: StatsSummary,
    pub events_per_spot: StatsSummary,
    pub batch_size: StatsSummary,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Sync Run Summary ===")?;
        writeln!(f, "Spots collected: {}", self.spots_collected)?;
        writeln!(f, "Spots without events: {}", self.spots_without_events)?;
        writeln!(f, "Events fetched: {}", self.total_events)?;
        writeln!(f, "Watermark lag (h): {}", self.watermark_lag_hours)?;
        writeln!(f, "Events per spot: {}", self.events_per_spot)?;
        writeln!(f, "Batch size: {}", self.batch_size)?;
        Ok(())
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
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
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

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();

        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_observe() {
        let mut aggregator = RunMetricsAggregator::new();

        aggregator.observe_spot(4, 7200.0);
        aggregator.observe_spot(0, 3600.0);
        aggregator.observe_batch(4);

        assert_eq!(aggregator.spots_collected, 2);
        assert_eq!(aggregator.spots_without_events, 1);
        assert_eq!(aggregator.total_events, 4);

        let summary = aggregator.summary();
        assert!((summary.watermark_lag_hours.mean - 1.5).abs() < 1e-10);
        assert_eq!(summary.batch_size.count, 1);

        aggregator.reset();
        assert_eq!(aggregator.spots_collected, 0);
    }

    #[test]
    fn test_summary_display() {
        let summary = RunSummary {
            spots_collected: 10,
            spots_without_events: 2,
            total_events: 57,
            watermark_lag_hours: StatsSummary {
                count: 10,
                min: 0.5,
                max: 24.0,
                mean: 6.0,
                std_dev: 3.0,
            },
            ..Default::default()
        };

        let output = format!("{}", summary);
        assert!(output.contains("Spots collected: 10"));
        assert!(output.contains("Events fetched: 57"));
        assert!(output.contains("mean=6.000"));
        assert!(output.contains("Batch size: N/A"));
    }

    #[test]
    fn test_recorders_without_installed_recorder() {
        // no global recorder installed: calls are no-ops
        describe_metrics();
        record_spot_skipped("no_device");
        record_spot_collected(3, 60.0);
        record_batch_uploaded("spot", 3);
        record_run_report(&SyncReport::default());
    }
}
