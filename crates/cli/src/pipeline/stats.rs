//! Pipeline statistics and metrics.

use std::time::Duration;

use contracts::SyncReport;
use dispatcher::StoreMetricsSnapshot;
use ingestion::FetchMetricsSnapshot;
use observability::RunSummary;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Engine counters
    pub report: SyncReport,

    /// Total duration of the run
    pub duration: Duration,

    /// Batch writes were only logged
    pub dry_run: bool,

    /// Per-spot aggregates from the engine
    pub run_summary: RunSummary,

    /// Sensor API client counters
    pub fetch: FetchMetricsSnapshot,

    /// Context store client counters
    pub store: StoreMetricsSnapshot,
}

impl PipelineStats {
    /// Spot updates per second
    pub fn updates_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.report.updates_sent as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Skipped spots as percentage of discovered spots
    pub fn skip_rate(&self) -> f64 {
        if self.report.spots_discovered > 0 {
            (self.report.spots_skipped as f64 / self.report.spots_discovered as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        let report = &self.report;

        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Sync Run Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        if self.dry_run {
            println!("   ├─ Mode: dry run (writes logged only)");
        }
        println!("   ├─ Projects: {}", report.projects);
        println!("   ├─ Zones: {}", report.zones);
        println!(
            "   ├─ Spots: {} discovered, {} skipped ({:.2}%), {} synced",
            report.spots_discovered,
            report.spots_skipped,
            self.skip_rate(),
            report.spots_synced
        );
        println!("   ├─ Events fetched: {}", report.events_fetched);
        println!(
            "   ├─ Updates sent: {} ({:.2}/s)",
            report.updates_sent,
            self.updates_per_sec()
        );
        println!("   ├─ Batches sent: {}", report.batches_sent);
        println!("   └─ Zone entities sent: {}", report.zone_entities_sent);

        println!("\n📈 Sync Engine Metrics");
        println!("   ├─ Spots without events: {}", self.run_summary.spots_without_events);
        println!("   ├─ Watermark lag (h): {}", self.run_summary.watermark_lag_hours);
        println!("   ├─ Events per spot: {}", self.run_summary.events_per_spot);
        println!("   └─ Batch size: {}", self.run_summary.batch_size);

        println!("\n🌐 Services");
        println!(
            "   ├─ Sensor API: {} requests, {} retries, {} degraded fetches",
            self.fetch.requests, self.fetch.retries, self.fetch.degraded
        );
        println!(
            "   └─ Context store: {} authentications, {} renewals, {} retries",
            self.store.authentications, self.store.renewals, self.store.retries
        );

        if self.fetch.degraded > 0 {
            println!(
                "\n⚠️  {} spot fetches failed twice and were skipped for this run",
                self.fetch.degraded
            );
        }

        println!();
    }
}
