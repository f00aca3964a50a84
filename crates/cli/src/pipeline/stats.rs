//! Run statistics.

use std::time::Duration;

use dispatcher::DispatchSummary;
use ingestion::LinkSnapshot;
use sync_engine::RunReport;

/// Statistics from a gateway run
#[derive(Debug, Clone)]
pub struct PipelineStats {
    /// Protocol loop report
    pub report: RunReport,

    /// What the dispatcher consumed and how each sink fared
    pub dispatch: DispatchSummary,

    /// Transport counters over every link of the run
    pub link: LinkSnapshot,

    pub active_sinks: usize,

    pub duration: Duration,
}

impl PipelineStats {
    /// Received readings per minute
    pub fn rx_per_minute(&self) -> f64 {
        let minutes = self.duration.as_secs_f64() / 60.0;
        if minutes > 0.0 {
            self.report.engine.readings as f64 / minutes
        } else {
            0.0
        }
    }

    pub fn print_summary(&self) {
        let engine = &self.report.engine;

        println!("\n=== Gateway Statistics ===\n");
        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Stop reason: {:?}", self.report.stop_reason);
        println!("   ├─ Total TX (sequence): {}", self.report.sequence);
        println!("   ├─ RX per minute: {:.2}", self.rx_per_minute());
        println!("   ├─ Reconnects: {}", self.report.reconnects);
        println!("   └─ Active sinks: {}", self.active_sinks);

        println!("\nProtocol");
        println!("   ├─ Lines: {}", engine.lines);
        println!("   ├─ Readings: {}", engine.readings);
        println!("   ├─ Sync pings: {}", engine.pings);
        println!("   ├─ Estimates: {}", engine.estimates);
        println!("   ├─ Discarded lines: {}", engine.discarded);
        println!("   ├─ Model updates: {}", self.report.model_updates);
        println!("   └─ Events dropped before dispatch: {}", self.report.events_dropped);

        println!("\nTransport");
        println!("   ├─ Lines received: {}", self.link.lines_received);
        println!("   ├─ Bytes received: {}", self.link.bytes_received);
        println!("   ├─ Replies sent: {}", self.link.lines_sent);
        println!("   └─ Oversized lines dropped: {}", self.link.oversized_dropped);

        if !self.dispatch.sinks.is_empty() {
            println!("\nSinks");
            let last = self.dispatch.sinks.len() - 1;
            for (i, (name, snap)) in self.dispatch.sinks.iter().enumerate() {
                let prefix = if i == last { "└─" } else { "├─" };
                println!(
                    "   {} {}: written={} failed={} dropped={} mean_write={:?}",
                    prefix,
                    name,
                    snap.write_count,
                    snap.failure_count,
                    snap.dropped_count,
                    snap.mean_write_latency()
                );
            }
        }

        println!("\n{}", self.report.transmission);
    }
}
