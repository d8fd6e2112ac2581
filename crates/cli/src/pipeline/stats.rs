//! Run statistics.

use std::time::Duration;

use dispatcher::ReceiverMetricsSnapshot;
use serde::Serialize;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineStats {
    /// Sources that were streamed
    pub sources: Vec<String>,

    /// Counters per receiver, in configuration order
    pub receivers: Vec<(String, ReceiverMetricsSnapshot)>,

    /// Wall time of the run
    pub duration: Duration,

    /// Whether the run ended because of a shutdown signal
    pub cancelled: bool,
}

impl PipelineStats {
    /// Payloads written across all receivers
    pub fn total_delivered(&self) -> u64 {
        self.receivers.iter().map(|(_, m)| m.delivered).sum()
    }

    /// Delivered payloads per second
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.total_delivered() as f64 / secs
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Stream Statistics ===\n");
        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Sources: {}", self.sources.join(", "));
        println!("   ├─ Delivered: {}", self.total_delivered());
        println!("   ├─ Throughput: {:.2}/s", self.throughput());
        println!("   └─ Cancelled: {}", self.cancelled);

        if !self.receivers.is_empty() {
            println!("\nReceivers");
            for (i, (name, m)) in self.receivers.iter().enumerate() {
                let prefix = if i + 1 == self.receivers.len() { "└─" } else { "├─" };
                println!(
                    "   {prefix} {name}: delivered={} failed={} filtered={} transformed={}",
                    m.delivered, m.failed, m.filtered, m.transformed
                );
            }
        }
        println!();
    }
}
