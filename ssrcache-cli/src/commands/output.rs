//! Console formatting shared by command handlers.

use std::time::SystemTime;

use chrono::{DateTime, Local};
use ssrcache::artifact::ArtifactDescriptor;
use ssrcache::gateway::MaintenanceDocument;
use ssrcache::reaper::SweepReport;

/// Local wall-clock rendering of a file timestamp.
pub fn format_time(time: SystemTime) -> String {
    DateTime::<Local>::from(time)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

pub fn print_descriptor(descriptor: &ArtifactDescriptor) {
    println!("Artifact: {}", descriptor.path.display());
    println!("  Key:       {}", descriptor.key);
    println!("  Tier:      {}", descriptor.tier);
    println!("  Status:    {}", descriptor.status);
    println!("  Size:      {} bytes", descriptor.size_bytes);
    println!("  Created:   {}", format_time(descriptor.created_at));
    println!("  Updated:   {}", format_time(descriptor.updated_at));
    println!("  Requested: {}", format_time(descriptor.requested_at));
    if descriptor.is_raw() {
        println!("  (unoptimized copy; optimization pending)");
    }
}

pub fn print_maintenance(document: &MaintenanceDocument) {
    println!("Maintenance mode is on (status {})", document.status);
    println!("  Page: {}", document.page.display());
}

pub fn print_report(label: &str, report: &SweepReport) {
    println!("{} sweep: {}", label, report);
}
