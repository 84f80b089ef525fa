//! CLI output formatting.
//!
//! # Output Format
//!
//! ## List
//!
//! ```text
//! / › Trips › Vacation
//! Kyoto/
//! beach.jpg  [RAW]
//! notes.txt
//!
//! 1 folder, 1 image, 1 file
//! ```
//!
//! ## Warmup
//!
//! ```text
//! Warmup: 1204 images warmed in 38.2s, 2 failed
//! Cache: 980 cached, 224 generated (1204 total)
//! ```
//!
//! ## Export
//!
//! ```text
//! Vacation.zip: 3 files, 48213 bytes → out/Vacation.zip
//!     beach.ARW
//!     dune.ARW
//!     dune (2).ARW
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::cache::CacheStats;
use crate::listing::{EntryKind, Listing};
use crate::warmup::WarmupReport;
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    format!("{} {}", n, if n == 1 { one } else { many })
}

// ============================================================================
// List
// ============================================================================

/// Format a directory listing, directories first.
pub fn format_listing(listing: &Listing) -> Vec<String> {
    let mut sorted = listing.clone();
    sorted.sort_for_display();

    let trail = std::iter::once("/")
        .chain(sorted.breadcrumbs.iter().map(|b| b.name.as_str()))
        .collect::<Vec<_>>()
        .join(" › ");
    let mut lines = vec![trail];

    let (mut folders, mut images, mut files) = (0, 0, 0);
    for entry in &sorted.content {
        let line = match entry.kind {
            EntryKind::Directory => {
                folders += 1;
                format!("{}/", entry.name)
            }
            EntryKind::Image => {
                images += 1;
                match entry.raw_pair_path {
                    Some(_) => format!("{}  [RAW]", entry.name),
                    None => entry.name.clone(),
                }
            }
            EntryKind::File => {
                files += 1;
                entry.name.clone()
            }
        };
        lines.push(line);
    }

    lines.push(String::new());
    lines.push(format!(
        "{}, {}, {}",
        plural(folders, "folder", "folders"),
        plural(images, "image", "images"),
        plural(files, "file", "files")
    ));
    lines
}

pub fn print_listing(listing: &Listing) {
    for line in format_listing(listing) {
        println!("{}", line);
    }
}

// ============================================================================
// Warmup
// ============================================================================

pub fn format_warmup(report: &WarmupReport, stats: &CacheStats) -> Vec<String> {
    vec![format!("Warmup: {}", report), format!("Cache: {}", stats)]
}

pub fn print_warmup(report: &WarmupReport, stats: &CacheStats) {
    for line in format_warmup(report, stats) {
        println!("{}", line);
    }
}

// ============================================================================
// Export
// ============================================================================

/// Summary of a written archive, one indented line per entry.
pub fn format_export(file_name: &str, entries: &[String], bytes: u64, dest: &Path) -> Vec<String> {
    let mut lines = vec![format!(
        "{}: {}, {} bytes → {}",
        file_name,
        plural(entries.len(), "file", "files"),
        bytes,
        dest.display()
    )];
    lines.extend(entries.iter().map(|e| format!("{}{}", indent(1), e)));
    lines
}

pub fn print_export(file_name: &str, entries: &[String], bytes: u64, dest: &Path) {
    for line in format_export(file_name, entries, bytes, dest) {
        println!("{}", line);
    }
}
