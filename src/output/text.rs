//! Terminal output.
//!
//! Colours come from `yansi`; call `yansi::disable()` for plain text. Sizes
//! are formatted with `bytesize`.

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;

use bytesize::ByteSize;
use yansi::Paint;

use crate::actions::FileState;

use super::{GroupListing, InspectReport, Summary, TransferReport};

fn size(bytes: u64) -> String {
    ByteSize::b(bytes).to_string()
}

/// Per-media-type table with a totals row.
///
/// # Errors
///
/// Returns any error from the writer.
pub fn write_summary<W: Write>(w: &mut W, summary: &Summary) -> io::Result<()> {
    writeln!(w, "{}", format!("# {}", summary.name).bold())?;
    writeln!(w)?;
    writeln!(
        w,
        "{}",
        format!(
            "{:<14} {:>12} {:>8} {:>11}",
            "Media Type", "Size", "Files", "Duplicates"
        )
        .bold()
    )?;
    for row in &summary.rows {
        let line = format!(
            "{:<14} {:>12} {:>8} {:>11}",
            row.media_type,
            size(row.size),
            row.files,
            row.duplicates
        );
        if row.is_media() {
            writeln!(w, "{line}")?;
        } else {
            writeln!(w, "{}", line.dim())?;
        }
    }
    writeln!(w, "{}", "-".repeat(48).dim())?;
    writeln!(
        w,
        "{} {:>12} {:>8} {}",
        format!("{:>14}", "Total").bold(),
        size(summary.total_size()),
        summary.total_files(),
        format!("{:>11}", summary.total_duplicates()).red()
    )
}

/// Duplicate groups, each headed by its file size.
///
/// Paths appearing more than once in a group are printed once with a
/// `(xN)` count.
///
/// # Errors
///
/// Returns any error from the writer.
pub fn write_groups<W: Write>(w: &mut W, groups: &[GroupListing]) -> io::Result<()> {
    for group in groups {
        writeln!(w, "{}", format!("[{}]", size(group.size)).dim())?;
        for (path, count) in counted(&group.paths) {
            if count > 1 {
                writeln!(w, "  {} (x{})", path.display(), count)?;
            } else {
                writeln!(w, "  {}", path.display())?;
            }
        }
    }
    Ok(())
}

/// Distinct paths with their number of occurrences, in first-seen order.
fn counted(paths: &[PathBuf]) -> Vec<(&PathBuf, usize)> {
    let mut order: Vec<&PathBuf> = Vec::new();
    let mut counts: HashMap<&PathBuf, usize> = HashMap::new();
    for path in paths {
        let count = counts.entry(path).or_insert(0);
        if *count == 0 {
            order.push(path);
        }
        *count += 1;
    }
    order
        .into_iter()
        .map(|p| (p, counts.get(p).copied().unwrap_or(1)))
        .collect()
}

/// Full `inspect` output.
///
/// # Errors
///
/// Returns any error from the writer.
pub fn write_inspect<W: Write>(w: &mut W, report: &InspectReport) -> io::Result<()> {
    write_summary(w, &report.summary)?;
    if !report.duplicates.is_empty() {
        writeln!(w)?;
        writeln!(w, "{}", "## Duplicates".bold())?;
        write_groups(w, &report.duplicates)?;
    }
    if !report.stats.failed_files.is_empty() {
        writeln!(w)?;
        writeln!(
            w,
            "{}",
            format!("{} files could not be read:", report.stats.failed_files.len()).yellow()
        )?;
        for path in &report.stats.failed_files {
            writeln!(w, "  {}", path.display())?;
        }
    }
    Ok(())
}

/// Warning listing groups whose copies are named differently.
///
/// # Errors
///
/// Returns any error from the writer.
pub fn write_different_names<W: Write>(w: &mut W, groups: &[GroupListing]) -> io::Result<()> {
    if groups.is_empty() {
        return Ok(());
    }
    writeln!(
        w,
        "{}",
        "These duplicates have different names; the shortest name is kept:".yellow()
    )?;
    write_groups(w, groups)
}

/// Processed, skipped and failed files of a batch.
///
/// # Errors
///
/// Returns any error from the writer.
pub fn write_transfer<W: Write>(w: &mut W, report: &TransferReport) -> io::Result<()> {
    let batch = &report.batch;
    if batch.dry_run {
        writeln!(w, "{}", "Dry run: no file was changed.".yellow())?;
    }

    if batch.applied > 0 {
        let verb = match batch.operation.as_str() {
            "copy" => "Copied",
            "move" => "Moved",
            _ => "Deleted",
        };
        writeln!(w, "{}", format!("{verb} {} files:", batch.applied).bold())?;
        for file in report.in_state(FileState::Applied) {
            match &file.destination {
                Some(destination) => {
                    let marker = if file.renamed { " (renamed)" } else { "" };
                    writeln!(
                        w,
                        "  {} -> {}{}",
                        file.source.display(),
                        destination.display().green(),
                        marker.dim()
                    )?;
                }
                None => writeln!(w, "  {}", file.source.display().green())?,
            }
        }
    }

    if batch.skipped > 0 {
        writeln!(
            w,
            "{}",
            format!("{} files have not been processed (no capture date):", batch.skipped).yellow()
        )?;
        for file in report.in_state(FileState::Skipped) {
            writeln!(w, "  {}", file.source.display().dim())?;
        }
    }

    if batch.failed > 0 {
        writeln!(w, "{}", format!("{} files failed:", batch.failed).red())?;
        for file in report.in_state(FileState::Failed) {
            writeln!(
                w,
                "  {}: {}",
                file.source.display(),
                file.error.as_deref().unwrap_or("unknown error").red()
            )?;
        }
    }

    if !report.duplicates_skipped.is_empty() {
        writeln!(
            w,
            "{} files were already in the destination.",
            report.duplicates_skipped.len()
        )?;
    }

    if batch.interrupted {
        writeln!(w, "{}", "Interrupted before every file was processed.".red())?;
    }
    Ok(())
}
