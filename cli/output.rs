use anyhow::{Context, Result};
use byte_unit::{Byte, UnitType};
use colored::*;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;
use xflat_core::FlattenReport;

pub fn human_bytes(bytes: u64) -> String {
    Byte::from_u128(bytes as u128)
        .unwrap_or_default()
        .get_appropriate_unit(UnitType::Binary)
        .to_string()
}

pub fn print_json<T: Serialize>(data: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(data)?;
    write_to_stdout(&content)
}

pub fn write_to_stdout(content: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(content.as_bytes())
        .context("Failed to write to stdout")?;
    if !content.ends_with('\n') {
        handle
            .write_all(b"\n")
            .context("Failed to write newline to stdout")?;
    }
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}

/// Asks before replacing an existing file. Quiet mode never overwrites.
pub fn confirm_overwrite(path: &Path, what: &str, quiet: bool) -> Result<bool> {
    if !path.exists() {
        return Ok(true);
    }
    if quiet {
        anyhow::bail!(
            "Target file '{}' exists. Overwrite prevented in quiet mode.",
            path.display()
        );
    }
    print!(
        "{} {} already exists at '{}'. Overwrite? [{}/{}] ",
        "⚠️".yellow(),
        what,
        path.display().to_string().cyan(),
        "y".green(),
        "N".red()
    );
    io::stdout().flush().context("Failed to flush stdout")?;
    let mut response = String::new();
    io::stdin()
        .read_line(&mut response)
        .context("Failed to read user input")?;
    if response.trim().eq_ignore_ascii_case("y") {
        Ok(true)
    } else {
        println!("Save cancelled.");
        Ok(false)
    }
}

/// Summary after a completed flatten. Goes to stderr when chunks were printed to stdout.
pub fn print_flatten_summary(report: &FlattenReport, warnings: &[String], to_stderr: bool) {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} Flattened {} of {} files into {} chunk(s)",
        "✅".green(),
        report.packed_files.to_string().cyan(),
        report.candidates.to_string().cyan(),
        report.chunk_count().to_string().cyan()
    ));
    if let Some(decision) = &report.decision {
        lines.push(format!("   Budget decision: {}", decision.yellow()));
    }
    for (path, size) in report.chunk_paths.iter().zip(&report.chunk_sizes) {
        lines.push(format!(
            "   {} {} ({})",
            "📦".blue(),
            path.display().to_string().dimmed(),
            human_bytes(*size as u64)
        ));
    }

    let counts = [
        ("skipped", report.skipped.len()),
        ("truncated", report.truncated.len()),
        ("binary", report.binary.len()),
        ("unreadable", report.unreadable.len() + report.unreadable_dirs.len()),
    ];
    let noted: Vec<String> = counts
        .iter()
        .filter(|(_, n)| *n > 0)
        .map(|(label, n)| format!("{} {}", n, label))
        .collect();
    if !noted.is_empty() {
        lines.push(format!("   {}", noted.join(", ").yellow()));
    }
    if report.degraded_to_sequential {
        lines.push(format!("   {}", "Parallel reads failed; finished sequentially".yellow()));
    }
    for warning in warnings {
        lines.push(format!("   {} {}", "⚠️".yellow(), warning));
    }

    for line in lines {
        if to_stderr {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EstimateSummary {
    pub project_root: String,
    pub files: usize,
    pub total_size: u64,
    pub estimated_chunk_count: usize,
    pub max_chunk_size: u64,
    pub threshold: usize,
    pub exceeds_threshold: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<usize>,
}

pub fn print_estimate_table(summary: &EstimateSummary) {
    println!();
    println!("{}", " Flatten Estimate ".green().bold().underline());
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Metric").fg(Color::Green),
        Cell::new("Value").fg(Color::Green),
    ]);
    table.add_row(vec![Cell::new("Files"), Cell::new(summary.files)]);
    table.add_row(vec![
        Cell::new("Total size"),
        Cell::new(human_bytes(summary.total_size)),
    ]);
    table.add_row(vec![
        Cell::new("Chunk limit"),
        Cell::new(human_bytes(summary.max_chunk_size)),
    ]);
    let chunk_color = if summary.exceeds_threshold {
        Color::Red
    } else {
        Color::Cyan
    };
    table.add_row(vec![
        Cell::new("Estimated chunks"),
        Cell::new(summary.estimated_chunk_count).fg(chunk_color),
    ]);
    table.add_row(vec![Cell::new("Chunk threshold"), Cell::new(summary.threshold)]);
    if let Some(tokens) = summary.tokens {
        table.add_row(vec![Cell::new("Tokens (cl100k)"), Cell::new(tokens)]);
    }
    println!("{table}");
    if summary.exceeds_threshold {
        println!(
            "{} Over the threshold: `xflat flatten` will ask how to proceed.",
            "⚠️".yellow()
        );
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_bytes_uses_binary_units() {
        assert_eq!(human_bytes(2048), "2 KiB");
        assert_eq!(human_bytes(10), "10 B");
    }
}
