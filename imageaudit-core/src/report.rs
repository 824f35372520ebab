//! Report formatting utilities for scan outputs.

use std::fmt::Write;

use serde::Serialize;

use crate::domain::{
    CompliantImage, EnrichedNonCompliantImage, ImageCounts, PipelineImage, ScanReport, percentage,
};
use crate::error::Result;

/// File name of the compliant image table.
pub const COMPLIANT_TABLE: &str = "compliant_images.csv";
/// File name of the non-compliant image table.
pub const NON_COMPLIANT_TABLE: &str = "non_compliant_images.csv";
/// File name of the pipeline image table.
pub const PIPELINE_TABLE: &str = "build_pipeline_images.csv";

/// Destination for rendered report tables.
#[cfg_attr(test, mockall::automock)]
pub trait ReportSink {
    /// Store a rendered table under `name`.
    fn write_table(&mut self, name: &str, contents: &str) -> Result<()>;
}

/// Write the three result tables to a sink.
pub fn emit_tables<S: ReportSink + ?Sized>(
    sink: &mut S,
    report: &ScanReport,
    non_compliant: &[EnrichedNonCompliantImage],
) -> Result<()> {
    sink.write_table(COMPLIANT_TABLE, &render_compliant_csv(&report.compliant))?;
    sink.write_table(NON_COMPLIANT_TABLE, &render_non_compliant_csv(non_compliant))?;
    sink.write_table(PIPELINE_TABLE, &render_pipeline_csv(&report.pipeline_images))?;
    Ok(())
}

/// Render compliant images as CSV.
pub fn render_compliant_csv(records: &[CompliantImage]) -> String {
    let mut output = String::new();
    append_row(
        &mut output,
        &["Repo name", "Repo branch", "Image name", "Compliant"],
    );
    for record in records {
        append_row(
            &mut output,
            &[&record.repo, &record.branch, &record.image, &record.marker],
        );
    }
    output
}

/// Render non-compliant images, with contributors, as CSV.
pub fn render_non_compliant_csv(records: &[EnrichedNonCompliantImage]) -> String {
    let mut output = String::new();
    append_row(
        &mut output,
        &[
            "Repo name",
            "Repo branch",
            "Image name",
            "Top Contributors",
            "Image path",
        ],
    );
    for record in records {
        let contributors = record.top_contributors.join(", ");
        append_row(
            &mut output,
            &[
                &record.image.repo,
                &record.image.branch,
                &record.image.image,
                &contributors,
                &record.image.file_path,
            ],
        );
    }
    output
}

/// Render pipeline images as CSV.
pub fn render_pipeline_csv(records: &[PipelineImage]) -> String {
    let mut output = String::new();
    append_row(
        &mut output,
        &["Repo name", "Repo branch", "Image name", "File path"],
    );
    for record in records {
        append_row(
            &mut output,
            &[&record.repo, &record.branch, &record.image, &record.file_path],
        );
    }
    output
}

/// Render the aggregate statistics as plain text.
pub fn render_statistics(report: &ScanReport) -> String {
    let stats = &report.statistics;
    let compliant_total = stats.compliant_total();
    let mut output = String::new();

    let _ = writeln!(output, "--- Statistics ---");
    let _ = writeln!(output, "Total number of repos: {}", stats.total_repos);
    let _ = writeln!(output, "Total number of Docker images: {}", stats.total_images);
    let _ = writeln!(
        output,
        "Total number of compliant images: {compliant_total} ({:.2}% of total images)",
        stats.compliant_percentage()
    );
    append_breakdown(
        &mut output,
        "Image Breakdown",
        &stats.image_counts,
        stats.total_images,
    );
    append_breakdown(
        &mut output,
        "Compliant Images",
        &stats.compliant_counts,
        compliant_total,
    );

    let pipeline = &report.pipeline_statistics;
    let _ = writeln!(output, "\n--- Build Pipeline Images Statistics ---");
    let _ = writeln!(
        output,
        "Total number of pipeline images: {}",
        pipeline.total_pipeline_images
    );
    if pipeline.total_pipeline_images == 0 {
        let _ = writeln!(output, "No pipeline images found.");
    } else {
        append_breakdown(
            &mut output,
            "Pipeline Image Breakdown",
            &pipeline.pipeline_image_counts,
            pipeline.total_pipeline_images,
        );
    }

    if report.halted {
        let _ = writeln!(
            output,
            "\nScan halted early: API rate limit exhausted. Results are partial."
        );
    }
    output
}

/// Render any serializable report payload as JSON.
pub fn render_json<T: Serialize + ?Sized>(
    payload: &T,
) -> std::result::Result<String, serde_json::Error> {
    serde_json::to_string_pretty(payload)
}

fn append_breakdown(output: &mut String, title: &str, counts: &ImageCounts, total: usize) {
    if total == 0 {
        return;
    }
    let _ = writeln!(output, "\n{title}:");
    for (image, count) in counts {
        let _ = writeln!(
            output,
            "{image}: {count} ({:.2}%)",
            percentage(*count, total)
        );
    }
}

fn append_row(output: &mut String, fields: &[&str]) {
    let row: Vec<String> = fields.iter().map(|field| escape_field(field)).collect();
    let _ = writeln!(output, "{}", row.join(","));
}

fn escape_field(field: &str) -> String {
    if field.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
