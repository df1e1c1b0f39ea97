//! Output rendering and formatting

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, ContentArrangement, Table};
use console::Style;
use plugpack_hash::Hash;
use plugpack_packager::PackReport;
use serde::Serialize;
use std::io;
use std::path::PathBuf;

/// Contents of an existing archive
#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub archive: PathBuf,
    pub members: Vec<String>,
    pub size: u64,
    pub blake3: Hash,
}

/// Result of a CLI command
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationResult {
    Package(PackReport),
    Inspect(InspectReport),
}

/// Output renderer for CLI results
pub struct OutputRenderer {
    /// Use JSON output format
    json_output: bool,
    /// Whether to style terminal output
    colors: bool,
}

impl OutputRenderer {
    /// Create new output renderer
    pub fn new(json_output: bool, colors: bool) -> Self {
        Self {
            json_output,
            colors,
        }
    }

    /// Render operation result
    pub fn render_result(&self, result: &OperationResult) -> io::Result<()> {
        if self.json_output {
            let json = serde_json::to_string_pretty(result).map_err(io::Error::other)?;
            println!("{json}");
            return Ok(());
        }

        match result {
            OperationResult::Package(report) => self.render_pack_report(report),
            OperationResult::Inspect(report) => self.render_inspect_report(report),
        }
        Ok(())
    }

    fn render_pack_report(&self, report: &PackReport) {
        let mut table = self.summary_table();
        table.add_row(vec![
            Cell::new("Archive"),
            Cell::new(report.archive.display()),
        ]);
        table.add_row(vec![
            Cell::new("Staging"),
            Cell::new(report.staging_root.display()),
        ]);
        table.add_row(vec![
            Cell::new("Entries staged"),
            Cell::new(report.entries_staged),
        ]);
        table.add_row(vec![Cell::new("Files copied"), Cell::new(report.files_copied)]);
        table.add_row(vec![Cell::new("Members"), Cell::new(report.members.len())]);
        table.add_row(vec![Cell::new("Excluded"), Cell::new(report.excluded.len())]);
        table.add_row(vec![Cell::new("Size"), Cell::new(format_size(report.size))]);
        table.add_row(vec![Cell::new("BLAKE3"), Cell::new(&report.blake3)]);

        println!("{}", self.success(&format!("Packaged {}", report.archive.display())));
        println!("{table}");

        if !report.excluded.is_empty() {
            println!("Excluded:");
            for path in &report.excluded {
                println!("  {}", self.dim(path));
            }
        }
    }

    fn render_inspect_report(&self, report: &InspectReport) {
        let mut table = self.summary_table();
        table.add_row(vec![
            Cell::new("Archive"),
            Cell::new(report.archive.display()),
        ]);
        table.add_row(vec![Cell::new("Members"), Cell::new(report.members.len())]);
        table.add_row(vec![Cell::new("Size"), Cell::new(format_size(report.size))]);
        table.add_row(vec![Cell::new("BLAKE3"), Cell::new(&report.blake3)]);
        println!("{table}");

        for member in &report.members {
            println!("  {member}");
        }
    }

    fn summary_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        if self.colors {
            table.enforce_styling();
        } else {
            table.force_no_tty();
        }
        table.set_header(vec![
            Cell::new("Field").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);
        table
    }

    fn success(&self, text: &str) -> String {
        if self.colors {
            Style::new().green().bold().apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn dim(&self, text: &str) -> String {
        if self.colors {
            Style::new().dim().apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }
}

/// Format a byte count for humans
fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut unit = 0;
    #[allow(clippy::cast_precision_loss)]
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
