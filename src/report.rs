//! Human-readable summary of a scan, plus the JSON export.

use crate::error::ScanError;
use crate::types::{HostScan, PortRecord, ScanResults};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

pub const NO_OPEN_PORTS: &str = "No open ports found.";
pub const PRIVILEGE_HINT: &str = "Tip: try running with sudo";

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    /// Print default-script output below each open port.
    pub show_scripts: bool,
}

/// `80/tcp   open  http       Apache httpd 2.4.57`
pub fn format_port_line(port: u16, proto: &str, record: &PortRecord) -> String {
    let product = record.product.as_deref().unwrap_or("");
    let version = record.version.as_deref().unwrap_or("");
    let line = format!(
        "{port}/{proto:<5} open  {name:<10} {product} {version}",
        name = record.name
    );
    line.trim_end().to_string()
}

/// Open ports of a host, by protocol then ascending port number.
pub fn open_ports(host: &HostScan) -> Vec<(&str, u16, &PortRecord)> {
    let mut out = Vec::new();
    for (proto, table) in &host.protocols {
        let mut numbers: Vec<u16> = table.keys().copied().collect();
        numbers.sort_unstable();
        for port in numbers {
            let record = &table[&port];
            if record.is_open() {
                out.push((proto.as_str(), port, record));
            }
        }
    }
    out
}

/// Write the per-host open-port summary. Returns whether any open port was printed.
pub fn write_report<W: Write>(
    out: &mut W,
    results: &ScanResults,
    opts: &ReportOptions,
) -> io::Result<bool> {
    let mut found = false;

    for (key, host) in &results.hosts {
        match host.hostnames.first() {
            Some(name) if name != key => writeln!(out, "Host: {key} ({name})")?,
            _ => writeln!(out, "Host: {key}")?,
        }
        writeln!(out, "{}", "-".repeat(40))?;

        for (proto, port, record) in open_ports(host) {
            found = true;
            writeln!(out, "{}", format_port_line(port, proto, record))?;
            if opts.show_scripts {
                write_scripts(out, record)?;
            }
        }
    }

    if !found {
        writeln!(out, "{NO_OPEN_PORTS}")?;
    }
    Ok(found)
}

fn write_scripts<W: Write>(out: &mut W, record: &PortRecord) -> io::Result<()> {
    for script in &record.scripts {
        let mut lines = script.output.trim().lines();
        writeln!(out, "|  {}: {}", script.id, lines.next().unwrap_or("").trim())?;
        for line in lines {
            writeln!(out, "|  {}", line.trim_end())?;
        }
    }
    Ok(())
}

/// Two-line message printed when the scan could not be run.
pub fn render_failure(err: &ScanError) -> String {
    format!("Scan failed: {err}\n{PRIVILEGE_HINT}\n")
}

/// Write results as pretty JSON.
pub fn write_results_json(path: &Path, results: &ScanResults) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(file, results)?;
    Ok(())
}
