use crate::error::{ScanError, ScanResult};
use crate::nmap_xml::parse_nmap_xml;
use crate::ports::PortSpec;
use crate::types::ScanResults;
use ::time::{format_description::well_known, OffsetDateTime};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Connect scan (no root needed), default scripts, version detection, aggressive timing.
pub const DEFAULT_NMAP_ARGS: &[&str] = &["-sT", "-sC", "-sV", "-T4"];

/// Runs the external `nmap` binary and decodes its XML report.
#[derive(Debug, Clone)]
pub struct NmapScanner {
    program: PathBuf,
    arguments: Vec<String>,
}

impl NmapScanner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            arguments: DEFAULT_NMAP_ARGS.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Replace the scan flags. Output and port selection flags are always appended.
    pub fn with_arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments = arguments.into_iter().map(Into::into).collect();
        self
    }

    /// Full argument vector passed to the scanner for `target` and `ports`.
    pub fn command_args(&self, target: &str, ports: &PortSpec) -> Vec<String> {
        let mut args = self.arguments.clone();
        args.extend([
            "-oX".to_string(),
            "-".to_string(),
            "-p".to_string(),
            ports.to_string(),
            target.to_string(),
        ]);
        args
    }

    /// Scan `target` on `ports`, blocking until nmap exits.
    ///
    /// - XML is read from nmap's stdout.
    /// - stderr is logged; it fails the scan only when nmap reported no hosts at all
    ///   (e.g. `Failed to resolve "..."`).
    /// - Ctrl-C kills the child and yields [`ScanError::Interrupted`].
    pub async fn scan(&self, target: &str, ports: &PortSpec) -> ScanResult<ScanResults> {
        let args = self.command_args(target, ports);
        debug!(program = %self.program.display(), args = ?args, "launching scanner");
        info!(host = target, ports = ports.port_count(), "scan started");

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ScanError::Launch {
                program: self.program.display().to_string(),
                source,
            })?;

        let output = tokio::select! {
            out = child.wait_with_output() => out.map_err(|source| ScanError::Launch {
                program: self.program.display().to_string(),
                source,
            })?,
            _ = tokio::signal::ctrl_c() => return Err(ScanError::Interrupted),
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(ScanError::Exit {
                code: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut results = parse_nmap_xml(&stdout)?;
        check_stderr(&stderr, &results)?;
        results.scanned_at = now_iso_like();
        info!(
            hosts = results.hosts.len(),
            open = results.open_count(),
            "scan finished"
        );
        Ok(results)
    }
}

impl Default for NmapScanner {
    fn default() -> Self {
        Self::new("nmap")
    }
}

/// stderr notices are logged. Non-warning lines are an error only if the run
/// produced no hosts; timing notices on a finished scan must not discard it.
fn check_stderr(stderr: &str, results: &ScanResults) -> ScanResult<()> {
    let mut errors = Vec::new();
    for line in stderr.lines().map(str::trim).filter(|l| !l.is_empty()) {
        warn!("nmap: {line}");
        if !line.to_ascii_lowercase().starts_with("warning:") {
            errors.push(line);
        }
    }
    if errors.is_empty() || !results.hosts.is_empty() {
        Ok(())
    } else {
        Err(ScanError::Nmap(errors.join("\n")))
    }
}

fn now_iso_like() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&well_known::Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_args_append_output_ports_and_target() {
        let scanner = NmapScanner::default();
        let spec = crate::ports::parse_port_spec("22,80").unwrap();
        assert_eq!(
            scanner.command_args("scanme.nmap.org", &spec),
            vec!["-sT", "-sC", "-sV", "-T4", "-oX", "-", "-p", "22,80", "scanme.nmap.org"]
        );
    }

    #[test]
    fn custom_arguments_replace_defaults() {
        let scanner = NmapScanner::new("/usr/bin/nmap").with_arguments(["-sT"]);
        let spec = crate::ports::parse_port_spec("10-30").unwrap();
        assert_eq!(
            scanner.command_args("10.0.0.1", &spec),
            vec!["-sT", "-oX", "-", "-p", "10-30", "10.0.0.1"]
        );
    }

    #[test]
    fn stderr_errors_fail_only_without_hosts() {
        let empty = ScanResults::default();
        assert!(check_stderr("", &empty).is_ok());
        assert!(check_stderr("Warning: 10.0.0.1 giving up on port\n", &empty).is_ok());
        assert!(check_stderr("WARNING: No targets were specified\n", &empty).is_ok());
        match check_stderr(
            "Failed to resolve \"nope.invalid\".\nWARNING: No targets were specified",
            &empty,
        ) {
            Err(ScanError::Nmap(msg)) => assert_eq!(msg, "Failed to resolve \"nope.invalid\"."),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn stderr_noise_keeps_finished_scan() {
        let mut results = ScanResults::default();
        results
            .hosts
            .insert("10.0.0.1".into(), crate::types::HostScan::default());
        let noise = "RTTVAR has grown to over 2.3 seconds, decreasing to 2.0";
        assert!(check_stderr(noise, &results).is_ok());
    }
}
