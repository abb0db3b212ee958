use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser};

use crate::ports::{self, PortSpec};
use crate::scanner::NmapScanner;

/// nmap-recon — run nmap against one host over common ports and summarise what is open.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "nmap-recon",
    version,
    about = "Run nmap against one host over common ports and summarise open services.",
    long_about = None
)]
pub struct Cli {
    /// Host to scan: IP address or hostname.
    pub target: String,

    /// Ports to scan instead of the built-in list, e.g. `22,80,443` or `10-30`.
    #[arg(long, value_name = "SPEC", value_parser = parse_ports_arg)]
    pub ports: Option<PortSpec>,

    /// Path to ports file (one port or range per line).
    #[arg(long = "ports-file", value_name = "PATH", conflicts_with = "ports")]
    pub ports_file: Option<PathBuf>,

    /// nmap executable to run.
    #[arg(long, value_name = "PATH", default_value = "nmap")]
    pub nmap: PathBuf,

    /// Scan flags passed to nmap, split on whitespace. Quotes are not interpreted,
    /// so a single flag value cannot contain spaces (use `--script=default,safe`).
    #[arg(
        long = "nmap-args",
        value_name = "ARGS",
        default_value = "-sT -sC -sV -T4",
        allow_hyphen_values = true
    )]
    pub nmap_args: String,

    /// Write results as pretty JSON to this path (optional).
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Print default-script output under each open port.
    #[arg(long = "show-scripts", default_value_t = false)]
    pub show_scripts: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Port spec chosen on the command line, falling back to the built-in list.
    pub fn port_spec(&self) -> Result<PortSpec> {
        if let Some(spec) = &self.ports {
            return Ok(spec.clone());
        }
        match &self.ports_file {
            Some(path) => ports::load_port_spec_from_path(path),
            None => Ok(PortSpec::default()),
        }
    }

    pub fn scanner(&self) -> NmapScanner {
        NmapScanner::new(self.nmap.clone()).with_arguments(self.nmap_args.split_whitespace())
    }
}

fn parse_ports_arg(s: &str) -> Result<PortSpec, String> {
    ports::parse_port_spec(s).map_err(|e| format!("{e:#}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["nmap-recon", "127.0.0.1"]).unwrap();
        assert_eq!(cli.target, "127.0.0.1");
        assert_eq!(cli.port_spec().unwrap(), PortSpec::default());
        assert_eq!(cli.nmap, PathBuf::from("nmap"));
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn nmap_args_accept_leading_hyphen() {
        let cli = Cli::try_parse_from(["nmap-recon", "--nmap-args", "-sT -T3", "host"]).unwrap();
        let spec = cli.port_spec().unwrap();
        let args = cli.scanner().command_args(&cli.target, &spec);
        assert_eq!(&args[..2], &["-sT", "-T3"]);
    }

    #[test]
    fn nmap_args_help_mentions_whitespace_split() {
        use clap::CommandFactory;
        let cmd = Cli::command();
        let arg = cmd
            .get_arguments()
            .find(|a| a.get_id() == "nmap_args")
            .unwrap();
        let help = arg.get_help().unwrap().to_string();
        assert!(help.contains("split on whitespace"));
        assert!(help.contains("Quotes are not interpreted"));
    }

    #[test]
    fn quoted_nmap_args_are_split_on_whitespace() {
        let cli = Cli::try_parse_from([
            "nmap-recon",
            "--nmap-args",
            "-sT --script \"default and safe\"",
            "host",
        ])
        .unwrap();
        let spec = cli.port_spec().unwrap();
        let args = cli.scanner().command_args(&cli.target, &spec);
        assert_eq!(&args[..5], &["-sT", "--script", "\"default", "and", "safe\""]);
    }

    #[test]
    fn bad_ports_rejected_at_parse_time() {
        assert!(Cli::try_parse_from(["nmap-recon", "--ports", "0-99999", "host"]).is_err());
    }
}
